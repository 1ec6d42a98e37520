// ABOUTME: Integration tests for validated domain types.
// ABOUTME: Tests image reference parsing, service names, colors, and identifiers.

use convoy::types::*;

mod image_ref_tests {
    use super::*;

    #[test]
    fn parse_simple_name() {
        let img = ImageRef::parse("nginx").unwrap();
        assert_eq!(img.name(), "nginx");
        assert_eq!(img.tag(), Some("latest"));
        assert!(img.registry().is_none());
        assert!(img.digest().is_none());
    }

    #[test]
    fn parse_with_registry_port() {
        let img = ImageRef::parse("localhost:5000/shop/web:2.1").unwrap();
        assert_eq!(img.registry(), Some("localhost:5000"));
        assert_eq!(img.name(), "shop/web");
        assert_eq!(img.tag(), Some("2.1"));
    }

    #[test]
    fn parse_with_digest() {
        let img = ImageRef::parse("redis@sha256:abc123").unwrap();
        assert_eq!(img.digest(), Some("sha256:abc123"));
        assert!(img.tag().is_none());
    }

    #[test]
    fn display_keeps_the_reference_as_written() {
        let img = ImageRef::parse("docker.io/library/nginx").unwrap();
        assert_eq!(img.to_string(), "docker.io/library/nginx");
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(ImageRef::parse("  "), Err(ParseImageRefError::Empty)));
        assert!(matches!(
            ImageRef::parse("nginx latest"),
            Err(ParseImageRefError::InvalidChar(' '))
        ));
        assert!(ImageRef::parse("nginx:").is_err());
    }
}

mod service_name_tests {
    use super::*;

    #[test]
    fn accepts_inner_underscores_and_hyphens() {
        assert_eq!(ServiceName::new("api_v2-worker").unwrap().as_str(), "api_v2-worker");
    }

    #[test]
    fn rejects_invalid_names() {
        assert!(matches!(ServiceName::new(""), Err(ServiceNameError::Empty)));
        assert!(matches!(ServiceName::new("-web"), Err(ServiceNameError::BadEdge)));
        assert!(matches!(ServiceName::new("Web"), Err(ServiceNameError::NotLowercase)));
        assert!(matches!(ServiceName::new("web.1"), Err(ServiceNameError::InvalidChar('.'))));
        assert!(matches!(
            ServiceName::new(&"a".repeat(64)),
            Err(ServiceNameError::TooLong)
        ));
    }
}

mod color_tests {
    use super::*;

    #[test]
    fn swap_alternates_and_defaults_to_blue() {
        assert_eq!(Color::swap_target(Some(Color::Blue)), Color::Green);
        assert_eq!(Color::swap_target(Some(Color::Green)), Color::Blue);
        assert_eq!(Color::swap_target(None), Color::Blue);
    }

    #[test]
    fn parses_and_prints() {
        assert_eq!("green".parse::<Color>().unwrap(), Color::Green);
        assert!("red".parse::<Color>().is_err());
        assert_eq!(Color::Blue.to_string(), "blue");
    }
}

mod id_tests {
    use super::*;

    #[test]
    fn short_form_is_twelve_characters() {
        let id = ContainerId::new("4f1c9a7e2b3d5c6e7f8a9b0c");
        assert_eq!(id.short(), "4f1c9a7e2b3d");
        assert_eq!(ContainerId::new("abc").short(), "abc");
    }

    #[test]
    fn ids_compare_by_value() {
        assert_eq!(ImageId::new("sha256:1"), ImageId::new("sha256:1"));
        assert_ne!(ImageId::new("sha256:1"), ImageId::new("sha256:2"));
    }
}
