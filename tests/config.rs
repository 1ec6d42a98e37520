// ABOUTME: Integration tests for configuration parsing and project resolution.
// ABOUTME: Tests YAML parsing, env interpolation, hooks, overrides, and file loading.

use convoy::config::*;
use convoy::error::Error;
use convoy::hooks::{HookEvent, HookPoint};
use convoy::model::ProjectPlan;
use std::fs;
use std::path::Path;
use std::time::Duration;

const FULL: &str = r#"
project: shop
separator: "-"
blue_green: true
runtime: podman
confirm:
  attempts: 5
  interval: 50ms
hooks:
  before.up: echo starting
  after.up:
    - echo one
    - echo two
services:
  db:
    image: postgres:16
    env:
      POSTGRES_PASSWORD:
        env: SHOP_DB_PASSWORD
        default: dev
    volumes: ["pgdata:/var/lib/postgresql/data"]
    blue_green: false
  web:
    image: ghcr.io/shop/web:1.4.0
    command: bundle exec puma
    scale: 2
    links: ["db:database"]
    ports: ["8080:80"]
    restart: on-failure:3
    hooks:
      before.run: ./migrate.sh
"#;

mod parsing {
    use super::*;

    #[test]
    fn parse_full_config() {
        let config = Config::from_yaml(FULL).unwrap();
        assert_eq!(config.project.as_deref(), Some("shop"));
        assert_eq!(config.separator, "-");
        assert!(config.blue_green);
        assert_eq!(config.confirm.policy().attempts, 5);
        assert_eq!(config.confirm.interval, Duration::from_millis(50));
        assert_eq!(
            config
                .hooks
                .get(HookPoint::after(HookEvent::Up))
                .unwrap()
                .scripts
                .len(),
            2
        );

        let (name, web) = &config.services[1];
        assert_eq!(name.as_str(), "web");
        assert_eq!(web.command, ["bundle", "exec", "puma"]);
        assert_eq!(
            web.restart,
            Some(RestartPolicy::OnFailure {
                max_retries: Some(3)
            })
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = "services:\n  web:\n    image: nginx\n    replicas: 3\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn unknown_hook_points_are_rejected() {
        let yaml = "services:\n  web:\n    image: nginx\n    hooks:\n      before.deploy: echo\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn empty_hook_lists_are_rejected() {
        let yaml = "services:\n  web:\n    image: nginx\n    hooks:\n      after.run: []\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn command_lists_are_kept_verbatim() {
        let yaml = "services:\n  web:\n    image: nginx\n    command: [\"sh\", \"-c\", \"echo hi\"]\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.services[0].1.command, ["sh", "-c", "echo hi"]);
    }
}

mod resolution {
    use super::*;

    #[test]
    fn services_resolve_with_overrides_and_interpolation() {
        temp_env::with_var("SHOP_DB_PASSWORD", Some("hunter2"), || {
            let project = Config::from_yaml(FULL)
                .unwrap()
                .into_project(Path::new("/srv/shop"))
                .unwrap();

            let db = project.service("db").unwrap();
            assert!(!db.blue_green);
            assert!(db.create_args.contains(&"POSTGRES_PASSWORD=hunter2".to_string()));

            let web = project.service("web").unwrap();
            assert!(web.blue_green);
            assert_eq!(web.scale, 2);
            assert_eq!(web.placement, 1);
            assert!(!web.hooks.is_empty());
        });
    }

    #[test]
    fn env_default_applies_when_unset() {
        temp_env::with_var_unset("SHOP_DB_PASSWORD", || {
            let project = Config::from_yaml(FULL)
                .unwrap()
                .into_project(Path::new("/srv/shop"))
                .unwrap();
            let db = project.service("db").unwrap();
            assert!(db.create_args.contains(&"POSTGRES_PASSWORD=dev".to_string()));
        });
    }

    #[test]
    fn missing_env_without_default_fails() {
        let yaml = "services:\n  web:\n    image: nginx\n    env:\n      TOKEN:\n        env: CONVOY_TEST_UNSET_TOKEN\n";
        temp_env::with_var_unset("CONVOY_TEST_UNSET_TOKEN", || {
            let err = Config::from_yaml(yaml)
                .unwrap()
                .into_project(Path::new("/srv/shop"))
                .unwrap_err();
            assert!(matches!(err, Error::MissingEnvVar(var) if var == "CONVOY_TEST_UNSET_TOKEN"));
        });
    }

    #[test]
    fn plan_uses_the_configured_separator_and_colors() {
        temp_env::with_var_unset("SHOP_DB_PASSWORD", || {
            let project = Config::from_yaml(FULL)
                .unwrap()
                .into_project(Path::new("/srv/shop"))
                .unwrap();
            let plan = ProjectPlan::materialize(&project);
            let names: Vec<&str> = plan.instances().iter().map(|i| i.name()).collect();
            assert_eq!(names, ["shop-db-1", "shop-web-blue-1", "shop-web-blue-2"]);
            assert_eq!(plan.instances()[1].links(), ["shop-db-1:database"]);
        });
    }

    #[test]
    fn volumes_from_must_name_a_declared_service() {
        let yaml = "services:\n  web:\n    image: nginx\n    volumes_from: [data]\n";
        let err = Config::from_yaml(yaml)
            .unwrap()
            .into_project(Path::new("/srv/shop"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownService(name) if name == "data"));
    }
}

mod loading {
    use super::*;

    #[test]
    fn explicit_file_names_the_project_after_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join("Inventory");
        fs::create_dir(&project_dir).unwrap();
        let path = project_dir.join("stack.yml");
        fs::write(&path, "services:\n  api:\n    build:\n      context: .\n").unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.dir, project_dir);
        let project = loaded.config.into_project(&loaded.dir).unwrap();
        assert_eq!(project.id.name(), "inventory");
        assert_eq!(project.service("api").unwrap().image.as_str(), "inventory_api");
    }

    #[test]
    fn discover_prefers_convoy_yml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "project: a\nservices:\n  x:\n    image: redis\n").unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME_ALT), "project: b\nservices:\n  x:\n    image: redis\n").unwrap();

        let loaded = Config::discover(dir.path()).unwrap();
        assert_eq!(loaded.config.project.as_deref(), Some("a"));
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "services: [unclosed\n").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::Yaml(_))));
    }
}
