// ABOUTME: Configuration types and parsing for convoy.yml.
// ABOUTME: Handles YAML parsing, env var interpolation, and resolution into a Project.

mod confirm;
mod deserialize;
mod env_value;
mod restart_policy;
mod service;

pub use confirm::ConfirmConfig;
pub use env_value::{EnvValue, resolve_env_map};
pub use restart_policy::RestartPolicy;
pub use service::{BuildConfig, ServiceConfig};

use crate::error::{Error, Result};
use crate::hooks::HookSet;
use crate::model::{Link, Project, ProjectId, ServiceDefinition};
use crate::runtime::RuntimeType;
use crate::types::{ImageRef, ServiceName};
use deserialize::{deserialize_hooks, deserialize_services};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CONFIG_FILENAME: &str = "convoy.yml";
pub const CONFIG_FILENAME_ALT: &str = "convoy.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".convoy/config.yml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Defaults to the name of the project directory.
    #[serde(default)]
    pub project: Option<String>,

    #[serde(default = "default_separator")]
    pub separator: String,

    /// Project-wide default; services may override it.
    #[serde(default)]
    pub blue_green: bool,

    /// Auto-detected on PATH when unset.
    #[serde(default)]
    pub runtime: Option<RuntimeType>,

    #[serde(default)]
    pub confirm: ConfirmConfig,

    #[serde(default, deserialize_with = "deserialize_hooks")]
    pub hooks: HookSet,

    #[serde(deserialize_with = "deserialize_services")]
    pub services: Vec<(ServiceName, ServiceConfig)>,
}

fn default_separator() -> String {
    "_".to_string()
}

/// A parsed config together with the directory it was found in.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub dir: PathBuf,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<LoadedConfig> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content)?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from("."));
        // `.convoy/config.yml` belongs to the directory above `.convoy`.
        let dir = match dir.file_name() {
            Some(name) if name == ".convoy" => dir.parent().map(Path::to_path_buf).unwrap_or(dir),
            _ => dir,
        };
        Ok(LoadedConfig { config, dir })
    }

    pub fn discover(dir: &Path) -> Result<LoadedConfig> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Resolve into a project. `dir` names the project when `project` is
    /// unset and anchors relative build contexts.
    pub fn into_project(self, dir: &Path) -> Result<Project> {
        let name = match self.project {
            Some(name) => name,
            None => default_project_name(dir)?,
        };
        if name.trim().is_empty() {
            return Err(Error::InvalidConfig("project name cannot be empty".into()));
        }
        if self.separator.is_empty() {
            return Err(Error::InvalidConfig("separator cannot be empty".into()));
        }
        let id = ProjectId::new(name, self.separator);

        let declared: Vec<ServiceName> = self.services.iter().map(|(n, _)| n.clone()).collect();
        let known = |service: &ServiceName| -> Result<()> {
            if declared.contains(service) {
                Ok(())
            } else {
                Err(Error::UnknownService(service.to_string()))
            }
        };

        let mut services = Vec::with_capacity(self.services.len());
        for (placement, (name, service)) in self.services.into_iter().enumerate() {
            let links = service
                .links
                .iter()
                .map(|raw| Link::parse(raw).map_err(|e| Error::InvalidConfig(format!("service {name}: link {raw}: {e}"))))
                .collect::<Result<Vec<_>>>()?;
            let volumes_from = service
                .volumes_from
                .iter()
                .map(|raw| ServiceName::new(raw).map_err(|e| Error::InvalidConfig(format!("service {name}: volumes_from {raw}: {e}"))))
                .collect::<Result<Vec<_>>>()?;
            for target in links.iter().map(|l| &l.service).chain(&volumes_from) {
                known(target)?;
            }

            let image = match (&service.image, &service.build) {
                (Some(image), _) => image.clone(),
                (None, Some(_)) => {
                    let derived = id.service_name(&name);
                    ImageRef::parse(&derived).map_err(|e| {
                        Error::InvalidConfig(format!("service {name}: derived image {derived}: {e}"))
                    })?
                }
                (None, None) => {
                    return Err(Error::InvalidConfig(format!(
                        "service {name} needs an image or a build"
                    )));
                }
            };

            services.push(Arc::new(ServiceDefinition {
                create_args: service.create_args()?,
                build: service.build.as_ref().map(|b| b.spec(dir)),
                command: service.command,
                image,
                links,
                volumes_from,
                hooks: service.hooks,
                scale: service.scale.max(1),
                placement,
                blue_green: service.blue_green.unwrap_or(self.blue_green),
                name,
            }));
        }

        Ok(Project {
            id,
            hooks: self.hooks,
            services,
        })
    }
}

fn default_project_name(dir: &Path) -> Result<String> {
    let dir = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(dir)
    };
    dir.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .next_back()
        .map(|name| name.to_lowercase())
        .ok_or_else(|| Error::InvalidConfig("cannot derive a project name; set `project`".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
project: shop
services:
  db:
    image: postgres:16
  web:
    image: nginx
    scale: 0
    links: ["db:database"]
"#;

    #[test]
    fn services_keep_declaration_order() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        let names: Vec<&str> = config.services.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["db", "web"]);
        assert_eq!(config.separator, "_");
        assert_eq!(config.confirm, ConfirmConfig::default());
    }

    #[test]
    fn into_project_assigns_placement_and_coerces_scale() {
        let project = Config::from_yaml(MINIMAL)
            .unwrap()
            .into_project(Path::new("/srv/shop"))
            .unwrap();
        assert_eq!(project.id.name(), "shop");
        let web = project.service("web").unwrap();
        assert_eq!(web.placement, 1);
        assert_eq!(web.scale, 1);
        assert_eq!(web.links[0].alias.as_deref(), Some("database"));
    }

    #[test]
    fn project_name_defaults_to_directory() {
        let yaml = "services:\n  db:\n    image: redis\n";
        let project = Config::from_yaml(yaml)
            .unwrap()
            .into_project(Path::new("/srv/Storefront"))
            .unwrap();
        assert_eq!(project.id.name(), "storefront");
    }

    #[test]
    fn link_to_undeclared_service_fails() {
        let yaml = "project: p\nservices:\n  web:\n    image: nginx\n    links: [cache]\n";
        let err = Config::from_yaml(yaml)
            .unwrap()
            .into_project(Path::new("/srv"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownService(s) if s == "cache"));
    }

    #[test]
    fn build_services_default_their_image_name() {
        let yaml = "project: shop\nservices:\n  api:\n    build:\n      context: ./api\n";
        let project = Config::from_yaml(yaml)
            .unwrap()
            .into_project(Path::new("/srv/shop"))
            .unwrap();
        let api = project.service("api").unwrap();
        assert_eq!(api.image.as_str(), "shop_api");
        assert_eq!(
            api.build.as_ref().unwrap().context,
            Path::new("/srv/shop/./api")
        );
    }

    #[test]
    fn service_without_image_or_build_fails() {
        let yaml = "project: p\nservices:\n  web:\n    scale: 2\n";
        assert!(matches!(
            Config::from_yaml(yaml).unwrap().into_project(Path::new("/srv")),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn empty_services_are_rejected() {
        assert!(Config::from_yaml("project: p\nservices: {}\n").is_err());
    }

    #[test]
    fn discover_finds_dot_dir_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".convoy")).unwrap();
        std::fs::write(
            dir.path().join(".convoy/config.yml"),
            "services:\n  db:\n    image: redis\n",
        )
        .unwrap();

        let loaded = Config::discover(dir.path()).unwrap();
        assert_eq!(loaded.dir, dir.path());
    }

    #[test]
    fn discover_reports_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::discover(dir.path()),
            Err(Error::ConfigNotFound(_))
        ));
    }
}
