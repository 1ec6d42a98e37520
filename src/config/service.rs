// ABOUTME: Per-service configuration as written in convoy.yml.
// ABOUTME: Folds env, labels, ports, volumes, and restart policy into create arguments.

use super::deserialize::{deserialize_command, deserialize_hooks, deserialize_image_ref_option};
use super::env_value::{EnvValue, resolve_env_map};
use super::restart_policy::RestartPolicy;
use crate::error::Result;
use crate::hooks::HookSet;
use crate::runtime::BuildSpec;
use crate::types::ImageRef;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default, deserialize_with = "deserialize_image_ref_option")]
    pub image: Option<ImageRef>,

    #[serde(default)]
    pub build: Option<BuildConfig>,

    #[serde(default, deserialize_with = "deserialize_command")]
    pub command: Vec<String>,

    #[serde(default = "default_scale")]
    pub scale: u32,

    #[serde(default)]
    pub links: Vec<String>,

    #[serde(default)]
    pub volumes_from: Vec<String>,

    #[serde(default)]
    pub env: BTreeMap<String, EnvValue>,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub ports: Vec<String>,

    #[serde(default)]
    pub volumes: Vec<String>,

    #[serde(default)]
    pub restart: Option<RestartPolicy>,

    /// Extra arguments passed to `run`/`create` verbatim.
    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_hooks")]
    pub hooks: HookSet,

    /// Overrides the project-wide `blue_green` setting.
    #[serde(default)]
    pub blue_green: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    pub context: PathBuf,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
}

fn default_scale() -> u32 {
    1
}

impl BuildConfig {
    /// Build spec with `context` resolved against the project directory.
    pub fn spec(&self, base: &std::path::Path) -> BuildSpec {
        BuildSpec {
            context: base.join(&self.context),
            args: self.args.clone(),
        }
    }
}

impl ServiceConfig {
    /// Arguments placed between the labels and links of the run vector:
    /// env (sorted), labels, ports, volumes, restart policy, then raw args.
    pub fn create_args(&self) -> Result<Vec<String>> {
        let mut args = Vec::new();
        for (key, value) in resolve_env_map(&self.env)? {
            args.push("--env".to_string());
            args.push(format!("{key}={value}"));
        }
        for (key, value) in &self.labels {
            args.push("--label".to_string());
            args.push(format!("{key}={value}"));
        }
        for port in &self.ports {
            args.push("--publish".to_string());
            args.push(port.clone());
        }
        for volume in &self.volumes {
            args.push("--volume".to_string());
            args.push(volume.clone());
        }
        if let Some(restart) = &self.restart {
            args.extend(restart.to_args());
        }
        args.extend(self.args.iter().cloned());
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> ServiceConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn create_args_follow_fixed_order() {
        let service = parse(
            r#"
image: nginx
env:
  B: "2"
  A: "1"
ports: ["8080:80"]
volumes: ["data:/var/lib"]
restart: always
args: ["--memory", "256m"]
"#,
        );
        assert_eq!(
            service.create_args().unwrap(),
            [
                "--env", "A=1", "--env", "B=2", "--publish", "8080:80", "--volume",
                "data:/var/lib", "--restart", "always", "--memory", "256m",
            ]
        );
    }

    #[test]
    fn command_accepts_string_or_list() {
        assert_eq!(
            parse("command: nginx -g daemon").command,
            ["nginx", "-g", "daemon"]
        );
        assert_eq!(
            parse("command: [sh, -c, 'echo hi']").command,
            ["sh", "-c", "echo hi"]
        );
    }

    #[test]
    fn hooks_accept_one_script_or_a_list() {
        let service = parse(
            r#"
image: nginx
hooks:
  before.run: echo one
  after.run: [echo two, echo three]
"#,
        );
        let points: Vec<String> = service.hooks.points().map(|p| p.to_string()).collect();
        assert_eq!(points, ["before.run", "after.run"]);
    }

    #[test]
    fn unknown_hook_is_rejected() {
        let result: std::result::Result<ServiceConfig, _> =
            serde_yaml::from_str("image: nginx\nhooks:\n  before.deploy: echo");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let result: std::result::Result<ServiceConfig, _> =
            serde_yaml::from_str("image: nginx\nhealthcheck: curl");
        assert!(result.is_err());
    }
}
