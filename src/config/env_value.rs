// ABOUTME: Environment variable value types with interpolation support.
// ABOUTME: Handles literal values and references to environment variables.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    /// The value as passed to `--env`. An unset variable falls back to its
    /// default, if any.
    pub fn resolve(&self) -> Result<String> {
        let (var, default) = match self {
            EnvValue::Literal(value) => return Ok(value.clone()),
            EnvValue::FromEnv { var, default } => (var, default),
        };
        std::env::var(var)
            .ok()
            .or_else(|| default.clone())
            .ok_or_else(|| Error::MissingEnvVar(var.clone()))
    }
}

/// Resolve every value. Sorted by name so the result is stable across runs.
pub fn resolve_env_map(map: &BTreeMap<String, EnvValue>) -> Result<BTreeMap<String, String>> {
    map.iter()
        .map(|(k, v)| v.resolve().map(|resolved| (k.clone(), resolved)))
        .collect()
}
