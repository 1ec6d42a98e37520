// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles image refs, hook maps, command lines, and the ordered services map.

use super::ServiceConfig;
use crate::hooks::{HookDefinition, HookPoint, HookSet};
use crate::types::{ImageRef, ServiceName};
use nonempty::NonEmpty;
use serde::Deserialize;
use serde::de::Error as _;
use std::collections::BTreeMap;

pub fn deserialize_image_ref_option<'de, D>(deserializer: D) -> Result<Option<ImageRef>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    opt.map(|s| ImageRef::parse(&s).map_err(serde::de::Error::custom))
        .transpose()
}

/// A hook value: one script or a non-empty list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scripts {
    One(String),
    Many(Vec<String>),
}

pub fn deserialize_hooks<'de, D>(deserializer: D) -> Result<HookSet, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: BTreeMap<String, Scripts> = BTreeMap::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, scripts)| {
            let point: HookPoint = key.parse().map_err(D::Error::custom)?;
            let scripts = match scripts {
                Scripts::One(script) => NonEmpty::new(script),
                Scripts::Many(list) => NonEmpty::from_vec(list).ok_or_else(|| {
                    D::Error::custom(format!("hook {point} needs at least one script"))
                })?,
            };
            Ok(HookDefinition { point, scripts })
        })
        .collect()
}

/// A command given as one string (split on whitespace) or as a word list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommandLine {
    Shell(String),
    Words(Vec<String>),
}

pub fn deserialize_command<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<CommandLine>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(CommandLine::Shell(line)) => line.split_whitespace().map(str::to_string).collect(),
        Some(CommandLine::Words(words)) => words,
    })
}

/// Services keep their declaration order, which becomes their placement.
pub fn deserialize_services<'de, D>(
    deserializer: D,
) -> Result<Vec<(ServiceName, ServiceConfig)>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let mapping = serde_yaml::Mapping::deserialize(deserializer)?;
    let services = mapping
        .into_iter()
        .map(|(key, value)| {
            let key = key
                .as_str()
                .ok_or_else(|| D::Error::custom("service names must be strings"))?;
            let name = ServiceName::new(key).map_err(D::Error::custom)?;
            let service: ServiceConfig = serde_yaml::from_value(value)
                .map_err(|e| D::Error::custom(format!("service {key}: {e}")))?;
            Ok((name, service))
        })
        .collect::<Result<Vec<_>, D::Error>>()?;

    if services.is_empty() {
        return Err(D::Error::custom("at least one service is required"));
    }
    Ok(services)
}
