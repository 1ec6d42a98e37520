// ABOUTME: Immutable service definitions produced from configuration.
// ABOUTME: Includes links to other services and the per-service hook set.

use crate::hooks::HookSet;
use crate::runtime::BuildSpec;
use crate::types::{ImageRef, ServiceName, ServiceNameError};

/// A link to another service, optionally under an alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub service: ServiceName,
    pub alias: Option<String>,
}

impl Link {
    /// Parse `service` or `service:alias`.
    pub fn parse(raw: &str) -> Result<Self, ServiceNameError> {
        let (service, alias) = match raw.split_once(':') {
            Some((service, alias)) if !alias.is_empty() => (service, Some(alias.to_string())),
            Some((service, _)) => (service, None),
            None => (raw, None),
        };
        Ok(Self {
            service: ServiceName::new(service.trim())?,
            alias,
        })
    }
}

/// Everything declared about one service. Shared by all of its instances.
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    pub name: ServiceName,
    pub image: ImageRef,
    pub build: Option<BuildSpec>,
    pub command: Vec<String>,
    /// Arguments placed between the labels and the links in `run`/`create`.
    pub create_args: Vec<String>,
    pub links: Vec<Link>,
    pub volumes_from: Vec<ServiceName>,
    pub hooks: HookSet,
    pub scale: u32,
    /// Declaration order; startup runs in ascending placement.
    pub placement: usize,
    pub blue_green: bool,
}
