// ABOUTME: Project identity and naming rules for services and instances.
// ABOUTME: A Project bundles the identity with its ordered service definitions.

use super::service::ServiceDefinition;
use crate::hooks::HookSet;
use crate::types::{Color, ServiceName};
use std::sync::Arc;

/// Project name plus the separator used to build every derived name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectId {
    name: String,
    separator: String,
}

impl ProjectId {
    pub fn new(name: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            separator: separator.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// `project{sep}service`, the value of the service label.
    pub fn service_name(&self, service: &ServiceName) -> String {
        format!("{}{}{}", self.name, self.separator, service)
    }

    /// `project{sep}service[{sep}color]{sep}number`.
    pub fn instance_name(&self, service: &ServiceName, color: Option<Color>, number: u32) -> String {
        let sep = &self.separator;
        match color {
            Some(color) => format!("{}{sep}{color}{sep}{number}", self.service_name(service)),
            None => format!("{}{sep}{number}", self.service_name(service)),
        }
    }

    /// Observed-state key: the full service name and instance number,
    /// independent of color.
    pub fn instance_key(&self, service_name: &str, number: u32) -> String {
        format!("{service_name}{}{number}", self.separator)
    }
}

/// A fully resolved project: identity, project-level hooks, and services in
/// declaration order.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: ProjectId,
    pub hooks: HookSet,
    pub services: Vec<Arc<ServiceDefinition>>,
}

impl Project {
    pub fn service(&self, name: &str) -> Option<&Arc<ServiceDefinition>> {
        self.services.iter().find(|s| s.name.as_str() == name)
    }

    /// Override one service's scale for this run. Returns false when no such
    /// service is declared. A zero scale leaves the declared scale in place.
    pub fn override_scale(&mut self, name: &str, scale: u32) -> bool {
        let Some(service) = self.services.iter_mut().find(|s| s.name.as_str() == name) else {
            return false;
        };
        if scale == 0 {
            tracing::warn!(
                service = name,
                declared = service.scale,
                "ignoring scale of 0, keeping declared scale"
            );
            return true;
        }
        Arc::make_mut(service).scale = scale;
        true
    }
}
