// ABOUTME: Declared model of a project: services, instances, and the resolved plan.
// ABOUTME: Naming, run-argument vectors, and fingerprints are built here.

mod action;
mod instance;
pub mod labels;
mod plan;
mod project;
mod service;

pub use action::{Action, ActionRecord};
pub use instance::{ContainerInstance, LinkTargets};
pub use plan::ProjectPlan;
pub use project::{Project, ProjectId};
pub use service::{Link, ServiceDefinition};
