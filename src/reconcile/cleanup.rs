// ABOUTME: Derives the cleanup list: live containers no declared instance claims.
// ABOUTME: Covers scaled-down instances plus unresolvable and duplicate strays.

use crate::diagnostics::{Diagnostics, Warning};
use crate::execute::sort_for_teardown;
use crate::model::{ContainerInstance, ProjectPlan, ServiceDefinition};
use crate::state::{ObservedState, StrayContainer, StrayReason};
use std::collections::HashMap;
use std::sync::Arc;

/// Containers of declared services that match no declared instance, in
/// teardown order. Containers of services no longer declared are left alone.
pub fn derive_cleanup(
    plan: &ProjectPlan,
    leftovers: HashMap<String, ObservedState>,
    strays: Vec<StrayContainer>,
    diag: &mut Diagnostics,
) -> Vec<ContainerInstance> {
    let owner = |observed: &ObservedState| -> Option<Arc<ServiceDefinition>> {
        plan.services()
            .iter()
            .find(|service| plan.project().service_name(&service.name) == observed.service_name)
            .cloned()
    };

    let mut cleanup = Vec::new();
    for (_, observed) in leftovers {
        match owner(&observed) {
            Some(service) => {
                tracing::debug!(instance = %observed.name, "beyond declared scale");
                cleanup.push(ContainerInstance::retired(plan.project(), service, observed));
            }
            None => {
                tracing::debug!(instance = %observed.name, "service not declared, ignoring");
            }
        }
    }

    for stray in strays {
        match &stray.reason {
            StrayReason::Unresolvable(error) => {
                diag.warn(Warning::unresolved_instance(format!("{error}, scheduling it for removal")));
            }
            StrayReason::Duplicate { kept } => diag.warn(Warning::duplicate_instance(format!(
                "{} duplicates {kept}, scheduling it for removal",
                stray.state.name
            ))),
        }
        if let Some(service) = owner(&stray.state) {
            cleanup.push(ContainerInstance::retired(plan.project(), service, stray.state));
        }
    }

    sort_for_teardown(&mut cleanup);
    cleanup
}
