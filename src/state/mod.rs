// ABOUTME: Observed-state collector: what the runtime currently holds for a project.
// ABOUTME: Parses labelled containers into instance-keyed states, flagging strays.

use crate::model::{ProjectId, labels};
use crate::runtime::{ContainerError, ContainerOps, ContainerRow};
use crate::types::{Color, ContainerId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// A live container as the runtime reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedState {
    pub id: ContainerId,
    pub name: String,
    /// Project-qualified service name from the service label.
    pub service_name: String,
    /// Zero when the number could not be resolved.
    pub instance_number: u32,
    pub color: Color,
    pub running: bool,
}

/// Why a container was left out of the instance map.
#[derive(Debug)]
pub enum StrayReason {
    Unresolvable(StateError),
    /// Another container already holds the same instance key.
    Duplicate { kept: String },
}

/// A project container that matches no instance slot.
#[derive(Debug)]
pub struct StrayContainer {
    pub state: ObservedState,
    pub reason: StrayReason,
}

/// Everything the runtime holds for one project.
#[derive(Debug, Default)]
pub struct ProjectState {
    /// Keyed `serviceName{sep}instanceNumber`.
    pub instances: HashMap<String, ObservedState>,
    pub strays: Vec<StrayContainer>,
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to list project containers: {0}")]
    List(#[from] ContainerError),

    #[error("cannot determine instance number of container {name}")]
    UnresolvableInstance { name: String },

    #[error("container {name} has no {} label", labels::SERVICE)]
    MissingServiceLabel { name: String },
}

/// List every container labelled with the project and key it by instance.
pub async fn collect_project_state<R>(
    runtime: &R,
    project: &ProjectId,
) -> Result<ProjectState, StateError>
where
    R: ContainerOps + ?Sized,
{
    let rows = runtime.list_project_containers(project.name()).await?;
    tracing::debug!(project = project.name(), containers = rows.len(), "collected project containers");

    let mut state = ProjectState::default();
    for row in rows {
        let observed = match parse_row(&row, project.separator()) {
            Ok(observed) => observed,
            Err((observed, error)) => {
                state.strays.push(StrayContainer {
                    state: observed,
                    reason: StrayReason::Unresolvable(error),
                });
                continue;
            }
        };

        let key = project.instance_key(&observed.service_name, observed.instance_number);
        match state.instances.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(observed);
            }
            Entry::Occupied(mut slot) => {
                // Prefer the running container when two claim one slot.
                let extra = if observed.running && !slot.get().running {
                    slot.insert(observed)
                } else {
                    observed
                };
                state.strays.push(StrayContainer {
                    reason: StrayReason::Duplicate {
                        kept: slot.get().name.clone(),
                    },
                    state: extra,
                });
            }
        }
    }
    Ok(state)
}

fn parse_row(row: &ContainerRow, separator: &str) -> Result<ObservedState, (ObservedState, StateError)> {
    let mut observed = ObservedState {
        id: row.id.clone(),
        name: row.name.clone(),
        service_name: row.label(labels::SERVICE).unwrap_or_default().to_string(),
        instance_number: 0,
        color: row
            .label(labels::COLOR)
            .and_then(|color| color.parse().ok())
            .unwrap_or_default(),
        running: row.running,
    };

    if observed.service_name.is_empty() {
        let error = StateError::MissingServiceLabel {
            name: row.name.clone(),
        };
        return Err((observed, error));
    }

    let number = row
        .label(labels::INSTANCE)
        .and_then(parse_number)
        .or_else(|| {
            row.name
                .rsplit_once(separator)
                .and_then(|(_, suffix)| parse_number(suffix))
        });
    match number {
        Some(number) => {
            observed.instance_number = number;
            Ok(observed)
        }
        None => {
            let error = StateError::UnresolvableInstance {
                name: row.name.clone(),
            };
            Err((observed, error))
        }
    }
}

fn parse_number(raw: &str) -> Option<u32> {
    raw.trim().parse().ok().filter(|n| *n > 0)
}
