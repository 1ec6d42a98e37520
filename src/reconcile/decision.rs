// ABOUTME: Per-instance reconciliation decision.
// ABOUTME: Pure function of the instance, its observed state, and its recorded fingerprint.

use crate::model::ContainerInstance;
use std::fmt;

/// What reconciliation does with one declared instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Nothing exists yet: launch it.
    Create,
    /// Drifted and blue-green: launch the other color, then retire this one.
    BlueGreen,
    /// Drifted: force-remove, then launch fresh.
    Recreate,
    AlreadyRunning,
    Start,
}

/// Decide from the observed state and the fingerprint recorded on the live
/// container. A missing fingerprint counts as drift.
pub fn decide(instance: &ContainerInstance, recorded: Option<&str>) -> Decision {
    let Some(observed) = instance.observed() else {
        return Decision::Create;
    };

    let drifted = recorded.is_none_or(|recorded| !instance.fingerprint().matches(recorded));
    if drifted {
        return if instance.service().blue_green {
            Decision::BlueGreen
        } else {
            Decision::Recreate
        };
    }

    if observed.running {
        Decision::AlreadyRunning
    } else {
        Decision::Start
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Decision::Create => "create",
            Decision::BlueGreen => "blue-green swap",
            Decision::Recreate => "recreate",
            Decision::AlreadyRunning => "already running",
            Decision::Start => "start",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookSet;
    use crate::model::{LinkTargets, ProjectId, ServiceDefinition};
    use crate::state::ObservedState;
    use crate::types::{Color, ContainerId, ImageRef, ServiceName};
    use std::sync::Arc;

    fn instance(blue_green: bool, running: Option<bool>) -> ContainerInstance {
        let service = Arc::new(ServiceDefinition {
            name: ServiceName::new("api").unwrap(),
            image: ImageRef::parse("api:1").unwrap(),
            build: None,
            command: Vec::new(),
            create_args: Vec::new(),
            links: Vec::new(),
            volumes_from: Vec::new(),
            hooks: HookSet::default(),
            scale: 1,
            placement: 0,
            blue_green,
        });
        let mut instance =
            ContainerInstance::declare(&ProjectId::new("shop", "_"), service, 1, &LinkTargets::new());
        if let Some(running) = running {
            let name = instance.name().to_string();
            instance.observe(ObservedState {
                id: ContainerId::new("1"),
                name,
                service_name: "shop_api".to_string(),
                instance_number: 1,
                color: Color::Blue,
                running,
            });
        }
        instance
    }

    #[test]
    fn missing_instance_is_created() {
        assert_eq!(decide(&instance(false, None), None), Decision::Create);
    }

    #[test]
    fn matching_fingerprint_depends_on_running() {
        let running = instance(false, Some(true));
        let recorded = running.fingerprint().to_string();
        assert_eq!(decide(&running, Some(&recorded)), Decision::AlreadyRunning);

        let stopped = instance(false, Some(false));
        assert_eq!(decide(&stopped, Some(&recorded)), Decision::Start);
    }

    #[test]
    fn drift_recreates_or_swaps() {
        assert_eq!(
            decide(&instance(false, Some(true)), Some("stale")),
            Decision::Recreate
        );
        assert_eq!(
            decide(&instance(true, Some(false)), Some("stale")),
            Decision::BlueGreen
        );
    }

    #[test]
    fn missing_fingerprint_label_is_drift() {
        assert_eq!(decide(&instance(false, Some(true)), None), Decision::Recreate);
    }
}
