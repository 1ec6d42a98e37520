// ABOUTME: The materialized project: declared instances in startup order plus cleanup.
// ABOUTME: Observed state is attached here; leftovers become the cleanup list.

use super::instance::{ContainerInstance, LinkTargets};
use super::project::{Project, ProjectId};
use super::service::ServiceDefinition;
use crate::hooks::HookSet;
use crate::state::ObservedState;
use std::collections::HashMap;
use std::sync::Arc;

/// Declared instances for one run, plus the instances slated for teardown.
#[derive(Debug, Clone)]
pub struct ProjectPlan {
    project: ProjectId,
    hooks: HookSet,
    services: Vec<Arc<ServiceDefinition>>,
    instances: Vec<ContainerInstance>,
    cleanup: Vec<ContainerInstance>,
}

impl ProjectPlan {
    /// Expand every service into instances `1..=scale`, in placement order.
    pub fn materialize(project: &Project) -> Self {
        let mut services = project.services.clone();
        services.sort_by_key(|service| service.placement);

        let targets: LinkTargets = services
            .iter()
            .map(|service| {
                let first = project.id.instance_name(
                    &service.name,
                    service.blue_green.then_some(Default::default()),
                    1,
                );
                (service.name.clone(), first)
            })
            .collect();

        let instances = services
            .iter()
            .flat_map(|service| {
                let targets = &targets;
                (1..=service.scale.max(1)).map(move |number| {
                    ContainerInstance::declare(&project.id, Arc::clone(service), number, targets)
                })
            })
            .collect();

        Self {
            project: project.id.clone(),
            hooks: project.hooks.clone(),
            services,
            instances,
            cleanup: Vec::new(),
        }
    }

    /// Attach observed states to the declared instances they belong to,
    /// removing them from `observed`. What remains did not match a declared
    /// instance. Links are re-resolved afterwards, since blue-green services
    /// may have adopted a new color.
    pub fn adopt(&mut self, observed: &mut HashMap<String, ObservedState>) {
        for instance in &mut self.instances {
            let key = self
                .project
                .instance_key(&instance.service_name(), instance.number());
            if let Some(state) = observed.remove(&key) {
                instance.observe(state);
            }
        }

        let targets = self.link_targets();
        for instance in &mut self.instances {
            instance.resolve(&targets);
        }
    }

    fn link_targets(&self) -> LinkTargets {
        self.instances
            .iter()
            .filter(|instance| instance.number() == 1)
            .map(|instance| (instance.service_type().clone(), instance.name().to_string()))
            .collect()
    }

    /// Point links and volumes-from at a service's new first instance.
    /// Only instances after `from` are touched; earlier ones are already
    /// converged.
    pub fn retarget(&mut self, from: usize, replaced: &ContainerInstance) {
        let mut targets = self.link_targets();
        targets.insert(replaced.service_type().clone(), replaced.name().to_string());
        for instance in self.instances.iter_mut().skip(from + 1) {
            instance.resolve(&targets);
        }
    }

    pub fn set_cleanup(&mut self, cleanup: Vec<ContainerInstance>) {
        self.cleanup = cleanup;
    }

    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    pub fn hooks(&self) -> &HookSet {
        &self.hooks
    }

    pub fn services(&self) -> &[Arc<ServiceDefinition>] {
        &self.services
    }

    pub fn instances(&self) -> &[ContainerInstance] {
        &self.instances
    }

    pub fn instances_mut(&mut self) -> &mut [ContainerInstance] {
        &mut self.instances
    }

    pub fn cleanup(&self) -> &[ContainerInstance] {
        &self.cleanup
    }

    /// Longest instance name, for aligning prefixed output.
    pub fn name_width(&self) -> usize {
        self.instances
            .iter()
            .chain(&self.cleanup)
            .map(|instance| instance.target_name().len())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Link;
    use crate::types::{Color, ContainerId, ImageRef, ServiceName};

    fn service(name: &str, placement: usize, scale: u32, blue_green: bool) -> Arc<ServiceDefinition> {
        Arc::new(ServiceDefinition {
            name: ServiceName::new(name).unwrap(),
            image: ImageRef::parse("busybox").unwrap(),
            build: None,
            command: Vec::new(),
            create_args: Vec::new(),
            links: if name == "web" {
                vec![Link::parse("db").unwrap()]
            } else {
                Vec::new()
            },
            volumes_from: Vec::new(),
            hooks: HookSet::default(),
            scale,
            placement,
            blue_green,
        })
    }

    fn project(services: Vec<Arc<ServiceDefinition>>) -> Project {
        Project {
            id: ProjectId::new("shop", "_"),
            hooks: HookSet::default(),
            services,
        }
    }

    #[test]
    fn materializes_in_placement_then_number_order() {
        let plan = ProjectPlan::materialize(&project(vec![
            service("web", 1, 2, false),
            service("db", 0, 1, false),
        ]));
        let names: Vec<&str> = plan.instances().iter().map(|i| i.name()).collect();
        assert_eq!(names, ["shop_db_1", "shop_web_1", "shop_web_2"]);
    }

    #[test]
    fn zero_scale_yields_one_instance() {
        let plan = ProjectPlan::materialize(&project(vec![service("db", 0, 0, false)]));
        assert_eq!(plan.instances().len(), 1);
    }

    #[test]
    fn links_follow_a_blue_green_target_color() {
        let mut plan = ProjectPlan::materialize(&project(vec![
            service("db", 0, 1, true),
            service("web", 1, 1, false),
        ]));
        assert_eq!(plan.instances()[1].links(), ["shop_db_blue_1"]);

        let mut observed = HashMap::new();
        observed.insert(
            "shop_db_1".to_string(),
            ObservedState {
                id: ContainerId::new("1"),
                name: "shop_db_green_1".to_string(),
                service_name: "shop_db".to_string(),
                instance_number: 1,
                color: Color::Green,
                running: true,
            },
        );
        plan.adopt(&mut observed);

        assert!(observed.is_empty());
        assert_eq!(plan.instances()[1].links(), ["shop_db_green_1"]);
    }
}
