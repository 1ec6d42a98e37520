// ABOUTME: Ordering rules for batches: startup ascends, teardown descends.
// ABOUTME: Both order by (placement, instance number).

use crate::model::ContainerInstance;

/// Startup order: ascending placement, then instance number.
pub fn startup_order(instances: &[ContainerInstance]) -> Vec<&ContainerInstance> {
    let mut ordered: Vec<&ContainerInstance> = instances.iter().collect();
    ordered.sort_by_key(|instance| instance.sort_key());
    ordered
}

/// Teardown order: the exact reverse of startup.
pub fn teardown_order(instances: &[ContainerInstance]) -> Vec<&ContainerInstance> {
    let mut ordered = startup_order(instances);
    ordered.reverse();
    ordered
}

pub fn sort_for_teardown(instances: &mut [ContainerInstance]) {
    instances.sort_by_key(|instance| std::cmp::Reverse(instance.sort_key()));
}
