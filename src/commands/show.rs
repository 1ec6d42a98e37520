// ABOUTME: The `show` command: prints the resolved plan without changing anything.
// ABOUTME: Lists each declared instance with its pending decision, then the cleanup list.

use convoy::error::Result;
use convoy::model::{ContainerInstance, ProjectPlan, labels};
use convoy::reconcile::{ReconcileError, decide};
use convoy::runtime::ContainerOps;

pub async fn print_plan<R: ContainerOps + ?Sized>(runtime: &R, plan: &ProjectPlan) -> Result<()> {
    let width = plan.name_width();
    println!(
        "project {} (separator {:?})",
        plan.project().name(),
        plan.project().separator()
    );

    for instance in plan.instances() {
        let recorded = if instance.exists() {
            runtime
                .label_value(instance.target_name(), labels::FINGERPRINT)
                .await
                .map_err(ReconcileError::from)?
        } else {
            None
        };
        let decision = decide(instance, recorded.as_deref());
        println!(
            "  {:<width$}  {:<8}  {:<16}  {}",
            instance.target_name(),
            status(instance),
            decision.to_string(),
            instance.fingerprint().short(),
        );
    }

    if !plan.cleanup().is_empty() {
        println!("cleanup:");
        for instance in plan.cleanup() {
            println!("  {:<width$}  {}", instance.target_name(), status(instance));
        }
    }
    Ok(())
}

fn status(instance: &ContainerInstance) -> &'static str {
    match instance.observed() {
        None => "absent",
        Some(observed) if observed.running => "running",
        Some(_) => "stopped",
    }
}
