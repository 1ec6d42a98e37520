// ABOUTME: Integration tests for scale convergence.
// ABOUTME: Scaling up launches the missing numbers; scaling down tears down the highest first.

mod support;

use convoy::diagnostics::{Diagnostics, WarningKind};
use convoy::reconcile::Reconciler;
use convoy::runtime::RuntimeCall;
use support::{context, project, runtime, seed_current, service};

fn scaled(scale: u32) -> convoy::model::Project {
    let mut web = service("web", 0);
    web.scale = scale;
    project(vec![web])
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn scaling_down_removes_highest_numbers_first() {
    let three = scaled(3);
    let runtime = runtime();
    for number in 1..=3 {
        seed_current(&runtime, &three, "web", number, true);
    }

    let one = scaled(1);
    let (ctx, _) = context();
    let reconciler = Reconciler::new(&runtime, &ctx);
    let mut diag = Diagnostics::default();
    let mut plan = reconciler.plan(&one, &mut diag).await.unwrap();
    let cleanup: Vec<&str> = plan.cleanup().iter().map(|i| i.target_name()).collect();
    assert_eq!(cleanup, ["shop_web_3", "shop_web_2"]);

    reconciler.up(&mut plan, false, &mut diag).await.unwrap();

    assert_eq!(
        runtime.mutating_calls(),
        vec![
            RuntimeCall::Stop("shop_web_3".to_string()),
            RuntimeCall::Remove("shop_web_3".to_string()),
            RuntimeCall::Stop("shop_web_2".to_string()),
            RuntimeCall::Remove("shop_web_2".to_string()),
        ]
    );
    assert_eq!(runtime.container_names(), ["shop_web_1"]);
}

#[tokio::test]
async fn scale_override_launches_only_missing_instances() {
    let mut project = scaled(1);
    let runtime = runtime();
    seed_current(&runtime, &project, "web", 1, true);

    assert!(project.override_scale("web", 3));
    assert!(!project.override_scale("cache", 2));

    let (ctx, _) = context();
    let reconciler = Reconciler::new(&runtime, &ctx);
    let mut diag = Diagnostics::default();
    let mut plan = reconciler.plan(&project, &mut diag).await.unwrap();
    reconciler.up(&mut plan, false, &mut diag).await.unwrap();

    assert_eq!(
        runtime.mutating_calls(),
        vec![
            RuntimeCall::Run {
                name: "shop_web_2".to_string(),
                attached: false
            },
            RuntimeCall::Run {
                name: "shop_web_3".to_string(),
                attached: false
            },
        ]
    );
}

#[tokio::test]
async fn zero_scale_override_keeps_declared_instances() {
    let mut project = scaled(3);
    let runtime = runtime();
    for number in 1..=3 {
        seed_current(&runtime, &project, "web", number, true);
    }

    assert!(project.override_scale("web", 0));
    assert_eq!(project.service("web").unwrap().scale, 3);

    let (ctx, _) = context();
    let reconciler = Reconciler::new(&runtime, &ctx);
    let mut diag = Diagnostics::default();
    let mut plan = reconciler.plan(&project, &mut diag).await.unwrap();
    assert!(plan.cleanup().is_empty());
    reconciler.up(&mut plan, false, &mut diag).await.unwrap();

    assert!(runtime.mutating_calls().is_empty());
    assert_eq!(
        runtime.container_names(),
        ["shop_web_1", "shop_web_2", "shop_web_3"]
    );
}

#[tokio::test]
async fn unresolvable_container_is_warned_about_and_removed() {
    let project = scaled(1);
    let runtime = runtime();
    seed_current(&runtime, &project, "web", 1, true);
    runtime
        .seed(
            &strings(&[
                "--name",
                "shop_web_extra",
                "--label",
                "convoy.project=shop",
                "--label",
                "convoy.service=shop_web",
                support::IMAGE,
            ]),
            false,
        )
        .unwrap();

    let (ctx, _) = context();
    let reconciler = Reconciler::new(&runtime, &ctx);
    let mut diag = Diagnostics::default();
    let mut plan = reconciler.plan(&project, &mut diag).await.unwrap();
    assert_eq!(diag.count(WarningKind::UnresolvedInstance), 1);

    reconciler.up(&mut plan, false, &mut diag).await.unwrap();
    assert_eq!(
        runtime.mutating_calls(),
        vec![RuntimeCall::Remove("shop_web_extra".to_string())]
    );
}

#[tokio::test]
async fn containers_of_undeclared_services_are_left_alone() {
    let project = scaled(1);
    let runtime = runtime();
    seed_current(&runtime, &project, "web", 1, true);
    let old = support::project(vec![service("worker", 1)]);
    seed_current(&runtime, &old, "worker", 1, true);

    let (ctx, _) = context();
    let reconciler = Reconciler::new(&runtime, &ctx);
    let mut diag = Diagnostics::default();
    let mut plan = reconciler.plan(&project, &mut diag).await.unwrap();
    assert!(plan.cleanup().is_empty());

    reconciler.up(&mut plan, false, &mut diag).await.unwrap();
    assert!(runtime.mutating_calls().is_empty());
    assert_eq!(runtime.running("shop_worker_1"), Some(true));
}
