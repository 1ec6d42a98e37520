// ABOUTME: Reconciliation engine: converges the runtime to the declared project.
// ABOUTME: Also drives the per-command batches (create, start, stop, kill, rm, ...).

use super::cleanup::derive_cleanup;
use super::decision::{Decision, decide};
use super::error::ReconcileError;
use super::swap::blue_green;
use crate::diagnostics::Diagnostics;
use crate::execute::{ExecutionContext, Executor, startup_order, teardown_order};
use crate::model::{ContainerInstance, Project, ProjectPlan, labels};
use crate::runtime::{ContainerOps, Runtime};
use crate::state::{ProjectState, collect_project_state};
use crate::types::ServiceName;
use std::collections::HashSet;

/// Converges one project against a runtime.
pub struct Reconciler<'a, R: Runtime + ?Sized> {
    exec: Executor<'a, R>,
}

impl<'a, R: Runtime + ?Sized> Reconciler<'a, R> {
    pub fn new(runtime: &'a R, ctx: &'a ExecutionContext) -> Self {
        Self {
            exec: Executor::new(runtime, ctx),
        }
    }

    pub fn executor(&self) -> &Executor<'a, R> {
        &self.exec
    }

    /// Materialize the project, attach observed state, and derive cleanup.
    pub async fn plan(
        &self,
        project: &Project,
        diag: &mut Diagnostics,
    ) -> Result<ProjectPlan, ReconcileError> {
        let mut plan = ProjectPlan::materialize(project);
        let ProjectState {
            mut instances,
            strays,
        } = collect_project_state(self.exec.runtime(), &project.id).await?;
        plan.adopt(&mut instances);
        let cleanup = derive_cleanup(&plan, instances, strays, diag);
        plan.set_cleanup(cleanup);
        Ok(plan)
    }

    /// Converge every declared instance, tearing down cleanup first.
    pub async fn up(
        &self,
        plan: &mut ProjectPlan,
        attach: bool,
        diag: &mut Diagnostics,
    ) -> Result<(), ReconcileError> {
        self.teardown_cleanup(plan).await?;

        let mut prepared = HashSet::new();
        for index in 0..plan.instances().len() {
            let instance = plan.instances()[index].clone();
            self.prepare_image(&instance, &mut prepared).await?;

            let recorded = self.recorded_fingerprint(&instance).await?;
            match decide(&instance, recorded.as_deref()) {
                Decision::Create => self.exec.run(&instance, attach).await?,
                Decision::Recreate => {
                    tracing::info!(instance = instance.target_name(), "configuration changed, recreating");
                    self.exec.remove(&instance, &force()).await?;
                    self.exec.run(&instance, attach).await?;
                }
                Decision::BlueGreen => {
                    let replaced = blue_green(&self.exec, instance, attach, diag).await?;
                    if replaced.number() == 1 {
                        plan.retarget(index, &replaced);
                    }
                    plan.instances_mut()[index] = replaced;
                }
                Decision::AlreadyRunning => {
                    tracing::info!(instance = instance.target_name(), "already running");
                    if attach {
                        self.exec.attach(&instance).await?;
                    }
                }
                Decision::Start => self.exec.start(&instance, attach).await?,
            }
        }

        if attach {
            self.await_attached().await;
        }
        Ok(())
    }

    /// Stop and remove every cleanup instance, highest first.
    async fn teardown_cleanup(&self, plan: &ProjectPlan) -> Result<(), ReconcileError> {
        for instance in plan.cleanup() {
            tracing::info!(instance = instance.target_name(), "removing instance beyond declared scale");
            if instance.is_running() {
                self.exec.stop(instance, &[]).await?;
            }
            self.exec.remove(instance, &[]).await?;
        }
        Ok(())
    }

    /// Build once per service when it has a build, otherwise pull when the
    /// image is missing locally.
    async fn prepare_image(
        &self,
        instance: &ContainerInstance,
        prepared: &mut HashSet<ServiceName>,
    ) -> Result<(), ReconcileError> {
        if !prepared.insert(instance.service_type().clone()) {
            return Ok(());
        }
        match &instance.service().build {
            Some(build) => self.exec.build(instance, build).await?,
            None => self.exec.ensure_image(instance).await?,
        }
        Ok(())
    }

    async fn recorded_fingerprint(
        &self,
        instance: &ContainerInstance,
    ) -> Result<Option<String>, ReconcileError> {
        if !instance.exists() {
            return Ok(None);
        }
        Ok(self
            .exec
            .runtime()
            .label_value(instance.target_name(), labels::FINGERPRINT)
            .await?)
    }

    async fn await_attached(&self) {
        let ctx = self.exec.context();
        tracing::debug!(workers = ctx.pending_workers(), "waiting for attached processes");
        ctx.wait_workers().await;
        if !ctx.is_dry_run() {
            ctx.wait_for_all_done().await;
        }
    }

    /// Create every missing instance without starting it.
    pub async fn create(&self, plan: &ProjectPlan) -> Result<(), ReconcileError> {
        let mut prepared = HashSet::new();
        for instance in startup_order(plan.instances()) {
            if instance.exists() {
                tracing::info!(instance = instance.target_name(), "already exists");
                continue;
            }
            self.prepare_image(instance, &mut prepared).await?;
            self.exec.create(instance).await?;
        }
        Ok(())
    }

    /// Start every stopped instance, attaching when asked.
    pub async fn start(&self, plan: &ProjectPlan, attach: bool) -> Result<(), ReconcileError> {
        for instance in startup_order(plan.instances()) {
            if !instance.exists() {
                tracing::info!(instance = instance.name(), "does not exist, skipping");
                continue;
            }
            if instance.is_running() {
                tracing::info!(instance = instance.target_name(), "already running");
                if attach {
                    self.exec.attach(instance).await?;
                }
                continue;
            }
            self.exec.start(instance, attach).await?;
        }
        if attach {
            self.await_attached().await;
        }
        Ok(())
    }

    pub async fn restart(&self, plan: &ProjectPlan, args: &[String]) -> Result<(), ReconcileError> {
        for instance in startup_order(plan.instances()) {
            if !instance.exists() {
                tracing::info!(instance = instance.name(), "does not exist, skipping");
                continue;
            }
            self.exec.restart(instance, args).await?;
        }
        Ok(())
    }

    /// Stop every running instance, cleanup included, highest first.
    pub async fn stop(&self, plan: &ProjectPlan, args: &[String]) -> Result<(), ReconcileError> {
        for instance in teardown_set(plan) {
            if !instance.is_running() {
                tracing::info!(instance = instance.target_name(), "already stopped");
                continue;
            }
            self.exec.stop(&instance, args).await?;
        }
        Ok(())
    }

    pub async fn kill(&self, plan: &ProjectPlan, args: &[String]) -> Result<(), ReconcileError> {
        for instance in teardown_set(plan) {
            if !instance.is_running() {
                tracing::info!(instance = instance.target_name(), "already stopped");
                continue;
            }
            self.exec.kill(&instance, args).await?;
        }
        Ok(())
    }

    /// Remove every existing instance, cleanup included, highest first.
    pub async fn rm(&self, plan: &ProjectPlan, args: &[String]) -> Result<(), ReconcileError> {
        for instance in teardown_set(plan) {
            if !instance.exists() {
                tracing::debug!(instance = instance.name(), "does not exist");
                continue;
            }
            self.exec.remove(&instance, args).await?;
        }
        Ok(())
    }

    /// Build every service that declares a build.
    pub async fn build(&self, plan: &ProjectPlan) -> Result<(), ReconcileError> {
        for instance in first_instances(plan) {
            if let Some(build) = &instance.service().build {
                self.exec.build(instance, build).await?;
            }
        }
        Ok(())
    }

    /// Pull the image of every service that does not build its own.
    pub async fn pull(&self, plan: &ProjectPlan) -> Result<(), ReconcileError> {
        for instance in first_instances(plan) {
            if instance.service().build.is_none() {
                self.exec.pull(instance).await?;
            }
        }
        Ok(())
    }

    /// Follow the logs of every existing instance until they all end.
    pub async fn logs(&self, plan: &ProjectPlan, tail: u64) -> Result<(), ReconcileError> {
        for instance in startup_order(plan.instances()) {
            if instance.exists() {
                self.exec.follow_logs(instance, tail).await?;
            }
        }
        let ctx = self.exec.context();
        tracing::debug!(workers = ctx.pending_workers(), "following logs");
        ctx.wait_workers().await;
        Ok(())
    }

    /// IP addresses of every running instance.
    pub async fn ips(&self, plan: &ProjectPlan) -> Result<Vec<(String, Vec<String>)>, ReconcileError> {
        let mut ips = Vec::new();
        for instance in startup_order(plan.instances()) {
            if instance.is_running() {
                let name = instance.target_name();
                let addresses = self.exec.runtime().ip_addresses(name).await?;
                ips.push((name.to_string(), addresses));
            }
        }
        Ok(ips)
    }

    pub async fn stats(&self, plan: &ProjectPlan) -> Result<(), ReconcileError> {
        let names: Vec<String> = startup_order(plan.instances())
            .into_iter()
            .filter(|instance| instance.is_running())
            .map(|instance| instance.target_name().to_string())
            .collect();
        if names.is_empty() {
            tracing::info!("no running containers");
            return Ok(());
        }
        self.exec.runtime().stats(&names).await?;
        Ok(())
    }
}

fn force() -> [String; 1] {
    ["-f".to_string()]
}

/// Declared and cleanup instances together, in teardown order.
fn teardown_set(plan: &ProjectPlan) -> Vec<ContainerInstance> {
    let all: Vec<ContainerInstance> = plan
        .instances()
        .iter()
        .chain(plan.cleanup())
        .cloned()
        .collect();
    teardown_order(&all).into_iter().cloned().collect()
}

fn first_instances(plan: &ProjectPlan) -> impl Iterator<Item = &ContainerInstance> {
    plan.instances().iter().filter(|instance| instance.number() == 1)
}
