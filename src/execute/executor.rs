// ABOUTME: Executes single lifecycle actions with hooks around them.
// ABOUTME: Daemon calls run synchronously; attached launches hand a worker to the context.

use super::context::ExecutionContext;
use super::error::ExecError;
use crate::hooks::{HookContext, HookEvent, HookPoint, HookSet};
use crate::model::{Action, ContainerInstance};
use crate::runtime::{BuildSpec, ContainerError, InstanceOutput, Runtime};
use chrono::{DateTime, Utc};

/// Runs actions for one command against a runtime.
pub struct Executor<'a, R: Runtime + ?Sized> {
    runtime: &'a R,
    ctx: &'a ExecutionContext,
}

impl<'a, R: Runtime + ?Sized> Executor<'a, R> {
    pub fn new(runtime: &'a R, ctx: &'a ExecutionContext) -> Self {
        Self { runtime, ctx }
    }

    pub fn runtime(&self) -> &'a R {
        self.runtime
    }

    pub fn context(&self) -> &'a ExecutionContext {
        self.ctx
    }

    async fn hook(&self, instance: &ContainerInstance, point: HookPoint) -> Result<(), ExecError> {
        let context = HookContext::instance(instance);
        self.ctx
            .hooks()
            .run(&instance.service().hooks, point, &context)
            .await?;
        Ok(())
    }

    /// Run a project-level hook. Skipped in dry-run.
    pub async fn project_hook(
        &self,
        hooks: &HookSet,
        point: HookPoint,
        project: &str,
    ) -> Result<(), ExecError> {
        if self.ctx.is_dry_run() {
            return Ok(());
        }
        self.ctx
            .hooks()
            .run(hooks, point, &HookContext::project(project))
            .await?;
        Ok(())
    }

    /// Record the action and report whether it should really happen.
    fn begin(&self, name: &str, action: Action) -> bool {
        self.ctx.record(name, action);
        if self.ctx.is_dry_run() {
            tracing::info!(instance = name, %action, "dry run, skipping");
            return false;
        }
        true
    }

    fn output(&self, name: &str) -> InstanceOutput {
        InstanceOutput::new(name, self.ctx.sink().clone())
    }

    /// Launch a fresh container. With `attach`, its output is streamed and
    /// the launch is confirmed before returning.
    pub async fn run(&self, instance: &ContainerInstance, attach: bool) -> Result<(), ExecError> {
        let name = instance.name();
        tracing::info!(instance = name, "running");
        if !self.begin(name, Action::Run) {
            return Ok(());
        }
        self.hook(instance, HookPoint::before(HookEvent::Run)).await?;

        let args = instance.launch_args();
        if attach {
            let launched_at = Utc::now();
            let process = self.runtime.run_attached(&args, self.output(name)).await?;
            self.ctx.spawn_worker(process);
            self.confirm_started(name, launched_at).await?;
        } else {
            let id = self.runtime.run_container(&args).await?;
            tracing::debug!(instance = name, id = id.short(), "container launched");
        }

        self.hook(instance, HookPoint::after(HookEvent::Run)).await
    }

    pub async fn create(&self, instance: &ContainerInstance) -> Result<(), ExecError> {
        let name = instance.name();
        tracing::info!(instance = name, "creating");
        if !self.begin(name, Action::Create) {
            return Ok(());
        }
        self.hook(instance, HookPoint::before(HookEvent::Create)).await?;
        self.runtime.create_container(&instance.launch_args()).await?;
        self.hook(instance, HookPoint::after(HookEvent::Create)).await
    }

    /// Start an existing container, optionally attaching to its output.
    pub async fn start(&self, instance: &ContainerInstance, attach: bool) -> Result<(), ExecError> {
        let name = instance.target_name();
        tracing::info!(instance = name, "starting");
        if !self.begin(name, Action::Start) {
            return Ok(());
        }
        self.hook(instance, HookPoint::before(HookEvent::Start)).await?;

        let started_at = Utc::now();
        self.runtime.start_container(name).await?;
        if attach {
            let process = self.runtime.attach(name, self.output(name)).await?;
            self.ctx.spawn_worker(process);
            self.confirm_started(name, started_at).await?;
        }

        self.hook(instance, HookPoint::after(HookEvent::Start)).await
    }

    /// Stream a running container's output.
    pub async fn attach(&self, instance: &ContainerInstance) -> Result<(), ExecError> {
        let name = instance.target_name();
        tracing::info!(instance = name, "attaching");
        if !self.begin(name, Action::Attach) {
            return Ok(());
        }
        let process = self.runtime.attach(name, self.output(name)).await?;
        self.ctx.spawn_worker(process);
        Ok(())
    }

    pub async fn stop(&self, instance: &ContainerInstance, args: &[String]) -> Result<(), ExecError> {
        let name = instance.target_name();
        tracing::info!(instance = name, "stopping");
        if !self.begin(name, Action::Stop) {
            return Ok(());
        }
        self.hook(instance, HookPoint::before(HookEvent::Stop)).await?;
        self.runtime.stop_container(name, args).await?;
        self.hook(instance, HookPoint::after(HookEvent::Stop)).await
    }

    pub async fn kill(&self, instance: &ContainerInstance, args: &[String]) -> Result<(), ExecError> {
        let name = instance.target_name();
        tracing::info!(instance = name, "killing");
        if !self.begin(name, Action::Kill) {
            return Ok(());
        }
        self.hook(instance, HookPoint::before(HookEvent::Kill)).await?;
        self.runtime.kill_container(name, args).await?;
        self.hook(instance, HookPoint::after(HookEvent::Kill)).await
    }

    pub async fn remove(&self, instance: &ContainerInstance, args: &[String]) -> Result<(), ExecError> {
        let name = instance.target_name();
        tracing::info!(instance = name, "removing");
        if !self.begin(name, Action::Remove) {
            return Ok(());
        }
        self.hook(instance, HookPoint::before(HookEvent::Rm)).await?;
        self.runtime.remove_container(name, args).await?;
        self.hook(instance, HookPoint::after(HookEvent::Rm)).await
    }

    pub async fn restart(&self, instance: &ContainerInstance, args: &[String]) -> Result<(), ExecError> {
        let name = instance.target_name();
        tracing::info!(instance = name, "restarting");
        if !self.begin(name, Action::Restart) {
            return Ok(());
        }
        self.hook(instance, HookPoint::before(HookEvent::Restart)).await?;
        self.runtime.restart_container(name, args).await?;
        self.hook(instance, HookPoint::after(HookEvent::Restart)).await
    }

    /// Build the service image. Hooks run in the context of `instance`.
    pub async fn build(&self, instance: &ContainerInstance, build: &BuildSpec) -> Result<(), ExecError> {
        tracing::info!(service = %instance.service_type(), image = %instance.image(), "building image");
        if self.ctx.is_dry_run() {
            return Ok(());
        }
        self.hook(instance, HookPoint::before(HookEvent::Build)).await?;
        self.runtime.build_image(instance.image(), build).await?;
        self.hook(instance, HookPoint::after(HookEvent::Build)).await
    }

    pub async fn pull(&self, instance: &ContainerInstance) -> Result<(), ExecError> {
        tracing::warn!(image = %instance.image(), "image not present locally, pulling");
        if self.ctx.is_dry_run() {
            return Ok(());
        }
        self.hook(instance, HookPoint::before(HookEvent::Pull)).await?;
        self.runtime.pull_image(instance.image()).await?;
        self.hook(instance, HookPoint::after(HookEvent::Pull)).await
    }

    /// Pull the image unless it is already present.
    pub async fn ensure_image(&self, instance: &ContainerInstance) -> Result<(), ExecError> {
        if self.runtime.image_id(instance.image()).await?.is_none() {
            self.pull(instance).await?;
        }
        Ok(())
    }

    pub async fn follow_logs(&self, instance: &ContainerInstance, tail: u64) -> Result<(), ExecError> {
        let name = instance.target_name();
        let process = self
            .runtime
            .follow_logs(name, tail, self.output(name))
            .await?;
        self.ctx.spawn_worker(process);
        Ok(())
    }

    /// Poll until `name` exists with a start time after `since`. A container
    /// that started but already exited non-zero is a startup failure.
    pub async fn confirm_started(&self, name: &str, since: DateTime<Utc>) -> Result<(), ExecError> {
        let policy = self.ctx.confirm();
        for attempt in 1..=policy.attempts {
            match self.runtime.started_after(name, since).await {
                Ok(true) => {
                    if !self.runtime.is_running(name).await? {
                        let code = self.runtime.exit_code(name).await?;
                        if code != 0 {
                            return Err(ExecError::ExitedEarly {
                                name: name.to_string(),
                                code,
                            });
                        }
                    }
                    return Ok(());
                }
                Ok(false) | Err(ContainerError::NotFound(_)) => {
                    tracing::debug!(instance = name, attempt, "waiting for container to start");
                }
                Err(error) => return Err(error.into()),
            }
            if attempt < policy.attempts {
                tokio::time::sleep(policy.interval).await;
            }
        }
        Err(ExecError::FailedToStart {
            name: name.to_string(),
        })
    }

    /// Like [`Self::confirm_started`], but the container must still be running.
    pub async fn confirm_running(&self, name: &str, since: DateTime<Utc>) -> Result<(), ExecError> {
        self.confirm_started(name, since).await?;
        if !self.runtime.is_running(name).await? {
            return Err(ExecError::NotRunning {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execute::ConfirmPolicy;
    use crate::hooks::HookRunner;
    use crate::model::{LinkTargets, ProjectId, ServiceDefinition};
    use crate::runtime::{LaunchFailure, MemoryRuntime, RuntimeCall};
    use crate::shutdown::AllDone;
    use crate::sink::CaptureSink;
    use crate::types::{ImageRef, ServiceName};
    use std::sync::Arc;
    use std::time::Duration;

    fn instance() -> ContainerInstance {
        let service = Arc::new(ServiceDefinition {
            name: ServiceName::new("web").unwrap(),
            image: ImageRef::parse("nginx").unwrap(),
            build: None,
            command: Vec::new(),
            create_args: Vec::new(),
            links: Vec::new(),
            volumes_from: Vec::new(),
            hooks: HookSet::default(),
            scale: 1,
            placement: 0,
            blue_green: false,
        });
        ContainerInstance::declare(&ProjectId::new("shop", "_"), service, 1, &LinkTargets::new())
    }

    fn context(sink: Arc<CaptureSink>) -> ExecutionContext {
        ExecutionContext::new(sink, HookRunner::default(), AllDone::released()).with_confirm(
            ConfirmPolicy {
                attempts: 3,
                interval: Duration::from_millis(1),
            },
        )
    }

    #[tokio::test]
    async fn attached_run_streams_output_and_confirms() {
        let runtime = MemoryRuntime::new();
        runtime.set_output("shop_web_1", &["listening on :80"]);
        let sink = Arc::new(CaptureSink::new());
        let ctx = context(Arc::clone(&sink));

        Executor::new(&runtime, &ctx).run(&instance(), true).await.unwrap();
        ctx.wait_workers().await;

        assert_eq!(sink.lines_for("shop_web_1"), ["listening on :80"]);
        assert_eq!(runtime.running("shop_web_1"), Some(true));
    }

    #[tokio::test]
    async fn container_that_never_appears_fails_to_start() {
        let runtime = MemoryRuntime::new();
        runtime.fail_launch("shop_web_1", LaunchFailure::NeverAppears);
        let ctx = context(Arc::new(CaptureSink::new()));

        let err = Executor::new(&runtime, &ctx)
            .run(&instance(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::FailedToStart { .. }));
    }

    #[tokio::test]
    async fn early_non_zero_exit_is_reported_with_code() {
        let runtime = MemoryRuntime::new();
        runtime.fail_launch("shop_web_1", LaunchFailure::Exits(2));
        let ctx = context(Arc::new(CaptureSink::new()));

        let err = Executor::new(&runtime, &ctx)
            .run(&instance(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::ExitedEarly { code: 2, .. }));
    }

    #[tokio::test]
    async fn dry_run_records_but_does_not_mutate() {
        let runtime = MemoryRuntime::new();
        let ctx = context(Arc::new(CaptureSink::new())).with_dry_run(true);

        let exec = Executor::new(&runtime, &ctx);
        exec.run(&instance(), false).await.unwrap();
        exec.ensure_image(&instance()).await.unwrap();

        assert!(runtime.mutating_calls().is_empty());
        assert_eq!(runtime.calls(), [RuntimeCall::ImageId("nginx".to_string())]);
        assert_eq!(ctx.actions()[0].action, Action::Run);
    }

    #[tokio::test]
    async fn daemon_failure_carries_runtime_output() {
        let runtime = MemoryRuntime::new();
        runtime.seed(&instance().launch_args(), true).unwrap();
        runtime.fail_call(RuntimeCall::Stop("shop_web_1".to_string()));
        let ctx = context(Arc::new(CaptureSink::new()));

        let err = Executor::new(&runtime, &ctx)
            .stop(&instance(), &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("scripted failure"));
    }
}
