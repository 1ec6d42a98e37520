// ABOUTME: Blue-green swap as a type-state machine over one instance.
// ABOUTME: Each transition consumes the swap; a failed launch tears down only the new color.

use super::error::ReconcileError;
use super::swap_state::{Confirmed, Launched, Planned, Retired};
use crate::diagnostics::{Diagnostics, Warning};
use crate::execute::{ExecError, Executor};
use crate::model::{Action, ContainerInstance};
use crate::runtime::{ContainerOps, Runtime};
use crate::types::Color;
use chrono::Utc;

/// A replacement of `old` by the same instance under the other color.
#[derive(Debug)]
pub struct Swap<S> {
    old: ContainerInstance,
    new: ContainerInstance,
    state: S,
}

impl<S> Swap<S> {
    pub fn old(&self) -> &ContainerInstance {
        &self.old
    }

    pub fn new_instance(&self) -> &ContainerInstance {
        &self.new
    }

    fn transition<T>(self, state: T) -> Swap<T> {
        Swap {
            old: self.old,
            new: self.new,
            state,
        }
    }

    /// Tear down the replacement after a failed launch or confirmation and
    /// report the failure. The old instance is never touched here.
    async fn abort<R: Runtime + ?Sized>(
        self,
        exec: &Executor<'_, R>,
        diag: &mut Diagnostics,
        source: ExecError,
    ) -> ReconcileError {
        let name = self.new.name();
        tracing::warn!(instance = name, error = %source, "replacement failed, removing it");

        if !exec.context().is_dry_run() {
            let runtime = exec.runtime();
            if runtime.is_running(name).await.unwrap_or(false) {
                exec.context().record(name, Action::Kill);
                if let Err(error) = runtime.kill_container(name, &[]).await {
                    diag.warn(Warning::swap_cleanup(format!("failed to kill {name}: {error}")));
                }
            }
            if runtime.exists(name).await.unwrap_or(false) {
                exec.context().record(name, Action::Remove);
                if let Err(error) = runtime.remove_container(name, &["-f".to_string()]).await {
                    diag.warn(Warning::swap_cleanup(format!("failed to remove {name}: {error}")));
                }
            }
        }

        ReconcileError::SwapAborted {
            old: self.old.target_name().to_string(),
            new: name.to_string(),
            source,
        }
    }
}

impl Swap<Planned> {
    /// Materialize the replacement under the other color.
    pub fn plan(old: ContainerInstance) -> Self {
        let color = Color::swap_target(old.color());
        let new = old.recolored(color);
        Swap {
            old,
            new,
            state: Planned,
        }
    }

    pub async fn launch<R: Runtime + ?Sized>(
        self,
        exec: &Executor<'_, R>,
        attach: bool,
        diag: &mut Diagnostics,
    ) -> Result<Swap<Launched>, ReconcileError> {
        tracing::info!(
            old = self.old.target_name(),
            new = self.new.name(),
            "configuration changed, starting blue-green replacement"
        );
        let launched_at = Utc::now();
        let launched = exec.run(&self.new, attach).await;
        match launched {
            Ok(()) => Ok(self.transition(Launched { launched_at })),
            Err(source) => Err(self.abort(exec, diag, source).await),
        }
    }
}

impl Swap<Launched> {
    /// Wait for the replacement to be running.
    pub async fn confirm<R: Runtime + ?Sized>(
        self,
        exec: &Executor<'_, R>,
        diag: &mut Diagnostics,
    ) -> Result<Swap<Confirmed>, ReconcileError> {
        if exec.context().is_dry_run() {
            return Ok(self.transition(Confirmed));
        }
        let confirmed = exec
            .confirm_running(self.new.name(), self.state.launched_at)
            .await;
        match confirmed {
            Ok(()) => Ok(self.transition(Confirmed)),
            Err(source) => Err(self.abort(exec, diag, source).await),
        }
    }
}

impl Swap<Confirmed> {
    /// Force-remove the old color.
    pub async fn retire<R: Runtime + ?Sized>(
        self,
        exec: &Executor<'_, R>,
    ) -> Result<Swap<Retired>, ReconcileError> {
        exec.remove(&self.old, &["-f".to_string()]).await?;
        Ok(self.transition(Retired))
    }
}

impl Swap<Retired> {
    /// The instance now in service.
    pub fn finish(self) -> ContainerInstance {
        self.new
    }
}

/// Run the whole swap for one instance.
pub async fn blue_green<R: Runtime + ?Sized>(
    exec: &Executor<'_, R>,
    old: ContainerInstance,
    attach: bool,
    diag: &mut Diagnostics,
) -> Result<ContainerInstance, ReconcileError> {
    let swap = Swap::plan(old)
        .launch(exec, attach, diag)
        .await?
        .confirm(exec, diag)
        .await?
        .retire(exec)
        .await?;
    Ok(swap.finish())
}
