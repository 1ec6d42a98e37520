// ABOUTME: Per-run execution context: dry-run flag, output sink, hooks, and worker tracking.
// ABOUTME: Attached processes join a shared JoinSet that attach batches wait on.

use crate::hooks::HookRunner;
use crate::model::{Action, ActionRecord};
use crate::runtime::AttachedProcess;
use crate::shutdown::AllDone;
use crate::sink::LogSink;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// How long to wait for a launched container to report that it started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval: Duration::from_millis(200),
        }
    }
}

/// State shared by every action in one command.
pub struct ExecutionContext {
    dry_run: bool,
    confirm: ConfirmPolicy,
    sink: Arc<dyn LogSink>,
    hooks: HookRunner,
    all_done: AllDone,
    workers: Mutex<JoinSet<()>>,
    audit: Mutex<Vec<ActionRecord>>,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("dry_run", &self.dry_run)
            .field("confirm", &self.confirm)
            .field("workers", &self.workers.lock().len())
            .finish_non_exhaustive()
    }
}

impl ExecutionContext {
    pub fn new(sink: Arc<dyn LogSink>, hooks: HookRunner, all_done: AllDone) -> Self {
        Self {
            dry_run: false,
            confirm: ConfirmPolicy::default(),
            sink,
            hooks,
            all_done,
            workers: Mutex::new(JoinSet::new()),
            audit: Mutex::new(Vec::new()),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_confirm(mut self, confirm: ConfirmPolicy) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn confirm(&self) -> ConfirmPolicy {
        self.confirm
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    pub fn hooks(&self) -> &HookRunner {
        &self.hooks
    }

    pub fn record(&self, instance: &str, action: Action) {
        self.audit.lock().push(ActionRecord {
            instance: instance.to_string(),
            action,
        });
    }

    /// Every action requested so far, in order. Dry-run actions included.
    pub fn actions(&self) -> Vec<ActionRecord> {
        self.audit.lock().clone()
    }

    /// Track an attached process until its output ends.
    pub fn spawn_worker(&self, process: AttachedProcess) {
        self.workers.lock().spawn(async move {
            let instance = process.instance().to_string();
            match process.wait().await {
                Ok(Some(0)) | Ok(None) => tracing::debug!(instance, "attached process ended"),
                Ok(Some(code)) => tracing::info!(instance, code, "attached process exited"),
                Err(error) => tracing::warn!(instance, %error, "attached process failed"),
            }
        });
    }

    pub fn pending_workers(&self) -> usize {
        self.workers.lock().len()
    }

    /// Wait for every attached process spawned so far.
    pub async fn wait_workers(&self) {
        let mut workers = std::mem::take(&mut *self.workers.lock());
        while let Some(result) = workers.join_next().await {
            if let Err(error) = result {
                tracing::warn!(%error, "attached worker panicked");
            }
        }
    }

    /// Park until the shutdown coordinator releases everyone.
    pub async fn wait_for_all_done(&self) {
        self.all_done.clone().wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CaptureSink;

    fn context() -> ExecutionContext {
        ExecutionContext::new(
            Arc::new(CaptureSink::new()),
            HookRunner::default(),
            AllDone::released(),
        )
    }

    #[test]
    fn audit_trail_keeps_order() {
        let ctx = context();
        ctx.record("shop_db_1", Action::Run);
        ctx.record("shop_web_1", Action::Start);
        let actions = ctx.actions();
        assert_eq!(actions[0].action, Action::Run);
        assert_eq!(actions[1].instance, "shop_web_1");
    }

    #[tokio::test]
    async fn wait_workers_drains_the_set() {
        let ctx = context();
        ctx.spawn_worker(AttachedProcess::new("shop_web_1", async { Ok(Some(0)) }));
        ctx.spawn_worker(AttachedProcess::new("shop_web_2", async { Ok(Some(2)) }));
        assert_eq!(ctx.pending_workers(), 2);

        ctx.wait_workers().await;
        assert_eq!(ctx.pending_workers(), 0);
    }
}
