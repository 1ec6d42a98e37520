// ABOUTME: Registry of hook processes currently running.
// ABOUTME: Lets the shutdown coordinator kill every in-flight hook and wait for it.

use super::HookPoint;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;

/// How long `kill_all` waits for one hook to confirm it is gone.
const KILL_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Kill request carrying the channel the hook acknowledges on.
type KillSender = oneshot::Sender<oneshot::Sender<()>>;
pub(super) type KillReceiver = oneshot::Receiver<oneshot::Sender<()>>;

struct HookExecution {
    owner: String,
    hook: HookPoint,
    kill: KillSender,
}

/// A hook that is running right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightHook {
    pub owner: String,
    pub hook: HookPoint,
}

#[derive(Default)]
pub struct HookRegistry {
    next_id: AtomicU64,
    in_flight: Mutex<HashMap<u64, HookExecution>>,
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("in_flight", &self.len())
            .finish()
    }
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a running hook. The entry is removed when the guard drops.
    pub(super) fn register(&self, owner: &str, hook: HookPoint) -> (Registration<'_>, KillReceiver) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (kill, receiver) = oneshot::channel();
        self.in_flight.lock().insert(
            id,
            HookExecution {
                owner: owner.to_string(),
                hook,
                kill,
            },
        );
        (Registration { registry: self, id }, receiver)
    }

    pub fn in_flight(&self) -> Vec<InFlightHook> {
        self.in_flight
            .lock()
            .values()
            .map(|execution| InFlightHook {
                owner: execution.owner.clone(),
                hook: execution.hook,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.in_flight.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kill every registered hook and wait for each to acknowledge.
    /// Returns how many hooks were signalled.
    pub async fn kill_all(&self) -> usize {
        let executions: Vec<HookExecution> = self.in_flight.lock().drain().map(|(_, e)| e).collect();
        let mut killed = 0;
        for execution in executions {
            let (ack, acked) = oneshot::channel();
            if execution.kill.send(ack).is_err() {
                continue;
            }
            killed += 1;
            tracing::info!(hook = %execution.hook, owner = %execution.owner, "killing hook");
            if tokio::time::timeout(KILL_ACK_TIMEOUT, acked).await.is_err() {
                tracing::warn!(hook = %execution.hook, owner = %execution.owner, "hook did not exit in time");
            }
        }
        killed
    }
}

/// Removes its hook from the registry on drop.
pub(super) struct Registration<'a> {
    registry: &'a HookRegistry,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.in_flight.lock().remove(&self.id);
    }
}
