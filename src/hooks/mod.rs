// ABOUTME: Hook pipeline: shell scripts run before and after lifecycle actions.
// ABOUTME: Definitions are immutable; in-flight executions live in the registry.

mod registry;

pub use registry::{HookRegistry, InFlightHook};

use crate::model::ContainerInstance;
use nonempty::NonEmpty;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::process::{ExitStatus, Stdio};
use std::str::FromStr;
use std::sync::Arc;
use tokio::process::Command;

/// Whether a hook runs before or after its action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HookPhase {
    Before,
    After,
}

/// The action or command a hook is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HookEvent {
    Up,
    Create,
    Run,
    Start,
    Stop,
    Kill,
    Rm,
    Restart,
    Build,
    Pull,
    Scale,
}

impl HookEvent {
    const ALL: [HookEvent; 11] = [
        HookEvent::Up,
        HookEvent::Create,
        HookEvent::Run,
        HookEvent::Start,
        HookEvent::Stop,
        HookEvent::Kill,
        HookEvent::Rm,
        HookEvent::Restart,
        HookEvent::Build,
        HookEvent::Pull,
        HookEvent::Scale,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookEvent::Up => "up",
            HookEvent::Create => "create",
            HookEvent::Run => "run",
            HookEvent::Start => "start",
            HookEvent::Stop => "stop",
            HookEvent::Kill => "kill",
            HookEvent::Rm => "rm",
            HookEvent::Restart => "restart",
            HookEvent::Build => "build",
            HookEvent::Pull => "pull",
            HookEvent::Scale => "scale",
        }
    }
}

/// A hook slot such as `before.run` or `after.up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HookPoint {
    pub phase: HookPhase,
    pub event: HookEvent,
}

impl HookPoint {
    pub fn before(event: HookEvent) -> Self {
        Self {
            phase: HookPhase::Before,
            event,
        }
    }

    pub fn after(event: HookEvent) -> Self {
        Self {
            phase: HookPhase::After,
            event,
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase {
            HookPhase::Before => "before",
            HookPhase::After => "after",
        };
        write!(f, "{phase}.{}", self.event.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hook '{0}': expected before.<event> or after.<event>")]
pub struct ParseHookPointError(String);

impl FromStr for HookPoint {
    type Err = ParseHookPointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ParseHookPointError(s.to_string());
        let (phase, event) = s.split_once('.').ok_or_else(unknown)?;
        let phase = match phase {
            "before" => HookPhase::Before,
            "after" => HookPhase::After,
            _ => return Err(unknown()),
        };
        let event = HookEvent::ALL
            .into_iter()
            .find(|e| e.as_str() == event)
            .ok_or_else(unknown)?;
        Ok(Self { phase, event })
    }
}

/// Scripts bound to one hook point, run in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookDefinition {
    pub point: HookPoint,
    pub scripts: NonEmpty<String>,
}

/// The hooks declared for a service or for the project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookSet {
    hooks: BTreeMap<HookPoint, HookDefinition>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, definition: HookDefinition) {
        self.hooks.insert(definition.point, definition);
    }

    pub fn get(&self, point: HookPoint) -> Option<&HookDefinition> {
        self.hooks.get(&point)
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = HookPoint> + '_ {
        self.hooks.keys().copied()
    }
}

impl FromIterator<HookDefinition> for HookSet {
    fn from_iter<I: IntoIterator<Item = HookDefinition>>(iter: I) -> Self {
        let mut set = Self::new();
        for definition in iter {
            set.insert(definition);
        }
        set
    }
}

/// The instance a hook runs for.
#[derive(Debug, Clone)]
pub struct InstanceContext {
    pub name: String,
    pub service_type: String,
    pub number: u32,
}

/// Context passed to hooks via environment variables.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub project: String,
    pub instance: Option<InstanceContext>,
}

impl HookContext {
    /// Context for a project-level hook.
    pub fn project(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            instance: None,
        }
    }

    /// Context for a hook around an action on `instance`.
    pub fn instance(instance: &ContainerInstance) -> Self {
        Self {
            project: instance.project().name().to_string(),
            instance: Some(InstanceContext {
                name: instance.name().to_string(),
                service_type: instance.service_type().to_string(),
                number: instance.number(),
            }),
        }
    }

    /// Who the hook runs for: the instance name, or the project name.
    pub fn owner(&self) -> &str {
        self.instance
            .as_ref()
            .map(|i| i.name.as_str())
            .unwrap_or(&self.project)
    }

    /// Convert context to environment variables.
    pub fn to_env(&self, point: HookPoint) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("CONVOY_PROJECT_NAME".to_string(), self.project.clone());
        env.insert("CONVOY_HOOK_NAME".to_string(), point.to_string());
        if let Some(ref instance) = self.instance {
            env.insert("CONVOY_INSTANCE_NAME".to_string(), instance.name.clone());
            env.insert(
                "CONVOY_SERVICE_TYPE".to_string(),
                instance.service_type.clone(),
            );
            env.insert(
                "CONVOY_INSTANCE_NUMBER".to_string(),
                instance.number.to_string(),
            );
        }
        env
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("failed to spawn {hook} hook: {source}")]
    Spawn {
        hook: HookPoint,
        #[source]
        source: std::io::Error,
    },

    #[error("{hook} hook for {owner} failed ({status})")]
    Failed {
        hook: HookPoint,
        owner: String,
        status: ExitStatus,
    },

    #[error("{hook} hook for {owner} was killed")]
    Killed { hook: HookPoint, owner: String },
}

/// Runs hook scripts through `sh -c`, registering each so it can be killed.
#[derive(Debug, Clone, Default)]
pub struct HookRunner {
    registry: Arc<HookRegistry>,
}

impl HookRunner {
    pub fn new(registry: Arc<HookRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    /// Run every script bound to `point`, stopping at the first failure.
    /// A missing hook is a no-op.
    pub async fn run(
        &self,
        hooks: &HookSet,
        point: HookPoint,
        context: &HookContext,
    ) -> Result<(), HookError> {
        let Some(definition) = hooks.get(point) else {
            return Ok(());
        };
        let owner = context.owner();
        let env = context.to_env(point);

        for script in definition.scripts.iter() {
            tracing::info!(hook = %point, owner, "running hook");
            tracing::debug!(script = %script, "hook script");

            let mut child = Command::new("sh")
                .arg("-c")
                .arg(script)
                .envs(&env)
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .kill_on_drop(true)
                .spawn()
                .map_err(|source| HookError::Spawn {
                    hook: point,
                    source,
                })?;

            let (registration, mut kill) = self.registry.register(owner, point);
            let status = tokio::select! {
                status = child.wait() => status.map_err(|source| HookError::Spawn { hook: point, source })?,
                Ok(ack) = &mut kill => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    let _ = ack.send(());
                    return Err(HookError::Killed {
                        hook: point,
                        owner: owner.to_string(),
                    });
                }
            };
            drop(registration);

            if !status.success() {
                tracing::warn!(hook = %point, owner, %status, "hook failed");
                return Err(HookError::Failed {
                    hook: point,
                    owner: owner.to_string(),
                    status,
                });
            }
        }
        Ok(())
    }
}
