// ABOUTME: In-memory runtime that records every call and simulates container state.
// ABOUTME: Backs the reconciler's tests; supports scripted launch and call failures.

use super::traits::sealed::Sealed;
use super::traits::{
    AttachedProcess, BuildSpec, CommandFailure, ContainerDetails, ContainerError, ContainerOps,
    ContainerRow, ImageError, ImageOps, InstanceOutput, LogError, LogOps, LogStream,
};
use crate::model::labels;
use crate::types::{ContainerId, ImageId, ImageRef};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};

/// A call the runtime received, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    Inspect(String),
    ListProject(String),
    ImageId(String),
    Run { name: String, attached: bool },
    Create(String),
    Start(String),
    Stop(String),
    Kill(String),
    Remove(String),
    Restart(String),
    Build(String),
    Pull(String),
    Attach(String),
    Logs(String),
    Ps(String),
    Stats(Vec<String>),
}

impl RuntimeCall {
    /// Whether the call changes runtime state.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            RuntimeCall::Run { .. }
                | RuntimeCall::Create(_)
                | RuntimeCall::Start(_)
                | RuntimeCall::Stop(_)
                | RuntimeCall::Kill(_)
                | RuntimeCall::Remove(_)
                | RuntimeCall::Restart(_)
                | RuntimeCall::Build(_)
                | RuntimeCall::Pull(_)
        )
    }
}

/// How a scripted launch of a named container misbehaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchFailure {
    /// The container starts and immediately exits with this code.
    Exits(i64),
    /// The launch reports success but the container never appears.
    NeverAppears,
}

#[derive(Debug, Clone)]
struct FakeContainer {
    id: ContainerId,
    image: String,
    ip: String,
    labels: HashMap<String, String>,
    running: bool,
    started_at: Option<DateTime<Utc>>,
    exit_code: i64,
}

#[derive(Debug, Default)]
struct State {
    containers: BTreeMap<String, FakeContainer>,
    images: HashSet<String>,
    calls: Vec<RuntimeCall>,
    failing: Vec<RuntimeCall>,
    launch_failures: HashMap<String, LaunchFailure>,
    output: HashMap<String, Vec<String>>,
    next_id: u64,
    last_stamp: Option<DateTime<Utc>>,
}

impl State {
    /// Record a call, failing it if it was scripted to fail.
    fn record(&mut self, call: RuntimeCall) -> Result<(), CommandFailure> {
        let scripted = self.failing.contains(&call);
        let command = format!("{call:?}");
        self.calls.push(call);
        if scripted {
            return Err(CommandFailure {
                command,
                exit_code: Some(1),
                output: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    /// Start times are stamped a tick ahead of the wall clock so a launch
    /// never ties with a timestamp the caller took just before it.
    fn stamp(&mut self) -> DateTime<Utc> {
        let tick = Duration::milliseconds(1);
        let mut now = Utc::now() + tick;
        if let Some(last) = self.last_stamp
            && now <= last
        {
            now = last + tick;
        }
        self.last_stamp = Some(now);
        now
    }

    fn launch(&mut self, args: &[String], start: bool) -> Result<ContainerId, ContainerError> {
        let parsed = ParsedRun::from_args(args)?;
        if self.containers.contains_key(&parsed.name) {
            return Err(ContainerError::AlreadyExists(parsed.name));
        }

        self.next_id += 1;
        let id = ContainerId::new(format!("{:012x}", self.next_id));

        let failure = self.launch_failures.get(&parsed.name).cloned();
        if start && failure == Some(LaunchFailure::NeverAppears) {
            return Ok(id);
        }

        let (running, started_at, exit_code) = match (start, failure) {
            (false, _) => (false, None, 0),
            (true, Some(LaunchFailure::Exits(code))) => (false, Some(self.stamp()), code),
            (true, _) => (true, Some(self.stamp()), 0),
        };

        self.containers.insert(
            parsed.name,
            FakeContainer {
                id: id.clone(),
                image: parsed.image,
                ip: format!("10.88.0.{}", self.next_id % 250 + 1),
                labels: parsed.labels,
                running,
                started_at,
                exit_code,
            },
        );
        Ok(id)
    }

    fn container_mut(&mut self, name: &str) -> Result<&mut FakeContainer, ContainerError> {
        self.containers
            .get_mut(name)
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))
    }

    fn attached(&self, name: &str, output: InstanceOutput) -> AttachedProcess {
        for line in self.output.get(name).into_iter().flatten() {
            output
                .sink
                .write(&output.instance, LogStream::Stdout, line.as_bytes());
        }
        AttachedProcess::new(output.instance, async { Ok(Some(0)) })
    }
}

/// The pieces of a run-argument vector the fake cares about.
struct ParsedRun {
    name: String,
    image: String,
    labels: HashMap<String, String>,
}

impl ParsedRun {
    fn from_args(args: &[String]) -> Result<Self, ContainerError> {
        let mut name = None;
        let mut labels = HashMap::new();
        let mut image = None;
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--name" => name = iter.next().cloned(),
                "--label" => {
                    if let Some((key, value)) = iter.next().and_then(|l| l.split_once('=')) {
                        labels.insert(key.to_string(), value.to_string());
                    }
                }
                flag if flag.starts_with('-') => {
                    if !flag.contains('=') {
                        iter.next();
                    }
                }
                positional => {
                    image = Some(positional.to_string());
                    break;
                }
            }
        }
        let name = name.ok_or_else(|| {
            ContainerError::Runtime("run arguments must include --name".to_string())
        })?;
        Ok(Self {
            name,
            image: image.unwrap_or_default(),
            labels,
        })
    }
}

/// A runtime that lives entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryRuntime {
    state: Mutex<State>,
}

impl Sealed for MemoryRuntime {}

impl MemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an image present locally.
    pub fn add_image(&self, reference: &str) {
        self.state.lock().images.insert(reference.to_string());
    }

    /// Create a container directly, without recording a call.
    pub fn seed(&self, args: &[String], running: bool) -> Result<ContainerId, ContainerError> {
        let mut state = self.state.lock();
        let id = state.launch(args, true)?;
        if !running
            && let Some(container) = state.containers.values_mut().find(|c| c.id == id)
        {
            container.running = false;
        }
        Ok(id)
    }

    /// Fail every future call equal to `call`.
    pub fn fail_call(&self, call: RuntimeCall) {
        self.state.lock().failing.push(call);
    }

    /// Script how launches of `name` behave.
    pub fn fail_launch(&self, name: &str, failure: LaunchFailure) {
        self.state
            .lock()
            .launch_failures
            .insert(name.to_string(), failure);
    }

    /// Lines replayed to the sink whenever `name` is attached to.
    pub fn set_output(&self, name: &str, lines: &[&str]) {
        self.state.lock().output.insert(
            name.to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        );
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.state.lock().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<RuntimeCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.is_mutating())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn container_names(&self) -> Vec<String> {
        self.state.lock().containers.keys().cloned().collect()
    }

    /// `None` when no container has that name.
    pub fn running(&self, name: &str) -> Option<bool> {
        self.state.lock().containers.get(name).map(|c| c.running)
    }

    pub fn labels(&self, name: &str) -> Option<HashMap<String, String>> {
        self.state
            .lock()
            .containers
            .get(name)
            .map(|c| c.labels.clone())
    }
}

#[async_trait]
impl ContainerOps for MemoryRuntime {
    async fn inspect_container(
        &self,
        name: &str,
    ) -> Result<Option<ContainerDetails>, ContainerError> {
        let mut state = self.state.lock();
        state
            .record(RuntimeCall::Inspect(name.to_string()))
            .map_err(ContainerError::Command)?;
        Ok(state.containers.get(name).map(|c| ContainerDetails {
            id: c.id.clone(),
            name: name.to_string(),
            image_id: ImageId::new(format!("sha256:{}", c.image)),
            running: c.running,
            started_at: c.started_at,
            exit_code: c.exit_code,
            labels: c.labels.clone(),
            ip_addresses: if c.running {
                vec![c.ip.clone()]
            } else {
                Vec::new()
            },
        }))
    }

    async fn list_project_containers(
        &self,
        project: &str,
    ) -> Result<Vec<ContainerRow>, ContainerError> {
        let mut state = self.state.lock();
        state
            .record(RuntimeCall::ListProject(project.to_string()))
            .map_err(ContainerError::Command)?;
        Ok(state
            .containers
            .iter()
            .filter(|(_, c)| c.labels.get(labels::PROJECT).map(String::as_str) == Some(project))
            .map(|(name, c)| ContainerRow {
                id: c.id.clone(),
                name: name.clone(),
                labels: c.labels.clone(),
                running: c.running,
            })
            .collect())
    }

    async fn run_container(&self, args: &[String]) -> Result<ContainerId, ContainerError> {
        let mut state = self.state.lock();
        let name = ParsedRun::from_args(args)?.name;
        state
            .record(RuntimeCall::Run {
                name,
                attached: false,
            })
            .map_err(ContainerError::Command)?;
        state.launch(args, true)
    }

    async fn create_container(&self, args: &[String]) -> Result<ContainerId, ContainerError> {
        let mut state = self.state.lock();
        let name = ParsedRun::from_args(args)?.name;
        state
            .record(RuntimeCall::Create(name))
            .map_err(ContainerError::Command)?;
        state.launch(args, false)
    }

    async fn start_container(&self, name: &str) -> Result<(), ContainerError> {
        let mut state = self.state.lock();
        state
            .record(RuntimeCall::Start(name.to_string()))
            .map_err(ContainerError::Command)?;
        let stamp = state.stamp();
        let container = state.container_mut(name)?;
        container.running = true;
        container.started_at = Some(stamp);
        Ok(())
    }

    async fn stop_container(&self, name: &str, _args: &[String]) -> Result<(), ContainerError> {
        let mut state = self.state.lock();
        state
            .record(RuntimeCall::Stop(name.to_string()))
            .map_err(ContainerError::Command)?;
        state.container_mut(name)?.running = false;
        Ok(())
    }

    async fn kill_container(&self, name: &str, _args: &[String]) -> Result<(), ContainerError> {
        let mut state = self.state.lock();
        state
            .record(RuntimeCall::Kill(name.to_string()))
            .map_err(ContainerError::Command)?;
        let container = state.container_mut(name)?;
        if !container.running {
            return Err(ContainerError::NotRunning(name.to_string()));
        }
        container.running = false;
        container.exit_code = 137;
        Ok(())
    }

    async fn remove_container(
        &self,
        name: &str,
        args: &[String],
    ) -> Result<(), ContainerError> {
        let mut state = self.state.lock();
        state
            .record(RuntimeCall::Remove(name.to_string()))
            .map_err(ContainerError::Command)?;
        let force = args.iter().any(|a| a == "-f" || a == "--force");
        if state.container_mut(name)?.running && !force {
            return Err(ContainerError::Command(CommandFailure {
                command: format!("rm {name}"),
                exit_code: Some(1),
                output: format!("cannot remove running container {name}"),
            }));
        }
        state.containers.remove(name);
        Ok(())
    }

    async fn restart_container(
        &self,
        name: &str,
        _args: &[String],
    ) -> Result<(), ContainerError> {
        let mut state = self.state.lock();
        state
            .record(RuntimeCall::Restart(name.to_string()))
            .map_err(ContainerError::Command)?;
        let stamp = state.stamp();
        let container = state.container_mut(name)?;
        container.running = true;
        container.started_at = Some(stamp);
        Ok(())
    }

    async fn ps(&self, project: &str, _args: &[String]) -> Result<String, ContainerError> {
        let mut state = self.state.lock();
        state
            .record(RuntimeCall::Ps(project.to_string()))
            .map_err(ContainerError::Command)?;
        Ok(state
            .containers
            .iter()
            .filter(|(_, c)| c.labels.get(labels::PROJECT).map(String::as_str) == Some(project))
            .map(|(name, c)| format!("{name}\t{}\n", if c.running { "Up" } else { "Exited" }))
            .collect())
    }

    async fn stats(&self, names: &[String]) -> Result<(), ContainerError> {
        self.state
            .lock()
            .record(RuntimeCall::Stats(names.to_vec()))
            .map_err(ContainerError::Command)
    }
}

#[async_trait]
impl ImageOps for MemoryRuntime {
    async fn image_id(&self, reference: &ImageRef) -> Result<Option<ImageId>, ImageError> {
        let mut state = self.state.lock();
        state
            .record(RuntimeCall::ImageId(reference.to_string()))
            .map_err(ImageError::Command)?;
        Ok(state
            .images
            .contains(reference.as_str())
            .then(|| ImageId::new(format!("sha256:{reference}"))))
    }

    async fn build_image(&self, tag: &ImageRef, _build: &BuildSpec) -> Result<(), ImageError> {
        let mut state = self.state.lock();
        state
            .record(RuntimeCall::Build(tag.to_string()))
            .map_err(|source| ImageError::BuildFailed {
                tag: tag.to_string(),
                source,
            })?;
        state.images.insert(tag.to_string());
        Ok(())
    }

    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        let mut state = self.state.lock();
        state
            .record(RuntimeCall::Pull(reference.to_string()))
            .map_err(|source| ImageError::PullFailed {
                image: reference.to_string(),
                source,
            })?;
        state.images.insert(reference.to_string());
        Ok(())
    }
}

#[async_trait]
impl LogOps for MemoryRuntime {
    async fn run_attached(
        &self,
        args: &[String],
        output: InstanceOutput,
    ) -> Result<AttachedProcess, LogError> {
        let mut state = self.state.lock();
        let name = ParsedRun::from_args(args)
            .map_err(|e| LogError::StreamError(e.to_string()))?
            .name;
        state
            .record(RuntimeCall::Run {
                name: name.clone(),
                attached: true,
            })
            .map_err(|e| LogError::StreamError(e.to_string()))?;
        state
            .launch(args, true)
            .map_err(|e| LogError::StreamError(e.to_string()))?;
        Ok(state.attached(&name, output))
    }

    async fn attach(
        &self,
        name: &str,
        output: InstanceOutput,
    ) -> Result<AttachedProcess, LogError> {
        let mut state = self.state.lock();
        state
            .record(RuntimeCall::Attach(name.to_string()))
            .map_err(|e| LogError::StreamError(e.to_string()))?;
        if !state.containers.contains_key(name) {
            return Err(LogError::ContainerNotFound(name.to_string()));
        }
        Ok(state.attached(name, output))
    }

    async fn follow_logs(
        &self,
        name: &str,
        _tail: u64,
        output: InstanceOutput,
    ) -> Result<AttachedProcess, LogError> {
        let mut state = self.state.lock();
        state
            .record(RuntimeCall::Logs(name.to_string()))
            .map_err(|e| LogError::StreamError(e.to_string()))?;
        if !state.containers.contains_key(name) {
            return Err(LogError::ContainerNotFound(name.to_string()));
        }
        Ok(state.attached(name, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(name: &str) -> Vec<String> {
        [
            "--name",
            name,
            "--label",
            "convoy.project=shop",
            "-e",
            "A=1",
            "nginx",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[tokio::test]
    async fn run_creates_a_running_container() {
        let runtime = MemoryRuntime::new();
        runtime.run_container(&run_args("shop_web_1")).await.unwrap();

        assert_eq!(runtime.running("shop_web_1"), Some(true));
        assert_eq!(
            runtime.labels("shop_web_1").unwrap()["convoy.project"],
            "shop"
        );
        assert_eq!(
            runtime.calls(),
            vec![RuntimeCall::Run {
                name: "shop_web_1".to_string(),
                attached: false
            }]
        );
    }

    #[tokio::test]
    async fn running_containers_need_force_to_remove() {
        let runtime = MemoryRuntime::new();
        runtime.seed(&run_args("shop_web_1"), true).unwrap();

        assert!(runtime.remove_container("shop_web_1", &[]).await.is_err());
        runtime
            .remove_container("shop_web_1", &["-f".to_string()])
            .await
            .unwrap();
        assert_eq!(runtime.running("shop_web_1"), None);
    }

    #[tokio::test]
    async fn start_times_move_forward() {
        let runtime = MemoryRuntime::new();
        let before = Utc::now();
        runtime.run_container(&run_args("shop_web_1")).await.unwrap();
        assert!(runtime.started_after("shop_web_1", before).await.unwrap());
    }

    #[tokio::test]
    async fn scripted_failures_fail_matching_calls_only() {
        let runtime = MemoryRuntime::new();
        runtime.fail_call(RuntimeCall::Pull("redis".to_string()));

        let redis = ImageRef::parse("redis").unwrap();
        let nginx = ImageRef::parse("nginx").unwrap();
        assert!(runtime.pull_image(&redis).await.is_err());
        assert!(runtime.pull_image(&nginx).await.is_ok());
        assert!(runtime.image_id(&nginx).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn seeded_containers_are_not_recorded() {
        let runtime = MemoryRuntime::new();
        runtime.seed(&run_args("shop_db_1"), false).unwrap();
        assert!(runtime.calls().is_empty());
        assert_eq!(runtime.running("shop_db_1"), Some(false));
    }
}
