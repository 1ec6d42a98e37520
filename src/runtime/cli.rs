// ABOUTME: Runtime implementation that drives the docker or podman executable.
// ABOUTME: Spawns CLI subprocesses, parses inspect and ps output, streams attached output.

use super::error::RuntimeError;
use super::traits::sealed::Sealed;
use super::traits::{
    AttachedProcess, BuildSpec, CommandFailure, ContainerDetails, ContainerError, ContainerOps,
    ContainerRow, ImageError, ImageOps, InstanceOutput, LogError, LogOps, LogStream,
};
use super::types::{DetectedRuntime, RuntimeType};
use crate::types::{ContainerId, ImageId, ImageRef};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

/// A runtime reached through its command-line client.
#[derive(Debug, Clone)]
pub struct CliRuntime {
    runtime_type: RuntimeType,
    binary: PathBuf,
}

impl Sealed for CliRuntime {}

impl CliRuntime {
    pub fn new(detected: DetectedRuntime) -> Self {
        Self {
            runtime_type: detected.runtime_type,
            binary: detected.binary,
        }
    }

    /// Build a client and verify the runtime answers `version`.
    pub async fn connect(detected: DetectedRuntime) -> Result<Self, RuntimeError> {
        let runtime = Self::new(detected);
        let version = runtime
            .capture(&["version", "--format", "{{.Server.Version}}"])
            .await
            .map_err(|source| RuntimeError::Connection {
                runtime: runtime.runtime_type,
                source,
            })?;
        tracing::debug!(runtime = %runtime.runtime_type, version = version.trim(), "runtime reachable");
        Ok(runtime)
    }

    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }

    fn command<S: AsRef<str>>(&self, args: &[S]) -> Command {
        let mut command = Command::new(&self.binary);
        command.args(args.iter().map(AsRef::<str>::as_ref));
        command
    }

    fn describe<S: AsRef<str>>(&self, args: &[S]) -> String {
        let mut line = self.runtime_type.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg.as_ref());
        }
        line
    }

    /// Run to completion, returning stdout. Non-zero exits carry combined output.
    async fn capture<S: AsRef<str>>(&self, args: &[S]) -> Result<String, CommandFailure> {
        let line = self.describe(args);
        tracing::debug!(command = %line, "running");

        let output = self
            .command(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| CommandFailure {
                command: line.clone(),
                exit_code: None,
                output: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }

        let mut combined = stdout;
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Err(CommandFailure {
            command: line,
            exit_code: output.status.code(),
            output: combined,
        })
    }

    /// Run to completion with the terminal's standard streams.
    async fn passthrough<S: AsRef<str>>(&self, args: &[S]) -> Result<(), CommandFailure> {
        let line = self.describe(args);
        tracing::debug!(command = %line, "running");

        let status = self
            .command(args)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| CommandFailure {
                command: line.clone(),
                exit_code: None,
                output: e.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(CommandFailure {
                command: line,
                exit_code: status.code(),
                output: String::new(),
            })
        }
    }

    /// Spawn with piped output forwarded line by line to the sink.
    fn spawn_streaming(
        &self,
        args: Vec<String>,
        output: InstanceOutput,
    ) -> Result<AttachedProcess, LogError> {
        let line = self.describe(&args);
        tracing::debug!(command = %line, instance = %output.instance, "spawning attached");

        let child = self
            .command(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LogError::Spawn {
                command: line,
                reason: e.to_string(),
            })?;

        Ok(stream_child(child, output))
    }

    async fn lifecycle(
        &self,
        verb: &str,
        name: &str,
        extra: &[String],
    ) -> Result<(), ContainerError> {
        let mut args = vec![verb.to_string()];
        args.extend(extra.iter().cloned());
        args.push(name.to_string());
        self.capture(&args)
            .await
            .map(|_| ())
            .map_err(|failure| classify_container_failure(name, failure))
    }
}

fn stream_child(mut child: Child, output: InstanceOutput) -> AttachedProcess {
    let stdout = child
        .stdout
        .take()
        .map(|out| tokio::spawn(pump(out, output.clone(), LogStream::Stdout)));
    let stderr = child
        .stderr
        .take()
        .map(|err| tokio::spawn(pump(err, output.clone(), LogStream::Stderr)));

    AttachedProcess::new(output.instance, async move {
        let status = child
            .wait()
            .await
            .map_err(|e| LogError::StreamError(e.to_string()))?;
        for forwarder in [stdout, stderr].into_iter().flatten() {
            let _ = forwarder.await;
        }
        Ok(status.code())
    })
}

async fn pump<R: AsyncRead + Unpin>(reader: R, output: InstanceOutput, stream: LogStream) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        output.sink.write(&output.instance, stream, line.as_bytes());
    }
}

fn classify_container_failure(name: &str, failure: CommandFailure) -> ContainerError {
    if failure.mentions("no such container") {
        ContainerError::NotFound(name.to_string())
    } else if failure.mentions("is not running") {
        ContainerError::NotRunning(name.to_string())
    } else if failure.mentions("already in use") {
        ContainerError::AlreadyExists(name.to_string())
    } else {
        ContainerError::Command(failure)
    }
}

fn name_from_args(args: &[String]) -> &str {
    args.iter()
        .position(|arg| arg == "--name")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectEntry {
    id: String,
    name: String,
    image: String,
    state: InspectState,
    #[serde(default)]
    config: Option<InspectConfig>,
    #[serde(default)]
    network_settings: Option<InspectNetworkSettings>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectState {
    running: bool,
    #[serde(default)]
    started_at: Option<String>,
    #[serde(default)]
    exit_code: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectConfig {
    #[serde(default)]
    labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectNetworkSettings {
    #[serde(default)]
    networks: Option<HashMap<String, InspectNetwork>>,
}

#[derive(Debug, Deserialize)]
struct InspectNetwork {
    #[serde(rename = "IPAddress", default)]
    ip_address: String,
}

/// Parse `inspect` JSON, one entry per inspected container.
fn parse_inspect_all(json: &str) -> Result<Vec<ContainerDetails>, ContainerError> {
    let entries: Vec<InspectEntry> = serde_json::from_str(json)
        .map_err(|e| ContainerError::Runtime(format!("unreadable inspect output: {e}")))?;
    Ok(entries.into_iter().map(InspectEntry::into_details).collect())
}

/// Parse `inspect` JSON for a single container.
fn parse_inspect(json: &str) -> Result<Option<ContainerDetails>, ContainerError> {
    Ok(parse_inspect_all(json)?.into_iter().next())
}

impl InspectEntry {
    fn into_details(self) -> ContainerDetails {
        let mut ip_addresses: Vec<String> = self
            .network_settings
            .and_then(|settings| settings.networks)
            .into_iter()
            .flat_map(HashMap::into_values)
            .map(|network| network.ip_address)
            .filter(|ip| !ip.is_empty())
            .collect();
        ip_addresses.sort();

        ContainerDetails {
            id: ContainerId::new(self.id),
            name: self.name.trim_start_matches('/').to_string(),
            image_id: ImageId::new(self.image),
            running: self.state.running,
            started_at: self.state.started_at.as_deref().and_then(parse_start_time),
            exit_code: self.state.exit_code,
            labels: self.config.and_then(|c| c.labels).unwrap_or_default(),
            ip_addresses,
        }
    }
}

fn into_row(details: ContainerDetails) -> ContainerRow {
    ContainerRow {
        id: details.id,
        name: details.name,
        labels: details.labels,
        running: details.running,
    }
}

/// Never-started containers report the zero time, which reads as `None`.
fn parse_start_time(raw: &str) -> Option<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw.trim()).ok()?;
    let parsed = parsed.with_timezone(&Utc);
    (parsed.timestamp() > 0).then_some(parsed)
}

#[async_trait]
impl ContainerOps for CliRuntime {
    async fn inspect_container(
        &self,
        name: &str,
    ) -> Result<Option<ContainerDetails>, ContainerError> {
        match self
            .capture(&["container", "inspect", "--type", "container", name])
            .await
        {
            Ok(json) => parse_inspect(&json),
            Err(failure) if failure.mentions("no such") => Ok(None),
            Err(failure) => Err(ContainerError::Command(failure)),
        }
    }

    async fn list_project_containers(
        &self,
        project: &str,
    ) -> Result<Vec<ContainerRow>, ContainerError> {
        let filter = format!("label={}={}", crate::model::labels::PROJECT, project);
        let stdout = self
            .capture(&["ps", "-a", "-q", "--no-trunc", "--filter", filter.as_str()])
            .await
            .map_err(ContainerError::Command)?;
        let ids: Vec<&str> = stdout.split_whitespace().collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // ps flattens labels into text that cannot hold commas or spaces.
        let mut args = vec!["container", "inspect", "--type", "container"];
        args.extend(&ids);
        match self.capture(&args).await {
            Ok(json) => Ok(parse_inspect_all(&json)?.into_iter().map(into_row).collect()),
            Err(failure) if failure.mentions("no such") => {
                // A container went away between ps and inspect.
                let mut rows = Vec::with_capacity(ids.len());
                for id in ids {
                    if let Some(details) = self.inspect_container(id).await? {
                        rows.push(into_row(details));
                    }
                }
                Ok(rows)
            }
            Err(failure) => Err(ContainerError::Command(failure)),
        }
    }

    async fn run_container(&self, args: &[String]) -> Result<ContainerId, ContainerError> {
        let mut full = vec!["run".to_string(), "-d".to_string()];
        full.extend(args.iter().cloned());
        self.capture(&full)
            .await
            .map(|stdout| ContainerId::new(stdout.trim()))
            .map_err(|failure| classify_container_failure(name_from_args(args), failure))
    }

    async fn create_container(&self, args: &[String]) -> Result<ContainerId, ContainerError> {
        let mut full = vec!["create".to_string()];
        full.extend(args.iter().cloned());
        self.capture(&full)
            .await
            .map(|stdout| ContainerId::new(stdout.trim()))
            .map_err(|failure| classify_container_failure(name_from_args(args), failure))
    }

    async fn start_container(&self, name: &str) -> Result<(), ContainerError> {
        self.lifecycle("start", name, &[]).await
    }

    async fn stop_container(&self, name: &str, args: &[String]) -> Result<(), ContainerError> {
        self.lifecycle("stop", name, args).await
    }

    async fn kill_container(&self, name: &str, args: &[String]) -> Result<(), ContainerError> {
        self.lifecycle("kill", name, args).await
    }

    async fn remove_container(
        &self,
        name: &str,
        args: &[String],
    ) -> Result<(), ContainerError> {
        self.lifecycle("rm", name, args).await
    }

    async fn restart_container(
        &self,
        name: &str,
        args: &[String],
    ) -> Result<(), ContainerError> {
        self.lifecycle("restart", name, args).await
    }

    async fn ps(&self, project: &str, args: &[String]) -> Result<String, ContainerError> {
        let mut full = vec!["ps".to_string()];
        full.extend(args.iter().cloned());
        full.push("--filter".to_string());
        full.push(format!("label={}={}", crate::model::labels::PROJECT, project));
        self.capture(&full).await.map_err(ContainerError::Command)
    }

    async fn stats(&self, names: &[String]) -> Result<(), ContainerError> {
        let mut full = vec!["stats".to_string()];
        full.extend(names.iter().cloned());
        self.passthrough(&full)
            .await
            .map_err(ContainerError::Command)
    }
}

#[async_trait]
impl ImageOps for CliRuntime {
    async fn image_id(&self, reference: &ImageRef) -> Result<Option<ImageId>, ImageError> {
        match self
            .capture(&["image", "inspect", "--format", "{{.Id}}", reference.as_str()])
            .await
        {
            Ok(stdout) => Ok(Some(ImageId::new(stdout.trim()))),
            Err(failure) if failure.mentions("no such") || failure.mentions("image not known") => {
                Ok(None)
            }
            Err(failure) => Err(ImageError::Command(failure)),
        }
    }

    async fn build_image(&self, tag: &ImageRef, build: &BuildSpec) -> Result<(), ImageError> {
        let mut args = vec!["build".to_string(), "-t".to_string(), tag.to_string()];
        for (key, value) in &build.args {
            args.push("--build-arg".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push(build.context.display().to_string());
        self.passthrough(&args)
            .await
            .map_err(|source| ImageError::BuildFailed {
                tag: tag.to_string(),
                source,
            })
    }

    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        self.passthrough(&["pull", reference.as_str()])
            .await
            .map_err(|source| ImageError::PullFailed {
                image: reference.to_string(),
                source,
            })
    }
}

#[async_trait]
impl LogOps for CliRuntime {
    async fn run_attached(
        &self,
        args: &[String],
        output: InstanceOutput,
    ) -> Result<AttachedProcess, LogError> {
        let mut full: Vec<String> = ["run", "-a", "stdout", "-a", "stderr", "--sig-proxy=false"]
            .into_iter()
            .map(String::from)
            .collect();
        full.extend(args.iter().cloned());
        self.spawn_streaming(full, output)
    }

    async fn attach(
        &self,
        name: &str,
        output: InstanceOutput,
    ) -> Result<AttachedProcess, LogError> {
        let args = ["attach", "--no-stdin", "--sig-proxy=false", name]
            .into_iter()
            .map(String::from)
            .collect();
        self.spawn_streaming(args, output)
    }

    async fn follow_logs(
        &self,
        name: &str,
        tail: u64,
        output: InstanceOutput,
    ) -> Result<AttachedProcess, LogError> {
        let args = vec![
            "logs".to_string(),
            "--tail".to_string(),
            tail.to_string(),
            "-f".to_string(),
            name.to_string(),
        ];
        self.spawn_streaming(args, output)
    }
}
