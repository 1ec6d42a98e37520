// ABOUTME: Test support utilities.
// ABOUTME: Project fixtures, a fast execution context, and seeding helpers for MemoryRuntime.

#![allow(dead_code)]

use convoy::execute::{ConfirmPolicy, ExecutionContext};
use convoy::hooks::{HookRunner, HookSet};
use convoy::model::{ContainerInstance, Project, ProjectId, ProjectPlan, ServiceDefinition};
use convoy::runtime::MemoryRuntime;
use convoy::shutdown::AllDone;
use convoy::sink::CaptureSink;
use convoy::types::{ImageRef, ServiceName};
use std::sync::{Arc, Once};
use std::time::Duration;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("convoy=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Log output collected by [`capture_logs`].
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<parking_lot::Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    /// Lines containing `needle`.
    pub fn lines_with(&self, needle: &str) -> Vec<String> {
        self.text()
            .lines()
            .filter(|line| line.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Capture convoy's log output on this thread until the guard drops.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("convoy=debug"))
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

pub const IMAGE: &str = "busybox:1.36";

/// A single-instance service running `IMAGE`.
pub fn service(name: &str, placement: usize) -> ServiceDefinition {
    ServiceDefinition {
        name: ServiceName::new(name).unwrap(),
        image: ImageRef::parse(IMAGE).unwrap(),
        build: None,
        command: vec!["sleep".to_string(), "infinity".to_string()],
        create_args: Vec::new(),
        links: Vec::new(),
        volumes_from: Vec::new(),
        hooks: HookSet::default(),
        scale: 1,
        placement,
        blue_green: false,
    }
}

/// A project named `shop` with the default separator.
pub fn project(services: Vec<ServiceDefinition>) -> Project {
    Project {
        id: ProjectId::new("shop", "_"),
        hooks: HookSet::default(),
        services: services.into_iter().map(Arc::new).collect(),
    }
}

/// A runtime that already has `IMAGE` locally.
pub fn runtime() -> MemoryRuntime {
    let runtime = MemoryRuntime::new();
    runtime.add_image(IMAGE);
    runtime
}

pub fn fast_confirm() -> ConfirmPolicy {
    ConfirmPolicy {
        attempts: 3,
        interval: Duration::from_millis(1),
    }
}

/// A context whose all-done signal has already fired, so attach batches
/// return once their workers finish.
pub fn context() -> (ExecutionContext, Arc<CaptureSink>) {
    init_tracing();
    let sink = Arc::new(CaptureSink::new());
    let ctx = ExecutionContext::new(sink.clone(), HookRunner::default(), AllDone::released())
        .with_confirm(fast_confirm());
    (ctx, sink)
}

pub fn dry_run_context() -> ExecutionContext {
    let (ctx, _) = context();
    ctx.with_dry_run(true)
}

/// The declared instance `service`/`number` of a fresh plan.
pub fn declared(project: &Project, service: &str, number: u32) -> ContainerInstance {
    ProjectPlan::materialize(project)
        .instances()
        .iter()
        .find(|i| i.service_type().as_str() == service && i.number() == number)
        .cloned()
        .unwrap()
}

/// Seed a container exactly as convoy would launch the declared instance.
pub fn seed_current(runtime: &MemoryRuntime, project: &Project, service: &str, number: u32, running: bool) -> String {
    let instance = declared(project, service, number);
    runtime.seed(&instance.launch_args(), running).unwrap();
    instance.name().to_string()
}
