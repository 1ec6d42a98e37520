// ABOUTME: Loads the project file and connects the runtime for a command.
// ABOUTME: Builds the per-command execution context around the console sink.

use super::runtime_connection::connect_to_runtime;
use convoy::config::Config;
use convoy::error::Result;
use convoy::execute::{ConfirmPolicy, ExecutionContext};
use convoy::hooks::HookRunner;
use convoy::model::{Project, ProjectPlan};
use convoy::runtime::CliRuntime;
use convoy::shutdown::ShutdownCoordinator;
use convoy::sink::{ColorPalette, ConsoleSink};
use std::env;
use std::path::Path;
use std::sync::Arc;

/// Everything a command needs before it touches containers.
pub struct Workspace {
    pub project: Project,
    pub runtime: CliRuntime,
    confirm: ConfirmPolicy,
    dry_run: bool,
}

impl Workspace {
    /// Load `file`, or discover a project file in the working directory.
    pub async fn open(file: Option<&Path>, dry_run: bool) -> Result<Self> {
        let loaded = match file {
            Some(path) => Config::load(path)?,
            None => Config::discover(&env::current_dir()?)?,
        };
        let runtime_type = loaded.config.runtime;
        let confirm = loaded.config.confirm.policy();
        let project = loaded.config.into_project(&loaded.dir)?;
        tracing::debug!(project = project.id.name(), services = project.services.len(), "loaded project");

        let runtime = connect_to_runtime(runtime_type).await?;
        Ok(Self {
            project,
            runtime,
            confirm,
            dry_run,
        })
    }

    /// A fresh context for one command, wired to the shutdown coordinator.
    pub fn context(&self, shutdown: &ShutdownCoordinator) -> ExecutionContext {
        let width = ProjectPlan::materialize(&self.project).name_width();
        let sink = Arc::new(ConsoleSink::new(ColorPalette::new(), width));
        ExecutionContext::new(
            sink,
            HookRunner::new(Arc::clone(shutdown.hooks())),
            shutdown.subscribe(),
        )
        .with_dry_run(self.dry_run)
        .with_confirm(self.confirm)
    }
}
