// ABOUTME: Command handlers for the convoy CLI.
// ABOUTME: Each command plans the project, runs its batch, and wraps it in project hooks.

mod runtime_connection;
mod show;
mod workspace;

use crate::cli::{Cli, Commands};
use convoy::diagnostics::Diagnostics;
use convoy::error::{Error, Result};
use convoy::hooks::{HookEvent, HookPoint};
use convoy::model::ProjectPlan;
use convoy::reconcile::{ReconcileError, Reconciler};
use convoy::runtime::{CliRuntime, ContainerOps};
use convoy::shutdown::ShutdownCoordinator;
use workspace::Workspace;

/// Run one CLI command to completion.
pub async fn run(cli: Cli, shutdown: &ShutdownCoordinator) -> Result<()> {
    let mut workspace = Workspace::open(cli.file.as_deref(), cli.dry_run).await?;

    match &cli.command {
        Commands::Ps { args } => {
            let listing = workspace
                .runtime
                .ps(workspace.project.id.name(), args)
                .await
                .map_err(ReconcileError::from)?;
            print!("{listing}");
            return Ok(());
        }
        Commands::Scale { service, count } => {
            if !workspace.project.override_scale(service, *count) {
                return Err(Error::UnknownService(service.clone()));
            }
        }
        _ => {}
    }

    let ctx = workspace.context(shutdown);
    let reconciler = Reconciler::new(&workspace.runtime, &ctx);
    let mut diag = Diagnostics::default();
    let mut plan = reconciler.plan(&workspace.project, &mut diag).await?;

    if let Commands::Show = cli.command {
        return show::print_plan(&workspace.runtime, &plan).await;
    }

    let event = project_event(&cli.command);
    let project = workspace.project.id.name();
    if let Some(event) = event {
        reconciler
            .executor()
            .project_hook(plan.hooks(), HookPoint::before(event), project)
            .await
            .map_err(ReconcileError::from)?;
    }

    dispatch(&reconciler, &mut plan, cli.command, &mut diag).await?;

    if let Some(event) = event {
        reconciler
            .executor()
            .project_hook(plan.hooks(), HookPoint::after(event), project)
            .await
            .map_err(ReconcileError::from)?;
    }

    if diag.has_warnings() {
        tracing::warn!(count = diag.warnings().len(), "finished with warnings");
    }
    Ok(())
}

async fn dispatch(
    reconciler: &Reconciler<'_, CliRuntime>,
    plan: &mut ProjectPlan,
    command: Commands,
    diag: &mut Diagnostics,
) -> Result<()> {
    match command {
        Commands::Up { attach } => reconciler.up(plan, attach, diag).await?,
        Commands::Scale { .. } => reconciler.up(plan, false, diag).await?,
        Commands::Create => reconciler.create(plan).await?,
        Commands::Start { attach } => reconciler.start(plan, attach).await?,
        Commands::Restart { args } => reconciler.restart(plan, &args).await?,
        Commands::Stop { args } => reconciler.stop(plan, &args).await?,
        Commands::Kill { args } => reconciler.kill(plan, &args).await?,
        Commands::Rm { args } => reconciler.rm(plan, &args).await?,
        Commands::Build => reconciler.build(plan).await?,
        Commands::Pull => reconciler.pull(plan).await?,
        Commands::Logs { tail } => reconciler.logs(plan, tail).await?,
        Commands::Stats => reconciler.stats(plan).await?,
        Commands::Ip => {
            for (name, addresses) in reconciler.ips(plan).await? {
                for address in addresses {
                    println!("{name} {address}");
                }
            }
        }
        Commands::Ps { .. } | Commands::Show => {}
    }
    Ok(())
}

/// Project-level hook event for a command, if it has one.
fn project_event(command: &Commands) -> Option<HookEvent> {
    match command {
        Commands::Up { .. } => Some(HookEvent::Up),
        Commands::Create => Some(HookEvent::Create),
        Commands::Start { .. } => Some(HookEvent::Start),
        Commands::Scale { .. } => Some(HookEvent::Scale),
        Commands::Restart { .. } => Some(HookEvent::Restart),
        Commands::Stop { .. } => Some(HookEvent::Stop),
        Commands::Kill { .. } => Some(HookEvent::Kill),
        Commands::Rm { .. } => Some(HookEvent::Rm),
        Commands::Build => Some(HookEvent::Build),
        Commands::Pull => Some(HookEvent::Pull),
        Commands::Ps { .. }
        | Commands::Ip
        | Commands::Logs { .. }
        | Commands::Stats
        | Commands::Show => None,
    }
}
