pub mod down;
pub mod status;
pub mod up;
pub mod validate;

use crate::target::Target;
use colored::Colorize;
use crossrep_core::{GIB, ProjectConfig, TIB};
use crossrep_orchestrator::{OrchestratorConfig, RunReport, StepKind};
use std::path::Path;

/// Everything a command needs: the validated topology and where it runs
///
/// Progress lines go to stderr so stdout carries only command output.
pub struct Context {
    pub project: ProjectConfig,
    pub target: Target,
    pub config: OrchestratorConfig,
}

impl Context {
    pub fn load(path: Option<&Path>, simulate: bool) -> anyhow::Result<Self> {
        let (path, project) = crossrep_config::load_project(path)?;
        crossrep_config::validate(&project)?;
        eprintln!("Configuration: {}", path.display().to_string().cyan());

        let target = Target::build(&project, simulate)?;
        let config = OrchestratorConfig::from_polling(project.general.polling.as_ref());
        Ok(Self {
            project,
            target,
            config,
        })
    }
}

pub fn print_report(report: &RunReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!();
    for step in &report.steps {
        let marker = match step.kind {
            StepKind::Created | StepKind::Authorized | StepKind::Mirrored => "+".green(),
            StepKind::Deleted | StepKind::Broken | StepKind::ReplicationDeleted => "-".red(),
            _ => "=".dimmed(),
        };
        println!("  {} {} {}", marker, step.kind.to_string().bold(), step.resource);
    }
    for warning in &report.warnings {
        println!("  {} {}: {}", "!".yellow(), warning.resource, warning.message);
    }

    println!();
    let summary = report.summary().to_string();
    if report.is_clean() {
        println!("{} {}", "✓".green().bold(), summary.green());
    } else {
        println!("{} {}", "⚠".yellow().bold(), summary.yellow());
    }
    println!("  finished in {} ms", report.duration_ms);
    Ok(())
}

/// Byte count in the largest whole binary unit
pub fn human_size(bytes: u64) -> String {
    if bytes >= TIB && bytes % TIB == 0 {
        format!("{} TiB", bytes / TIB)
    } else if bytes >= GIB && bytes % GIB == 0 {
        format!("{} GiB", bytes / GIB)
    } else {
        format!("{} bytes", bytes)
    }
}
