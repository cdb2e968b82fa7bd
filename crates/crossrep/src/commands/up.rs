use super::{Context, print_report};
use colored::Colorize;
use crossrep_orchestrator::Lifecycle;

pub async fn handle(context: &Context, cleanup: bool, json: bool) -> anyhow::Result<()> {
    let project = &context.project;
    let cleanup = cleanup || project.general.should_cleanup;

    eprintln!(
        "{} {} account(s), {} volume(s) via {}",
        "Provisioning".blue().bold(),
        project.accounts.len(),
        project.volume_count(),
        context.target.gateway().name().cyan()
    );
    if cleanup {
        eprintln!("{}", "Cleanup will run after replication is established".dimmed());
    }

    let lifecycle = Lifecycle::new(
        context.target.gateway(),
        context.target.sleeper(),
        &context.config,
    );
    let report = lifecycle.run(project, cleanup).await?;
    print_report(&report, json)
}
