use super::{Context, print_report};
use colored::Colorize;
use crossrep_orchestrator::Lifecycle;

pub async fn handle(context: &Context, json: bool) -> anyhow::Result<()> {
    eprintln!(
        "{} replication and resources via {}",
        "Removing".blue().bold(),
        context.target.gateway().name().cyan()
    );

    let lifecycle = Lifecycle::new(
        context.target.gateway(),
        context.target.sleeper(),
        &context.config,
    );
    let report = lifecycle.down(&context.project).await?;
    print_report(&report, json)
}
