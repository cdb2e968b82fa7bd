use super::human_size;
use colored::Colorize;
use crossrep_config::ConfigError;
use std::path::Path;

pub fn handle(path: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "Validating configuration...".blue());

    let (path, project) = crossrep_config::load_project(path)?;
    println!("Configuration: {}", path.display().to_string().cyan());

    match crossrep_config::validate(&project) {
        Ok(()) => {}
        Err(ConfigError::Invalid(issues)) => {
            eprintln!();
            eprintln!("{}", "Configuration is invalid".red().bold());
            for issue in &issues {
                eprintln!("  - {}", issue);
            }
            anyhow::bail!("{} issue(s) found", issues.len());
        }
        Err(e) => return Err(e.into()),
    }

    println!("{}", "✓ Configuration is valid".green().bold());
    println!();
    println!("Subscription: {}", project.general.subscription_id);
    println!("Cleanup after run: {}", project.general.should_cleanup);
    for account in &project.accounts {
        println!(
            "  account {} ({}, {})",
            account.name.cyan(),
            account.resource_group,
            account.location
        );
        for pool in &account.capacity_pools {
            println!(
                "    pool {} ({}, {})",
                pool.name.cyan(),
                pool.service_level,
                human_size(pool.size)
            );
            for volume in &pool.volumes {
                let source = volume
                    .source_volume
                    .as_ref()
                    .map(|s| format!(" <- {}", s))
                    .unwrap_or_default();
                println!(
                    "      volume {} ({}, {}){}",
                    volume.name.cyan(),
                    volume.protocol,
                    human_size(volume.usage_threshold),
                    source
                );
            }
        }
    }
    Ok(())
}
