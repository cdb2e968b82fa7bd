use super::Context;
use colored::Colorize;
use crossrep_cloud::{AccountKey, PoolKey, ResourceKey, StorageGateway, VolumeKey};

pub async fn handle(context: &Context) -> anyhow::Result<()> {
    let gateway = context.target.gateway();
    println!("{} via {}", "Status".blue().bold(), gateway.name().cyan());
    println!();

    for account in &context.project.accounts {
        print_state(gateway, AccountKey::of(account).into(), 1).await;
        for pool in &account.capacity_pools {
            print_state(gateway, PoolKey::of(account, pool).into(), 2).await;
            for volume in &pool.volumes {
                let key = VolumeKey::of(account, pool, volume);
                print_state(gateway, key.clone().into(), 3).await;
                if volume.is_destination() {
                    print_replication(gateway, &key).await;
                }
            }
        }
    }
    Ok(())
}

async fn print_state(gateway: &dyn StorageGateway, key: ResourceKey, depth: usize) {
    let indent = "  ".repeat(depth);
    let state = match gateway.get(&key).await {
        Ok(Some(resource)) if resource.provisioning_state.is_succeeded() => {
            resource.provisioning_state.to_string().green()
        }
        Ok(Some(resource)) if resource.provisioning_state.is_failed() => {
            resource.provisioning_state.to_string().red()
        }
        Ok(Some(resource)) => resource.provisioning_state.to_string().yellow(),
        Ok(None) => "absent".dimmed(),
        Err(e) => format!("error: {}", e).red(),
    };
    println!("{}{} {}", indent, key, state);
}

async fn print_replication(gateway: &dyn StorageGateway, volume: &VolumeKey) {
    let state = match gateway.replication_status(volume).await {
        Ok(Some(status)) => {
            let health = match status.healthy {
                Some(true) => " (healthy)",
                Some(false) => " (unhealthy)",
                None => "",
            };
            format!("{}{}", status.mirror_state, health).cyan()
        }
        Ok(None) => "no replication".dimmed(),
        Err(e) => format!("error: {}", e).red(),
    };
    println!("        replication {}", state);
}
