//! Structural validation of a loaded topology
//!
//! Every violation is collected so a single run reports all of them.

use crate::error::{ConfigError, Result};
use crossrep_core::{GIB, ProjectConfig, TIB, Volume};
use std::collections::HashSet;

/// Smallest capacity pool the service accepts
pub const MIN_POOL_SIZE: u64 = 4 * TIB;

pub const MIN_USAGE_THRESHOLD: u64 = 100 * GIB;

pub const MAX_USAGE_THRESHOLD: u64 = 100 * TIB;

pub fn validate(project: &ProjectConfig) -> Result<()> {
    let issues = collect_issues(project);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(issues))
    }
}

pub fn collect_issues(project: &ProjectConfig) -> Vec<String> {
    let mut issues = Vec::new();

    if project.general.subscription_id.trim().is_empty() {
        issues.push("general.subscriptionId is empty".to_string());
    }
    if project.accounts.is_empty() {
        issues.push("no accounts configured".to_string());
    }

    let mut account_names = HashSet::new();
    for (a, account) in project.accounts.iter().enumerate() {
        let at = format!("accounts[{}]", a);
        require(&mut issues, &at, "name", &account.name);
        require(&mut issues, &at, "resourceGroup", &account.resource_group);
        require(&mut issues, &at, "location", &account.location);
        if !account_names.insert((account.resource_group.to_lowercase(), account.name.to_lowercase())) {
            issues.push(format!("{}: duplicate account '{}'", at, account.name));
        }

        let mut pool_names = HashSet::new();
        let mut tokens = HashSet::new();
        for (p, pool) in account.capacity_pools.iter().enumerate() {
            let at = format!("{}.capacityPools[{}]", at, p);
            require(&mut issues, &at, "name", &pool.name);
            if !pool_names.insert(pool.name.to_lowercase()) {
                issues.push(format!("{}: duplicate pool '{}'", at, pool.name));
            }
            if pool.size < MIN_POOL_SIZE {
                issues.push(format!(
                    "{}: size {} is below the 4 TiB minimum",
                    at, pool.size
                ));
            }

            let mut volume_names = HashSet::new();
            for (v, volume) in pool.volumes.iter().enumerate() {
                let at = format!("{}.volumes[{}]", at, v);
                if !volume_names.insert(volume.name.to_lowercase()) {
                    issues.push(format!("{}: duplicate volume '{}'", at, volume.name));
                }
                if !volume.creation_token.is_empty() && !tokens.insert(volume.creation_token.as_str()) {
                    issues.push(format!(
                        "{}: creation token '{}' is already used in account '{}'",
                        at, volume.creation_token, account.name
                    ));
                }
                check_volume(&mut issues, &at, volume);

                if let Some(source) = &volume.source_volume {
                    let same_volume = source.resource_group.eq_ignore_ascii_case(&account.resource_group)
                        && source.account_name.eq_ignore_ascii_case(&account.name)
                        && source.pool_name.eq_ignore_ascii_case(&pool.name)
                        && source.volume_name.eq_ignore_ascii_case(&volume.name);
                    if same_volume {
                        issues.push(format!("{}: sourceVolume refers to the volume itself", at));
                    }
                }
            }
        }
    }

    issues
}

fn check_volume(issues: &mut Vec<String>, at: &str, volume: &Volume) {
    require(issues, at, "name", &volume.name);
    require(issues, at, "creationToken", &volume.creation_token);

    if !(MIN_USAGE_THRESHOLD..=MAX_USAGE_THRESHOLD).contains(&volume.usage_threshold) {
        issues.push(format!(
            "{}: usageThreshold {} must be between 100 GiB and 100 TiB",
            at, volume.usage_threshold
        ));
    }

    let mut indexes = HashSet::new();
    for rule in &volume.export_policies {
        if !indexes.insert(rule.rule_index) {
            issues.push(format!(
                "{}: export rule index {} is used more than once",
                at, rule.rule_index
            ));
        }
    }

    if let Some(source) = &volume.source_volume {
        for (field, value) in [
            ("resourceGroup", &source.resource_group),
            ("accountName", &source.account_name),
            ("poolName", &source.pool_name),
            ("volumeName", &source.volume_name),
        ] {
            require(issues, &format!("{}.sourceVolume", at), field, value);
        }
    }
}

fn require(issues: &mut Vec<String>, at: &str, field: &str, value: &str) {
    if value.trim().is_empty() {
        issues.push(format!("{}: {} is empty", at, field));
    }
}
