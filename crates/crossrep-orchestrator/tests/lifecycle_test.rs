//! Full lifecycle against the in-memory control plane

use crossrep_cloud::{
    AccountKey, ConvergenceProfile, GatewayCall, InMemoryGateway, ResourceKey, VolumeKey,
};
use crossrep_core::ProjectConfig;
use crossrep_orchestrator::{InstantSleeper, Lifecycle, OrchestratorConfig, StepKind};
use std::time::Duration;

const APPSETTINGS: &str = r#"{
  "general": { "subscriptionId": "sub-0001", "shouldCleanUp": "true" },
  "accounts": [
    {
      "name": "A",
      "resourceGroup": "rg-east",
      "location": "eastus",
      "capacityPools": [
        {
          "name": "P",
          "serviceLevel": "Premium",
          "size": 4398046511104,
          "volumes": [
            {
              "name": "V1",
              "creationToken": "v1",
              "type": "NFSv3",
              "usageThreshold": 107374182400,
              "subnetId": "/subscriptions/sub-0001/resourceGroups/rg-east/providers/Microsoft.Network/virtualNetworks/vnet/subnets/anf",
              "exportPolicies": [
                { "ruleIndex": 1, "allowedClients": "0.0.0.0/0", "unixReadOnly": false, "unixReadWrite": true, "cifs": false, "nfsv3": true, "nfsv4": false }
              ]
            }
          ]
        }
      ]
    },
    {
      "name": "B",
      "resourceGroup": "rg-west",
      "location": "westus",
      "capacityPools": [
        {
          "name": "P2",
          "serviceLevel": "Premium",
          "size": 4398046511104,
          "volumes": [
            {
              "name": "V2",
              "creationToken": "v2",
              "type": "NFSv3",
              "usageThreshold": 107374182400,
              "sourceVolume": {
                "resourceGroup": "rg-east",
                "accountName": "A",
                "poolName": "P",
                "volumeName": "V1"
              }
            }
          ]
        }
      ]
    }
  ]
}"#;

fn project() -> ProjectConfig {
    serde_json::from_str(APPSETTINGS).expect("valid appsettings")
}

fn creation_order() -> Vec<ResourceKey> {
    vec![
        AccountKey::new("rg-east", "A").into(),
        AccountKey::new("rg-east", "A").pool("P").into(),
        VolumeKey::new("rg-east", "A", "P", "V1").into(),
        AccountKey::new("rg-west", "B").into(),
        AccountKey::new("rg-west", "B").pool("P2").into(),
        VolumeKey::new("rg-west", "B", "P2", "V2").into(),
    ]
}

fn fast_config() -> OrchestratorConfig {
    let mut config = OrchestratorConfig::default();
    config.post_authorize_delay = Duration::from_millis(1);
    config
}

#[tokio::test]
async fn test_full_lifecycle_with_cleanup() {
    let project = project();
    assert!(project.general.should_cleanup);

    let gateway = InMemoryGateway::new(&project.general.subscription_id);
    let sleeper = InstantSleeper::new();
    let config = fast_config();

    let report = Lifecycle::new(&gateway, &sleeper, &config)
        .run(&project, project.general.should_cleanup)
        .await
        .unwrap();

    assert_eq!(gateway.create_calls(), creation_order());

    let authorizations: Vec<_> = gateway
        .calls()
        .into_iter()
        .filter(|c| matches!(c, GatewayCall::Authorize { .. }))
        .collect();
    let destination: ResourceKey = VolumeKey::new("rg-west", "B", "P2", "V2").into();
    assert_eq!(
        authorizations,
        vec![GatewayCall::Authorize {
            source: VolumeKey::new("rg-east", "A", "P", "V1"),
            destination: destination.resource_id("sub-0001"),
        }]
    );

    let mut reversed = creation_order();
    reversed.reverse();
    assert_eq!(gateway.delete_calls(), reversed);
    assert_eq!(gateway.resource_count(), 0);

    let summary = report.summary();
    assert_eq!(summary.created, 6);
    assert_eq!(summary.replicated, 1);
    assert_eq!(summary.warnings, 0);
    assert_eq!(report.resources(StepKind::Mirrored), vec![&destination]);
}

#[tokio::test]
async fn test_rerun_without_cleanup_is_idempotent() {
    let project = project();
    let gateway = InMemoryGateway::new(&project.general.subscription_id);
    let sleeper = InstantSleeper::new();
    let config = fast_config();
    let lifecycle = Lifecycle::new(&gateway, &sleeper, &config);

    lifecycle.run(&project, false).await.unwrap();
    gateway.clear_calls();
    let report = lifecycle.run(&project, false).await.unwrap();

    assert!(gateway.create_calls().is_empty());
    assert!(gateway.delete_calls().is_empty());
    assert_eq!(report.summary().unchanged, 6);
    assert_eq!(report.steps_of(StepKind::AlreadyAuthorized).count(), 1);
    assert!(gateway.has_replication(&VolumeKey::new("rg-west", "B", "P2", "V2")));
}

#[tokio::test]
async fn test_down_twice_is_safe() {
    let project = project();
    let gateway =
        InMemoryGateway::with_profile(&project.general.subscription_id, ConvergenceProfile::immediate());
    let sleeper = InstantSleeper::new();
    let config = fast_config();
    let lifecycle = Lifecycle::new(&gateway, &sleeper, &config);

    lifecycle.up(&project).await.unwrap();
    lifecycle.down(&project).await.unwrap();
    gateway.clear_calls();
    let report = lifecycle.down(&project).await.unwrap();

    assert!(gateway.delete_calls().is_empty());
    assert_eq!(report.steps_of(StepKind::AlreadyAbsent).count(), 7);
}

#[tokio::test]
async fn test_transient_reads_are_absorbed() {
    let project = project();
    let gateway = InMemoryGateway::new(&project.general.subscription_id);
    let sleeper = InstantSleeper::new();
    let config = fast_config();
    gateway.inject_transient_reads(3);

    Lifecycle::new(&gateway, &sleeper, &config)
        .up(&project)
        .await
        .unwrap();

    assert_eq!(gateway.create_calls(), creation_order());
}
