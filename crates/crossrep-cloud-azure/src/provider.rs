//! Azure NetApp Files gateway implementation

use crate::body::{AuthorizeBody, ReplicationStatusResponse, ResourceBody, ResourceResponse};
use crate::error::{AzureError, Result};
use crate::status;
use async_trait::async_trait;
use crossrep_cloud::{
    GatewayError, ReplicationStatus, Resource, ResourceId, ResourceKey, ResourceSpec,
    StorageGateway, VolumeKey,
};
use reqwest::StatusCode;
use std::time::Duration;

/// Azure Resource Manager endpoint of the public cloud
pub const ARM_ENDPOINT: &str = "https://management.azure.com";

pub const API_VERSION: &str = "2022-05-01";

const TOKEN_ENV: &str = "AZURE_ACCESS_TOKEN";
const ENDPOINT_ENV: &str = "AZURE_RESOURCE_MANAGER_ENDPOINT";

/// Connection settings of the gateway
#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub subscription_id: String,
    pub access_token: String,
    pub endpoint: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl AzureConfig {
    pub fn new(subscription_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            access_token: access_token.into(),
            endpoint: ARM_ENDPOINT.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Read the bearer token (and an optional endpoint override) from the environment
    pub fn from_env(subscription_id: impl Into<String>) -> Result<Self> {
        let access_token = std::env::var(TOKEN_ENV)
            .map_err(|_| AzureError::MissingEnvVar(TOKEN_ENV.to_string()))?;
        let mut config = Self::new(subscription_id, access_token);
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            config.endpoint = endpoint;
        }
        Ok(config)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

pub struct AzureNetAppGateway {
    client: reqwest::Client,
    config: AzureConfig,
}

impl AzureNetAppGateway {
    pub fn new(config: AzureConfig) -> Result<Self> {
        if config.subscription_id.trim().is_empty() {
            return Err(AzureError::InvalidConfig("subscription id is empty".to_string()));
        }
        if config.access_token.trim().is_empty() {
            return Err(AzureError::InvalidConfig("access token is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn subscription(&self) -> &str {
        &self.config.subscription_id
    }

    fn base(&self) -> &str {
        self.config.endpoint.trim_end_matches('/')
    }

    /// URL of a resource
    pub fn resource_url(&self, key: &ResourceKey) -> String {
        format!(
            "{}{}?api-version={}",
            self.base(),
            key.resource_id(&self.config.subscription_id),
            API_VERSION
        )
    }

    /// URL of a volume action such as `authorizeReplication`
    pub fn action_url(&self, volume: &VolumeKey, action: &str) -> String {
        let key = ResourceKey::Volume(volume.clone());
        format!(
            "{}{}/{}?api-version={}",
            self.base(),
            key.resource_id(&self.config.subscription_id),
            action,
            API_VERSION
        )
    }

    /// Send an authenticated request; `None` for 404
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> crossrep_cloud::Result<Option<reqwest::Response>> {
        let response = request
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(status::transport)?;

        let code = response.status();
        if code == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if code.is_success() {
            return Ok(Some(response));
        }
        let body = response.text().await.unwrap_or_default();
        Err(status::classify(code, &body))
    }

    async fn post_action(
        &self,
        volume: &VolumeKey,
        action: &str,
        body: &serde_json::Value,
    ) -> crossrep_cloud::Result<Option<reqwest::Response>> {
        tracing::debug!("POST {} on {}", action, volume);
        let url = self.action_url(volume, action);
        self.send(self.client.post(&url).json(body)).await
    }
}

#[async_trait]
impl StorageGateway for AzureNetAppGateway {
    fn name(&self) -> &str {
        "azure-netapp"
    }

    async fn get(&self, key: &ResourceKey) -> crossrep_cloud::Result<Option<Resource>> {
        let url = self.resource_url(key);
        let Some(response) = self.send(self.client.get(&url)).await? else {
            return Ok(None);
        };
        let body: ResourceResponse = response.json().await.map_err(status::transport)?;
        let provisioning_state = body.provisioning_state();
        Ok(Some(Resource {
            id: body.id,
            key: key.clone(),
            location: body.location,
            provisioning_state,
        }))
    }

    async fn create(&self, key: &ResourceKey, spec: &ResourceSpec) -> crossrep_cloud::Result<()> {
        if spec.kind() != key.kind() {
            return Err(GatewayError::InvalidConfig(format!(
                "{} spec given for {}",
                spec.kind(),
                key
            )));
        }
        tracing::debug!("PUT {}", key);
        let body = ResourceBody::from_spec(spec)?;
        let url = self.resource_url(key);
        match self.send(self.client.put(&url).json(&body)).await? {
            Some(_) => Ok(()),
            None => Err(GatewayError::Conflict(format!(
                "parent of {} does not exist",
                key
            ))),
        }
    }

    async fn delete(&self, key: &ResourceKey) -> crossrep_cloud::Result<()> {
        tracing::debug!("DELETE {}", key);
        let url = self.resource_url(key);
        self.send(self.client.delete(&url)).await?;
        Ok(())
    }

    async fn authorize_replication(
        &self,
        source: &VolumeKey,
        destination_id: &ResourceId,
    ) -> crossrep_cloud::Result<()> {
        let body = serde_json::to_value(AuthorizeBody {
            remote_volume_resource_id: destination_id.as_str(),
        })?;
        match self.post_action(source, "authorizeReplication", &body).await? {
            Some(_) => Ok(()),
            None => Err(GatewayError::Permanent(format!(
                "source {} not found",
                source
            ))),
        }
    }

    async fn break_replication(&self, destination: &VolumeKey) -> crossrep_cloud::Result<()> {
        let body = serde_json::json!({});
        match self
            .post_action(destination, "breakReplication", &body)
            .await?
        {
            Some(_) => Ok(()),
            None => Err(GatewayError::Conflict(format!(
                "no replication on {}",
                destination
            ))),
        }
    }

    async fn delete_replication(&self, destination: &VolumeKey) -> crossrep_cloud::Result<()> {
        let body = serde_json::json!({});
        self.post_action(destination, "deleteReplication", &body)
            .await?;
        Ok(())
    }

    async fn replication_status(
        &self,
        volume: &VolumeKey,
    ) -> crossrep_cloud::Result<Option<ReplicationStatus>> {
        let url = self.action_url(volume, "replicationStatus");
        let Some(response) = self.send(self.client.get(&url)).await? else {
            return Ok(None);
        };
        let body: ReplicationStatusResponse = response.json().await.map_err(status::transport)?;
        Ok(Some(body.into()))
    }
}
