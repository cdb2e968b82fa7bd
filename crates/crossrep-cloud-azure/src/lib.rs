//! Azure NetApp Files gateway
//!
//! Implements [`StorageGateway`](crossrep_cloud::StorageGateway) over the
//! Azure Resource Manager REST API. Requests are authenticated with a bearer
//! token taken from `AZURE_ACCESS_TOKEN`; acquiring that token is left to
//! the caller (e.g. `az account get-access-token`).

pub mod body;
pub mod error;
pub mod provider;
pub mod status;

pub use error::{AzureError, Result};
pub use provider::{API_VERSION, ARM_ENDPOINT, AzureConfig, AzureNetAppGateway};
