//! Bearer tokens for the Dataflow API

use crate::error::DataflowError;
use crate::Result;
use async_trait::async_trait;
use gcp_auth::TokenProvider;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Supplies the bearer token for each Dataflow request
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String>;

    /// Called after the API rejected the last token
    fn invalidate(&self) {}
}

/// A fixed token, e.g. one handed over by the deployment
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Application Default Credentials: service account key file, gcloud user
/// credentials or the metadata server, whichever is found first.
///
/// The provider is discovered on first use and caches tokens until shortly
/// before they expire.
#[derive(Default)]
pub struct GcpTokenSource {
    provider: OnceCell<Arc<dyn TokenProvider>>,
}

impl GcpTokenSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenSource for GcpTokenSource {
    async fn token(&self) -> Result<String> {
        let provider = self
            .provider
            .get_or_try_init(|| async {
                let provider = gcp_auth::provider()
                    .await
                    .map_err(|e| DataflowError::Auth(e.to_string()))?;
                info!("Using Application Default Credentials for Dataflow");
                Ok::<_, DataflowError>(provider)
            })
            .await?;

        let token = provider
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| DataflowError::Auth(e.to_string()))?;

        Ok(token.as_str().to_string())
    }
}
