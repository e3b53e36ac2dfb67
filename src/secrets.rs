//! # Secret Resolution
//!
//! The downstream subscription key can be indirected through a secret store by
//! reference URL. Resolution happens once, asynchronously, before the dispatch loop
//! starts; a credential that cannot be resolved within the configured attempts is a
//! fatal startup error.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::{DispatcherError, DispatcherResult};

/// Source of secret values addressed by reference
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, reference: &str) -> DispatcherResult<String>;
}

#[derive(Debug, Deserialize)]
struct SecretBundle {
    value: String,
}

/// Secret store reached over HTTP.
///
/// `GET <reference>` with an optional bearer token; the body is a JSON bundle with
/// a `value` string.
pub struct HttpSecretStore {
    client: Client,
    bearer_token: Option<String>,
}

impl std::fmt::Debug for HttpSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSecretStore")
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "[MASKED]"))
            .finish()
    }
}

impl HttpSecretStore {
    pub fn new(bearer_token: Option<String>, timeout: Duration) -> DispatcherResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatcherError::configuration(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            bearer_token,
        })
    }
}

#[async_trait]
impl SecretStore for HttpSecretStore {
    async fn get_secret(&self, reference: &str) -> DispatcherResult<String> {
        let mut request = self.client.get(reference);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DispatcherError::engine_status(
                "get_secret",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown status"),
            ));
        }

        let bundle: SecretBundle = response.json().await?;
        Ok(bundle.value)
    }
}

/// Fetch `reference` from `store`, trying at most `attempts` times with `delay` in between
pub async fn resolve_credential(
    store: &dyn SecretStore,
    reference: &str,
    attempts: u32,
    delay: Duration,
) -> DispatcherResult<String> {
    let attempts = attempts.max(1);

    for attempt in 1..=attempts {
        match store.get_secret(reference).await {
            Ok(value) => {
                info!(attempt = attempt, "Resolved credential from secret store");
                return Ok(value);
            }
            Err(e) => {
                warn!(
                    attempt = attempt,
                    max_attempts = attempts,
                    error = %e,
                    "Error while retrieving credential from secret store"
                );
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    error!(max_attempts = attempts, "Unable to retrieve credential from secret store");
    Err(DispatcherError::SecretUnavailable {
        reference: reference.to_string(),
        attempts,
    })
}
