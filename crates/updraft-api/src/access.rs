//! Post-visibility collaborator.
//!
//! Secure uploads can be tied to a post via `access_control_post_id`; whether
//! the requester may see that post is the forum's call, not ours. The policy
//! trait keeps that decision behind a seam: deployments wire the HTTP
//! implementation at an `ACCESS_POLICY_URL`, and everything else (including a
//! forum that has not wired one) gets the permissive default.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use updraft_core::{AppError, Config, Requester};

#[async_trait]
pub trait AccessPolicy: Send + Sync {
    /// Whether the requester is allowed to see the given post.
    async fn can_see_post(&self, requester: &Requester, post_id: i64) -> Result<bool, AppError>;
}

/// Default policy: every post is visible. Used when no external policy
/// endpoint is configured.
pub struct PermissiveAccessPolicy;

#[async_trait]
impl AccessPolicy for PermissiveAccessPolicy {
    async fn can_see_post(&self, _requester: &Requester, _post_id: i64) -> Result<bool, AppError> {
        Ok(true)
    }
}

#[derive(Debug, Serialize)]
struct AccessCheckRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<i64>,
    post_id: i64,
}

#[derive(Debug, Deserialize)]
struct AccessCheckResponse {
    allowed: bool,
}

/// Policy that asks the forum over HTTP whether a post is visible.
pub struct HttpAccessPolicy {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpAccessPolicy {
    pub fn new(endpoint: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl AccessPolicy for HttpAccessPolicy {
    async fn can_see_post(&self, requester: &Requester, post_id: i64) -> Result<bool, AppError> {
        let request = AccessCheckRequest {
            user_id: requester.user_id(),
            post_id,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        // An unreachable or failing policy endpoint denies access rather than
        // leaking a secure upload.
        match response {
            Ok(response) => {
                let body: AccessCheckResponse = response.json().await.map_err(|e| {
                    AppError::Internal(format!("Invalid access policy response: {}", e))
                })?;
                Ok(body.allowed)
            }
            Err(e) => {
                tracing::warn!(error = %e, post_id, "Access policy check failed, denying");
                Ok(false)
            }
        }
    }
}

/// Select the access policy for the configured deployment.
pub fn create_access_policy(config: &Config) -> Result<Arc<dyn AccessPolicy>, AppError> {
    match &config.access_policy_url {
        Some(endpoint) => {
            tracing::info!(endpoint = %endpoint, "Using HTTP access policy");
            Ok(Arc::new(HttpAccessPolicy::new(endpoint.clone())?))
        }
        None => Ok(Arc::new(PermissiveAccessPolicy)),
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Fixed-answer policy for exercising the retrieval gate in tests.
    pub struct StaticAccessPolicy(pub bool);

    #[async_trait]
    impl AccessPolicy for StaticAccessPolicy {
        async fn can_see_post(
            &self,
            _requester: &Requester,
            _post_id: i64,
        ) -> Result<bool, AppError> {
            Ok(self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn permissive_policy_allows_everything() {
        let policy = PermissiveAccessPolicy;
        assert!(policy
            .can_see_post(&Requester::Anonymous, 123)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn unreachable_endpoint_denies() {
        // Reserved TEST-NET-1 address, nothing listens there.
        let policy = HttpAccessPolicy::new("http://192.0.2.1:9/check".to_string()).unwrap();
        let allowed = policy
            .can_see_post(&Requester::Anonymous, 1)
            .await
            .unwrap();
        assert!(!allowed);
    }
}
