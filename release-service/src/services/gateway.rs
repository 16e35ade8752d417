//! Release signing gateway client.
//!
//! Calls are authenticated with an AAD token obtained through the auth certificate
//! and carry the run's correlation id.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use service_core::observability::{extract_correlation_id, inject_correlation_headers};
use std::time::Duration;
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::aad::AadTokenClient;
use crate::config::GatewayConfig;
use crate::models::{
    CertificateMaterial, OperationResponse, ReleaseDetails, ReleaseRequestMessage, ReleaseStatus,
    SessionRequest, SessionResponse,
};

const SESSION_PATH: &str = "api/v2/release/session";
const SUBMIT_PATH: &str = "api/v2/release/submit";
const RELEASE_PATH: &str = "api/v2/release";

#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Container SAS URL the release archive is uploaded into.
    async fn create_session(&self, request: &SessionRequest) -> Result<Url, AppError>;

    /// Operation id of the accepted release.
    async fn submit_release(&self, message: &ReleaseRequestMessage) -> Result<String, AppError>;

    async fn release_status(&self, operation_id: &str) -> Result<ReleaseDetails, AppError>;
}

/// Time span for a whole number of hours: `hh:00:00`, or `d.hh:00:00` from a day up.
pub fn expires_after(hours: u32) -> String {
    let (days, hours) = (hours / 24, hours % 24);
    if days == 0 {
        format!("{:02}:00:00", hours)
    } else {
        format!("{}.{:02}:00:00", days, hours)
    }
}

pub fn session_request(blob_expiry_hours: u32) -> SessionRequest {
    SessionRequest {
        expires_after: expires_after(blob_expiry_hours),
        partition_count: 1,
        is_provision_storage: true,
    }
}

pub struct HttpGatewayClient {
    client: Client,
    aad: AadTokenClient,
    config: GatewayConfig,
    auth: CertificateMaterial,
    correlation_id: String,
    access_token: OnceCell<String>,
}

impl HttpGatewayClient {
    pub fn new(
        client: Client,
        aad: AadTokenClient,
        config: GatewayConfig,
        auth: CertificateMaterial,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            aad,
            config,
            auth,
            correlation_id: correlation_id.into(),
            access_token: OnceCell::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.endpoint_url.trim_end_matches('/'), path)
    }

    fn scope(&self) -> String {
        format!("{}/.default", self.config.endpoint_url.trim_end_matches('/'))
    }

    async fn token(&self) -> Result<&String, AppError> {
        self.access_token
            .get_or_try_init(|| async {
                self.aad
                    .token_with_certificate(
                        &self.config.domain_tenant_id,
                        &self.config.client_id,
                        &self.auth,
                        &self.scope(),
                    )
                    .await
                    .map_err(|e| AppError::Gateway(format!("Gateway authentication failed: {}", e)))
            })
            .await
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        inject_correlation_headers(
            &mut headers,
            &self.correlation_id,
            &Uuid::new_v4().to_string(),
        );
        headers
    }

    async fn read<T: DeserializeOwned>(
        &self,
        operation: &str,
        response: Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        let echoed_correlation_id = extract_correlation_id(response.headers());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                operation = %operation,
                status = %status,
                correlation_id = %self.correlation_id,
                gateway_correlation_id = ?echoed_correlation_id,
                "Gateway call failed"
            );
            return Err(AppError::Gateway(format!(
                "{}--{}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
                body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Invalid {} response: {}", operation, e)))
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn create_session(&self, request: &SessionRequest) -> Result<Url, AppError> {
        let token = self.token().await?;

        let response = self
            .client
            .post(self.endpoint(SESSION_PATH))
            .bearer_auth(token)
            .headers(self.headers())
            .json(request)
            .send()
            .await?;

        let session: SessionResponse = self.read("session", response).await?;
        let url = Url::parse(&session.container_sas_url)
            .map_err(|e| AppError::Gateway(format!("Invalid container SAS URL: {}", e)))?;

        tracing::info!(expires_after = %request.expires_after, "Upload session created");
        Ok(url)
    }

    async fn submit_release(&self, message: &ReleaseRequestMessage) -> Result<String, AppError> {
        let token = self.token().await?;

        let response = self
            .client
            .post(self.endpoint(SUBMIT_PATH))
            .bearer_auth(token)
            .headers(self.headers())
            .json(message)
            .send()
            .await?;

        let operation: OperationResponse = self.read("submit", response).await?;

        tracing::info!(operation_id = %operation.operation_id, "Release submitted");
        Ok(operation.operation_id)
    }

    async fn release_status(&self, operation_id: &str) -> Result<ReleaseDetails, AppError> {
        let token = self.token().await?;

        let response = self
            .client
            .get(self.endpoint(&format!("{}/{}/status", RELEASE_PATH, operation_id)))
            .bearer_auth(token)
            .headers(self.headers())
            .send()
            .await?;

        self.read("status", response).await
    }
}

/// Poll at a fixed interval until the release reaches a terminal status.
///
/// `Pass` is the only successful outcome. `Fail`, `Aborted` and running out of polls
/// are gateway errors.
pub async fn wait_for_completion(
    gateway: &dyn GatewayClient,
    operation_id: &str,
    interval: Duration,
    max_polls: u32,
) -> Result<ReleaseDetails, AppError> {
    for attempt in 1..=max_polls {
        let details = gateway.release_status(operation_id).await?;

        tracing::info!(
            operation_id = %operation_id,
            attempt,
            status = ?details.status,
            "Release status polled"
        );

        match details.status {
            ReleaseStatus::Pass => return Ok(details),
            ReleaseStatus::Fail | ReleaseStatus::Aborted => {
                return Err(AppError::Gateway(format!(
                    "Release {} finished with status {:?}: {}",
                    operation_id,
                    details.status,
                    details.status_message.unwrap_or_default()
                )));
            }
            _ => {}
        }

        if attempt < max_polls {
            tokio::time::sleep(interval).await;
        }
    }

    Err(AppError::Gateway(format!(
        "Release {} did not complete after {} status polls",
        operation_id, max_polls
    )))
}
