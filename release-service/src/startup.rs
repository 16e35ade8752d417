//! Release run wiring and lifecycle.
//!
//! A run is strictly sequential: certificates, upload session, product info,
//! archive, upload, signed request, submission, status polling. Each stage either
//! hands a complete value to the next one or stops the run.

use reqwest::Client;
use service_core::error::AppError;
use service_core::utils::sha256_base64;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ReleaseConfig;
use crate::models::{BuildSystem, ProductInfo, ReleaseDetails, SigningCredentials};
use crate::services::gateway::session_request;
use crate::services::{
    message_builder, packager, product_info, wait_for_completion, AadTokenClient,
    BlobUploader, CertificateProvider, GatewayClient, HttpBlobUploader, HttpGatewayClient,
    KeyVaultClient, Rs256Signer, TokenSigner, UploadedFile,
};

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct ReleaseOutcome {
    pub product: ProductInfo,
    pub archive_path: PathBuf,
    pub operation_id: String,
    pub details: ReleaseDetails,
}

pub struct ReleaseTask {
    config: ReleaseConfig,
    http: Client,
    aad: AadTokenClient,
    certificates: CertificateProvider,
    uploader: Arc<dyn BlobUploader>,
    signer: Arc<dyn TokenSigner>,
}

/// Log `message` for a failed stage and hand the error back unchanged.
fn stage_failed(message: &'static str) -> impl FnOnce(AppError) -> AppError {
    move |err| {
        tracing::error!(error = %err, "{}", message);
        err
    }
}

impl ReleaseTask {
    /// Wire the concrete vault, blob storage and signer from `config`.
    pub fn build(config: ReleaseConfig) -> Self {
        let http = Client::new();
        let aad = AadTokenClient::new(http.clone(), config.azure.authority_host.clone());

        let vault = KeyVaultClient::new(
            http.clone(),
            aad.clone(),
            config.identity.vault_url(&config.azure),
        );

        let signer = Rs256Signer::new(&config.token);

        Self {
            http: http.clone(),
            aad,
            certificates: CertificateProvider::new(Arc::new(vault)),
            uploader: Arc::new(HttpBlobUploader::new(http)),
            signer: Arc::new(signer),
            config,
        }
    }

    /// Acquire both certificates, then drive the release through the gateway.
    pub async fn run(&self) -> Result<ReleaseOutcome, AppError> {
        tracing::info!(
            correlation_id = %self.config.release.correlation_id,
            service = %self.config.connected_service_name,
            "Release run started"
        );

        let credentials = self
            .certificates
            .acquire(&self.config.identity)
            .await
            .map_err(stage_failed("Certificate information could not be populated"))?;
        tracing::info!("Certificate information populated");

        let gateway = HttpGatewayClient::new(
            self.http.clone(),
            self.aad.clone(),
            self.config.gateway.clone(),
            credentials.auth.clone(),
            self.config.release.correlation_id.clone(),
        );

        self.run_with(&credentials, &gateway).await
    }

    /// Everything after certificate acquisition, against any gateway implementation.
    pub async fn run_with(
        &self,
        credentials: &SigningCredentials,
        gateway: &dyn GatewayClient,
    ) -> Result<ReleaseOutcome, AppError> {
        let release = &self.config.release;

        let container_url = gateway
            .create_session(&session_request(self.config.gateway.blob_expiry_hours))
            .await
            .map_err(stage_failed("Upload session could not be created"))?;

        let build_system = BuildSystem::from_content_type(&release.content_type);
        let product = product_info::resolve(&build_system, &release.package_location)
            .await
            .map_err(stage_failed("Product information could not be resolved"))?;
        tracing::info!(
            name = %product.name,
            version = %product.version,
            "Product information resolved"
        );

        let archive = packager::package(&release.package_location, &product)
            .await
            .map_err(stage_failed("Release archive could not be created"))?;

        // Hash and size come from the same bytes that are uploaded.
        let content = tokio::fs::read(&archive.path)
            .await
            .map_err(AppError::from)
            .map_err(stage_failed("Release archive could not be read"))?;
        let hash = sha256_base64(&content);
        let size_in_bytes = content.len() as u64;

        let read_url = self
            .uploader
            .upload(&container_url, &archive.file_name, content)
            .await
            .map_err(stage_failed("File uploading and blob SAS generation failed"))?;

        let uploaded = UploadedFile {
            file_name: archive.file_name.clone(),
            hash,
            size_in_bytes,
            read_url: read_url.to_string(),
        };

        let message = message_builder::build(
            &self.config,
            &product,
            &uploaded,
            &credentials.sign,
            self.signer.as_ref(),
        )
        .map_err(stage_failed("Release request message could not be created"))?;

        let operation_id = gateway
            .submit_release(&message)
            .await
            .map_err(stage_failed("Release request submission failed"))?;

        let details = wait_for_completion(
            gateway,
            &operation_id,
            Duration::from_secs(self.config.gateway.status_polling_interval_secs),
            self.config.gateway.max_status_polls,
        )
        .await
        .map_err(stage_failed("Release did not complete"))?;

        tracing::info!(operation_id = %operation_id, "Release completed");

        Ok(ReleaseOutcome {
            product,
            archive_path: archive.path,
            operation_id,
            details,
        })
    }
}
