//! Certificate acquisition from the secret/certificate store.
//!
//! The private key and the public certificate come from two independent lookups:
//! the secret holds the PKCS#12 bundle, the certificate resource holds the DER
//! certificate and its thumbprint.

use async_trait::async_trait;
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD},
    Engine as _,
};
use openssl::pkcs12::Pkcs12;
use reqwest::Client;
use secrecy::Secret;
use serde::Deserialize;
use service_core::error::AppError;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::aad::{AadTokenClient, KEY_VAULT_SCOPE};
use crate::config::IdentityConfig;
use crate::models::{CertificateMaterial, SigningCredentials};

const KEY_VAULT_API_VERSION: &str = "7.4";

/// Content type of a certificate secret holding a PKCS#12 bundle.
pub const PKCS12_CONTENT_TYPE: &str = "application/x-pkcs12";

/// Secret value as returned by the store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultSecret {
    pub value: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Public half of a stored certificate.
#[derive(Debug, Clone)]
pub struct VaultCertificate {
    /// DER encoded certificate.
    pub cer: Vec<u8>,
    /// Raw x.509 SHA-1 thumbprint.
    pub thumbprint: Vec<u8>,
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn fetch_secret(
        &self,
        identity: &IdentityConfig,
        name: &str,
    ) -> Result<VaultSecret, AppError>;

    async fn fetch_certificate(
        &self,
        identity: &IdentityConfig,
        name: &str,
    ) -> Result<VaultCertificate, AppError>;
}

/// Key Vault data plane client bound to one vault and one identity.
pub struct KeyVaultClient {
    client: Client,
    aad: AadTokenClient,
    vault_url: String,
    access_token: OnceCell<String>,
}

#[derive(Debug, Deserialize)]
struct CertificateBundle {
    cer: String,
    x5t: String,
}

impl KeyVaultClient {
    pub fn new(client: Client, aad: AadTokenClient, vault_url: impl Into<String>) -> Self {
        Self {
            client,
            aad,
            vault_url: vault_url.into().trim_end_matches('/').to_string(),
            access_token: OnceCell::new(),
        }
    }

    async fn token(&self, identity: &IdentityConfig) -> Result<&String, AppError> {
        self.access_token
            .get_or_try_init(|| async {
                self.aad
                    .token_with_secret(
                        &identity.tenant_id,
                        &identity.client_id,
                        &identity.client_secret,
                        KEY_VAULT_SCOPE,
                    )
                    .await
                    .map_err(|e| {
                        AppError::CertificateAcquisition(
                            e.context("Key Vault authentication failed"),
                        )
                    })
            })
            .await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        identity: &IdentityConfig,
        resource: &str,
        name: &str,
    ) -> Result<T, AppError> {
        let token = self.token(identity).await?;
        let url = format!(
            "{}/{}/{}?api-version={}",
            self.vault_url, resource, name, KEY_VAULT_API_VERSION
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| acquisition_error(resource, name, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                resource = %resource,
                name = %name,
                status = %status,
                "Key Vault lookup failed"
            );
            return Err(AppError::CertificateAcquisition(anyhow::anyhow!(
                "Key Vault {} '{}' lookup failed: {} - {}",
                resource,
                name,
                status,
                body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| acquisition_error(resource, name, e))
    }
}

fn acquisition_error(resource: &str, name: &str, err: impl std::fmt::Display) -> AppError {
    AppError::CertificateAcquisition(anyhow::anyhow!(
        "Key Vault {} '{}' lookup failed: {}",
        resource,
        name,
        err
    ))
}

#[async_trait]
impl SecretStore for KeyVaultClient {
    async fn fetch_secret(
        &self,
        identity: &IdentityConfig,
        name: &str,
    ) -> Result<VaultSecret, AppError> {
        self.get_json(identity, "secrets", name).await
    }

    async fn fetch_certificate(
        &self,
        identity: &IdentityConfig,
        name: &str,
    ) -> Result<VaultCertificate, AppError> {
        let bundle: CertificateBundle = self.get_json(identity, "certificates", name).await?;

        Ok(VaultCertificate {
            cer: decode_base64(&bundle.cer)
                .map_err(|e| acquisition_error("certificates", name, e))?,
            thumbprint: decode_base64(&bundle.x5t)
                .map_err(|e| acquisition_error("certificates", name, e))?,
        })
    }
}

/// Key Vault mixes standard and URL-safe base64 across fields.
fn decode_base64(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD
        .decode(value)
        .or_else(|_| URL_SAFE_NO_PAD.decode(value))
        .or_else(|_| URL_SAFE.decode(value))
}

/// Extract the RSA private key from a base64 PKCS#12 bundle with an empty password.
pub fn private_key_from_pfx(pfx_base64: &str) -> Result<Secret<String>, AppError> {
    let der = decode_base64(pfx_base64.trim()).map_err(|e| {
        AppError::CertificateAcquisition(anyhow::anyhow!(
            "Certificate bundle is not base64: {}",
            e
        ))
    })?;

    let parsed = Pkcs12::from_der(&der)?.parse2("")?;
    let pkey = parsed.pkey.ok_or_else(|| {
        AppError::CertificateAcquisition(anyhow::anyhow!("Certificate bundle has no private key"))
    })?;

    let rsa = pkey.rsa().map_err(|e| {
        AppError::CertificateAcquisition(anyhow::anyhow!(
            "Certificate private key is not RSA: {}",
            e
        ))
    })?;

    let pem = String::from_utf8(rsa.private_key_to_pem()?).map_err(|e| {
        AppError::CertificateAcquisition(anyhow::anyhow!("Private key PEM is not UTF-8: {}", e))
    })?;

    Ok(Secret::new(pem))
}

/// Produces auth and sign certificate material from a [`SecretStore`].
#[derive(Clone)]
pub struct CertificateProvider {
    store: Arc<dyn SecretStore>,
}

impl CertificateProvider {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Private key from the named secret, public certificate and thumbprint from the
    /// named certificate.
    pub async fn fetch_identity_material(
        &self,
        identity: &IdentityConfig,
        certificate_name: &str,
    ) -> Result<CertificateMaterial, AppError> {
        let secret = self.store.fetch_secret(identity, certificate_name).await?;
        if let Some(content_type) = secret
            .content_type
            .as_deref()
            .filter(|t| !t.eq_ignore_ascii_case(PKCS12_CONTENT_TYPE))
        {
            return Err(AppError::CertificateAcquisition(anyhow::anyhow!(
                "Secret '{}' holds {}, expected {}",
                certificate_name,
                content_type,
                PKCS12_CONTENT_TYPE
            )));
        }
        let private_key_pem = private_key_from_pfx(&secret.value)?;

        let certificate = self.store.fetch_certificate(identity, certificate_name).await?;

        tracing::info!(certificate = %certificate_name, "Certificate material fetched");

        Ok(CertificateMaterial {
            private_key_pem,
            public_certificate: STANDARD.encode(&certificate.cer),
            thumbprint: hex::encode(&certificate.thumbprint),
        })
    }

    /// Both identities or nothing.
    pub async fn acquire(&self, identity: &IdentityConfig) -> Result<SigningCredentials, AppError> {
        let auth = self
            .fetch_identity_material(identity, &identity.auth_certificate_name)
            .await?;
        let sign = self
            .fetch_identity_material(identity, &identity.sign_certificate_name)
            .await?;

        Ok(SigningCredentials { auth, sign })
    }
}
