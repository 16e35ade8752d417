//! RS256 signing of release requests.
//!
//! The gateway expects header fields `jsonwebtoken::Header` cannot carry (`crit`, a
//! ticks based `exp`, a single string `x5c`), so the compact JWS is assembled here and
//! only the signature primitive comes from `jsonwebtoken::crypto`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{crypto, Algorithm, EncodingKey};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service_core::error::AppError;
use service_core::utils::split_list;

use crate::config::TokenConfig;
use crate::models::{CertificateMaterial, ReleaseRequestMessage};

/// Ticks (100 ns intervals since 0001-01-01) at the Unix epoch.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

const TICKS_PER_MILLISECOND: i64 = 10_000;
const MILLISECONDS_PER_MINUTE: i64 = 60_000;

/// Lifetime of the standard `exp` claim in the payload.
const TOKEN_EXPIRY_HOURS: i64 = 1;

/// Expiry of a token issued at `now`, in ticks. Fails when the result leaves `i64`.
pub fn expiry_ticks(now: DateTime<Utc>, validity_minutes: i64) -> Result<i64, AppError> {
    validity_minutes
        .checked_mul(MILLISECONDS_PER_MINUTE)
        .and_then(|validity| now.timestamp_millis().checked_add(validity))
        .and_then(|millis| millis.checked_mul(TICKS_PER_MILLISECOND))
        .and_then(|ticks| ticks.checked_add(UNIX_EPOCH_TICKS))
        .ok_or_else(|| {
            AppError::Signing(anyhow::anyhow!(
                "Token validity of {} minutes is out of range",
                validity_minutes
            ))
        })
}

/// Protected header of a signed release request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseTokenHeader {
    pub alg: String,
    pub typ: String,
    /// Thumbprint of the signing certificate, lowercase hex.
    pub x5t: String,
    /// Base64 DER of the signing certificate.
    pub x5c: String,
    pub crit: Vec<String>,
    /// Expiry in ticks.
    pub exp: i64,
}

impl ReleaseTokenHeader {
    /// Header of a compact token. The signature is not checked.
    pub fn from_token(token: &str) -> Result<Self, AppError> {
        let encoded = token
            .split('.')
            .next()
            .ok_or_else(|| AppError::Signing(anyhow::anyhow!("Token has no header")))?;

        let raw = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| {
                AppError::Signing(anyhow::anyhow!("Token header is not base64url: {}", e))
            })?;

        Ok(serde_json::from_slice(&raw)?)
    }
}

pub trait TokenSigner: Send + Sync {
    /// Compact `header.payload.signature` over `message`.
    fn sign(
        &self,
        message: &ReleaseRequestMessage,
        material: &CertificateMaterial,
    ) -> Result<String, AppError>;
}

pub struct Rs256Signer {
    validity_minutes: i64,
    criteria: Vec<String>,
}

impl Rs256Signer {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            validity_minutes: config.validity_minutes,
            criteria: split_list(&config.header_criteria),
        }
    }

    pub fn sign_at(
        &self,
        message: &ReleaseRequestMessage,
        material: &CertificateMaterial,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let header = ReleaseTokenHeader {
            alg: "RS256".to_string(),
            typ: "JWT".to_string(),
            x5t: material.thumbprint.clone(),
            x5c: material.public_certificate.clone(),
            crit: self.criteria.clone(),
            exp: expiry_ticks(now, self.validity_minutes)?,
        };

        let mut payload = serde_json::to_value(message)?;
        let claims = payload.as_object_mut().ok_or_else(|| {
            AppError::Signing(anyhow::anyhow!("Release request did not serialize to an object"))
        })?;
        claims.insert("iat".to_string(), Value::from(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            Value::from((now + Duration::hours(TOKEN_EXPIRY_HOURS)).timestamp()),
        );

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload)?)
        );

        let key = EncodingKey::from_rsa_pem(material.private_key_pem.expose_secret().as_bytes())?;
        let signature = crypto::sign(signing_input.as_bytes(), &key, Algorithm::RS256)?;

        Ok(format!("{}.{}", signing_input, signature))
    }
}

impl TokenSigner for Rs256Signer {
    fn sign(
        &self,
        message: &ReleaseRequestMessage,
        material: &CertificateMaterial,
    ) -> Result<String, AppError> {
        let token = self.sign_at(message, material, Utc::now())?;
        tracing::info!(thumbprint = %material.thumbprint, "Release request signed");
        Ok(token)
    }
}
