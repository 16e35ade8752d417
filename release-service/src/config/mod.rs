use chrono::Utc;
use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;

use crate::services::signer::expiry_ticks;

/// Connected service name rejected by the pipeline host as a placeholder.
const BAD_SERVICE_NAME: &str = "Bad";

const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const DEFAULT_TOKEN_VALIDITY_MINUTES: i64 = 60;
const DEFAULT_TOKEN_HEADER_CRITERIA: &str = "exp,x5t";
const DEFAULT_STATUS_POLLING_INTERVAL_SECS: u64 = 10;
const DEFAULT_MAX_STATUS_POLLS: u32 = 360;
const DEFAULT_BLOB_EXPIRY_HOURS: u32 = 1;

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub connected_service_name: String,
    pub gateway: GatewayConfig,
    pub release: ReleaseSettings,
    pub identity: IdentityConfig,
    pub azure: AzureConfig,
    pub token: TokenConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub endpoint_url: String,
    /// Application the gateway knows this client as.
    pub client_id: String,
    /// Tenant the gateway access token is requested from.
    pub domain_tenant_id: String,
    pub status_polling_interval_secs: u64,
    pub max_status_polls: u32,
    pub blob_expiry_hours: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseSettings {
    pub correlation_id: String,
    pub main_publisher: String,
    pub intent: String,
    pub content_type: String,
    pub content_origin: String,
    pub product_state: String,
    pub audience: String,
    pub package_location: PathBuf,
    /// Comma joined user principal names.
    pub owners: String,
    /// Comma joined user principal names.
    pub approvers: String,
}

/// Identity used to read the auth and sign certificates from the vault.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub vault_name: String,
    pub auth_certificate_name: String,
    pub sign_certificate_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzureConfig {
    pub authority_host: String,
    /// Overrides the `https://{vault}.vault.azure.net` address.
    pub vault_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub validity_minutes: i64,
    /// Comma joined header names the verifier must treat as critical.
    pub header_criteria: String,
}

impl IdentityConfig {
    pub fn vault_url(&self, azure: &AzureConfig) -> String {
        match &azure.vault_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.vault.azure.net", self.vault_name),
        }
    }
}

impl ReleaseConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;

        Self::from_lookup(common_config, |key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup and validate it.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_prod = common.is_prod();
        let get = |key: &str, default: Option<&str>| get_env(&lookup, key, default, is_prod);

        let config = ReleaseConfig {
            common,
            connected_service_name: get("RELEASE_CONNECTED_SERVICE_NAME", None)?,
            gateway: GatewayConfig {
                endpoint_url: get("GATEWAY_ENDPOINT_URL", None)?,
                client_id: get("GATEWAY_CLIENT_ID", None)?,
                domain_tenant_id: get("GATEWAY_TENANT_ID", None)?,
                status_polling_interval_secs: parse_number(
                    "GATEWAY_STATUS_POLLING_INTERVAL_SECS",
                    &get(
                        "GATEWAY_STATUS_POLLING_INTERVAL_SECS",
                        Some(&DEFAULT_STATUS_POLLING_INTERVAL_SECS.to_string()),
                    )?,
                )?,
                max_status_polls: parse_number(
                    "GATEWAY_MAX_STATUS_POLLS",
                    &get(
                        "GATEWAY_MAX_STATUS_POLLS",
                        Some(&DEFAULT_MAX_STATUS_POLLS.to_string()),
                    )?,
                )?,
                blob_expiry_hours: parse_number(
                    "GATEWAY_BLOB_EXPIRY_HOURS",
                    &get(
                        "GATEWAY_BLOB_EXPIRY_HOURS",
                        Some(&DEFAULT_BLOB_EXPIRY_HOURS.to_string()),
                    )?,
                )?,
            },
            release: ReleaseSettings {
                correlation_id: lookup("RELEASE_CORRELATION_ID")
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                main_publisher: get("RELEASE_MAIN_PUBLISHER", None)?,
                intent: get("RELEASE_INTENT", Some("PackageDistribution"))?,
                content_type: get("RELEASE_CONTENT_TYPE", Some("Maven"))?,
                content_origin: get("RELEASE_CONTENT_ORIGIN", Some("azeus"))?,
                product_state: get("RELEASE_PRODUCT_STATE", Some("new"))?,
                audience: get("RELEASE_AUDIENCE", Some("Workflow.A_S_AV_PackageManager"))?,
                package_location: PathBuf::from(get("RELEASE_PACKAGE_LOCATION", None)?),
                owners: get("RELEASE_OWNERS", None)?,
                approvers: get("RELEASE_APPROVERS", None)?,
            },
            identity: IdentityConfig {
                tenant_id: get("KV_TENANT_ID", None)?,
                client_id: get("KV_CLIENT_ID", None)?,
                client_secret: Secret::new(get("KV_CLIENT_SECRET", None)?),
                vault_name: get("KV_VAULT_NAME", None)?,
                auth_certificate_name: get("KV_AUTH_CERT_NAME", None)?,
                sign_certificate_name: get("KV_SIGN_CERT_NAME", None)?,
            },
            azure: AzureConfig {
                authority_host: get("AZURE_AUTHORITY_HOST", Some(DEFAULT_AUTHORITY_HOST))?,
                vault_url: lookup("KV_VAULT_URL"),
            },
            token: TokenConfig {
                validity_minutes: parse_number(
                    "TOKEN_VALIDITY_MINUTES",
                    &get(
                        "TOKEN_VALIDITY_MINUTES",
                        Some(&DEFAULT_TOKEN_VALIDITY_MINUTES.to_string()),
                    )?,
                )?,
                header_criteria: get("TOKEN_HEADER_CRITERIA", Some(DEFAULT_TOKEN_HEADER_CRITERIA))?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject inputs that would only fail later, after I/O has started.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.connected_service_name.trim().is_empty()
            || self.connected_service_name == BAD_SERVICE_NAME
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Bad input given for RELEASE_CONNECTED_SERVICE_NAME"
            )));
        }

        if self.release.package_location.as_os_str().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "RELEASE_PACKAGE_LOCATION must not be empty"
            )));
        }

        if self.release.content_type.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "RELEASE_CONTENT_TYPE must not be empty"
            )));
        }

        if self.token.validity_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TOKEN_VALIDITY_MINUTES must be positive"
            )));
        }

        if expiry_ticks(Utc::now(), self.token.validity_minutes).is_err() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TOKEN_VALIDITY_MINUTES is too large for a token expiry"
            )));
        }

        if self.gateway.max_status_polls == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "GATEWAY_MAX_STATUS_POLLS must be at least 1"
            )));
        }

        Ok(())
    }
}

fn get_env<F>(
    lookup: &F,
    key: &str,
    default: Option<&str>,
    is_prod: bool,
) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("{} is not a valid number: {}", key, e))
    })
}
