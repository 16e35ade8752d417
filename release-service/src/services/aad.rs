//! Azure AD client-credentials token acquisition.
//!
//! Two grants are supported: a client secret (used to read the vault) and a signed
//! client assertion built from the auth certificate (used to call the gateway).

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::CertificateMaterial;

const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";
const ASSERTION_LIFETIME_MINUTES: i64 = 10;

/// Scope for Key Vault data plane calls.
pub const KEY_VAULT_SCOPE: &str = "https://vault.azure.net/.default";

#[derive(Clone)]
pub struct AadTokenClient {
    client: Client,
    authority_host: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Claims of the client assertion presented instead of a secret.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientAssertionClaims {
    pub aud: String,
    pub iss: String,
    pub sub: String,
    pub jti: String,
    pub nbf: i64,
    pub exp: i64,
}

impl AadTokenClient {
    pub fn new(client: Client, authority_host: impl Into<String>) -> Self {
        Self {
            client,
            authority_host: authority_host.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn token_endpoint(&self, tenant_id: &str) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority_host, tenant_id)
    }

    /// Client-credentials token using a shared secret.
    pub async fn token_with_secret(
        &self,
        tenant_id: &str,
        client_id: &str,
        client_secret: &Secret<String>,
        scope: &str,
    ) -> Result<String> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret.expose_secret().as_str()),
            ("scope", scope),
        ];

        self.request_token(tenant_id, &form).await
    }

    /// Client-credentials token using an assertion signed by `certificate`.
    pub async fn token_with_certificate(
        &self,
        tenant_id: &str,
        client_id: &str,
        certificate: &CertificateMaterial,
        scope: &str,
    ) -> Result<String> {
        let assertion =
            self.client_assertion(&self.token_endpoint(tenant_id), client_id, certificate)?;

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("client_assertion", assertion.as_str()),
            ("scope", scope),
        ];

        self.request_token(tenant_id, &form).await
    }

    /// RS256 assertion whose `x5t` header identifies the certificate.
    pub fn client_assertion(
        &self,
        audience: &str,
        client_id: &str,
        certificate: &CertificateMaterial,
    ) -> Result<String> {
        let thumbprint = hex::decode(&certificate.thumbprint)
            .map_err(|e| anyhow!("Certificate thumbprint is not hex: {}", e))?;

        let mut header = Header::new(Algorithm::RS256);
        header.x5t = Some(URL_SAFE_NO_PAD.encode(thumbprint));

        let now = Utc::now();
        let claims = ClientAssertionClaims {
            aud: audience.to_string(),
            iss: client_id.to_string(),
            sub: client_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            nbf: now.timestamp(),
            exp: (now + Duration::minutes(ASSERTION_LIFETIME_MINUTES)).timestamp(),
        };

        let key = EncodingKey::from_rsa_pem(certificate.private_key_pem.expose_secret().as_bytes())
            .map_err(|e| anyhow!("Failed to parse certificate private key: {}", e))?;

        encode(&header, &claims, &key)
            .map_err(|e| anyhow!("Failed to encode client assertion: {}", e))
    }

    async fn request_token(&self, tenant_id: &str, form: &[(&str, &str)]) -> Result<String> {
        let url = self.token_endpoint(tenant_id);

        let response = self.client.post(&url).form(form).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let token: TokenResponse = serde_json::from_str(&body)?;
            tracing::debug!(
                tenant_id = %tenant_id,
                expires_in = ?token.expires_in,
                "Access token acquired"
            );
            Ok(token.access_token)
        } else {
            let error: TokenErrorResponse =
                serde_json::from_str(&body).unwrap_or_else(|_| TokenErrorResponse {
                    error: status.to_string(),
                    error_description: Some(body.clone()),
                });
            tracing::error!(
                tenant_id = %tenant_id,
                error = %error.error,
                "Access token request failed"
            );
            Err(anyhow!(
                "Token request failed: {} - {}",
                error.error,
                error.error_description.unwrap_or_default()
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_certificate;
    use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_client_assertion_header_and_claims() {
        let cert = test_certificate("assertion");
        let client = AadTokenClient::new(Client::new(), "https://login.example.test/");

        let audience = client.token_endpoint("tenant-1");
        assert_eq!(
            audience,
            "https://login.example.test/tenant-1/oauth2/v2.0/token"
        );

        let assertion = client
            .client_assertion(&audience, "client-1", &cert.material)
            .unwrap();

        let header = decode_header(&assertion).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(
            header.x5t.unwrap(),
            URL_SAFE_NO_PAD.encode(hex::decode(&cert.material.thumbprint).unwrap())
        );

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[audience.as_str()]);
        let key = DecodingKey::from_rsa_pem(cert.public_key_pem.as_bytes()).unwrap();
        let claims = decode::<ClientAssertionClaims>(&assertion, &key, &validation)
            .unwrap()
            .claims;
        assert_eq!(claims.iss, "client-1");
        assert_eq!(claims.sub, "client-1");
        assert_eq!(claims.exp - claims.nbf, 600);
    }

    #[tokio::test]
    async fn test_token_with_secret() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_secret=s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "vault-token",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = AadTokenClient::new(Client::new(), server.uri());
        let token = client
            .token_with_secret(
                "tenant-1",
                "client-1",
                &Secret::new("s3cret".to_string()),
                KEY_VAULT_SCOPE,
            )
            .await
            .unwrap();

        assert_eq!(token, "vault-token");
    }

    #[tokio::test]
    async fn test_token_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret provided."
            })))
            .mount(&server)
            .await;

        let client = AadTokenClient::new(Client::new(), server.uri());
        let err = client
            .token_with_secret(
                "tenant-1",
                "client-1",
                &Secret::new("wrong".to_string()),
                KEY_VAULT_SCOPE,
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("invalid_client"));
    }
}
