use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use openssl::asn1::Asn1Time;
use openssl::hash::MessageDigest;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509NameBuilder, X509};
use release_service::config::ReleaseConfig;
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CORRELATION_ID: &str = "5f0c7a52-93c4-4b43-9d4c-3c2f0d7a1e11";
pub const AUTH_CERT_NAME: &str = "release-auth";
pub const SIGN_CERT_NAME: &str = "release-sign";
pub const OPERATION_ID: &str = "op-42";

pub const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>com.example</groupId>
  <artifactId>demo</artifactId>
  <version>1.2.3</version>
</project>"#;

pub struct VaultCertificate {
    pub pfx_base64: String,
    pub cer_base64: String,
    pub thumbprint: Vec<u8>,
    pub public_key_pem: String,
}

impl VaultCertificate {
    pub fn generate(common_name: &str) -> Self {
        let pkey: PKey<Private> = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", common_name).unwrap();
        let name = name.build();

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&pkey).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(7).unwrap())
            .unwrap();
        builder.sign(&pkey, MessageDigest::sha256()).unwrap();
        let cert = builder.build();

        let pfx = Pkcs12::builder()
            .name(common_name)
            .pkey(&pkey)
            .cert(&cert)
            .build2("")
            .unwrap();

        Self {
            pfx_base64: STANDARD.encode(pfx.to_der().unwrap()),
            cer_base64: STANDARD.encode(cert.to_der().unwrap()),
            thumbprint: cert.digest(MessageDigest::sha1()).unwrap().to_vec(),
            public_key_pem: String::from_utf8(pkey.public_key_to_pem().unwrap()).unwrap(),
        }
    }

    pub fn thumbprint_hex(&self) -> String {
        hex::encode(&self.thumbprint)
    }
}

/// Fake vault, identity provider, blob storage and gateway behind one mock server,
/// plus a Maven package directory.
pub struct TestRelease {
    pub server: MockServer,
    pub package_dir: TempDir,
    pub auth: VaultCertificate,
    pub sign: VaultCertificate,
}

impl TestRelease {
    pub async fn spawn() -> Self {
        let server = MockServer::start().await;

        let package_dir = TempDir::new().unwrap();
        fs::write(package_dir.path().join("pom.xml"), POM).unwrap();
        fs::write(package_dir.path().join("demo-1.2.3.jar"), vec![7u8; 2048]).unwrap();
        fs::create_dir(package_dir.path().join("lib")).unwrap();
        fs::write(package_dir.path().join("lib/dep.jar"), b"dependency").unwrap();

        Self {
            server,
            package_dir,
            auth: VaultCertificate::generate("auth"),
            sign: VaultCertificate::generate("sign"),
        }
    }

    pub fn vars(&self) -> HashMap<String, String> {
        let uri = self.server.uri();
        let package_location = self.package_dir.path().to_string_lossy().into_owned();

        [
            ("RELEASE_CONNECTED_SERVICE_NAME", "release-connection"),
            ("GATEWAY_ENDPOINT_URL", uri.as_str()),
            ("GATEWAY_CLIENT_ID", "gateway-client"),
            ("GATEWAY_TENANT_ID", "gateway-tenant"),
            ("GATEWAY_STATUS_POLLING_INTERVAL_SECS", "0"),
            ("GATEWAY_MAX_STATUS_POLLS", "5"),
            ("RELEASE_CORRELATION_ID", CORRELATION_ID),
            ("RELEASE_MAIN_PUBLISHER", "ESRPRELPACMAN"),
            ("RELEASE_CONTENT_TYPE", "Maven"),
            ("RELEASE_PACKAGE_LOCATION", package_location.as_str()),
            ("RELEASE_OWNERS", "a@x.com,b@x.com"),
            ("RELEASE_APPROVERS", "c@x.com"),
            ("KV_TENANT_ID", "kv-tenant"),
            ("KV_CLIENT_ID", "kv-client"),
            ("KV_CLIENT_SECRET", "kv-secret"),
            ("KV_VAULT_NAME", "releasevault"),
            ("KV_VAULT_URL", uri.as_str()),
            ("KV_AUTH_CERT_NAME", AUTH_CERT_NAME),
            ("KV_SIGN_CERT_NAME", SIGN_CERT_NAME),
            ("AZURE_AUTHORITY_HOST", uri.as_str()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    pub fn config(&self) -> ReleaseConfig {
        let vars = self.vars();
        ReleaseConfig::from_lookup(service_core::config::Config::default(), |key| {
            vars.get(key).cloned()
        })
        .expect("Failed to build test configuration")
    }

    pub async fn mount_identity(&self) {
        Mock::given(method("POST"))
            .and(path_regex(r"^/[a-z-]+/oauth2/v2\.0/token$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "test-access-token",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_vault(&self) {
        for (name, cert) in [(AUTH_CERT_NAME, &self.auth), (SIGN_CERT_NAME, &self.sign)] {
            Mock::given(method("GET"))
                .and(path(format!("/secrets/{}", name)))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "value": cert.pfx_base64,
                    "contentType": "application/x-pkcs12"
                })))
                .mount(&self.server)
                .await;

            Mock::given(method("GET"))
                .and(path(format!("/certificates/{}", name)))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "cer": cert.cer_base64,
                    "x5t": URL_SAFE_NO_PAD.encode(&cert.thumbprint)
                })))
                .mount(&self.server)
                .await;
        }
    }

    pub async fn mount_gateway(&self) {
        Mock::given(method("POST"))
            .and(path("/api/v2/release/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "containerSasUrl": format!(
                    "{}/release-container?sv=2021-08-06&sig=c2ln",
                    self.server.uri()
                )
            })))
            .mount(&self.server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/release-container/demo-1.2.3.zip"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/v2/release/submit"))
            .respond_with(
                ResponseTemplate::new(202)
                    .set_body_json(serde_json::json!({ "operationId": OPERATION_ID })),
            )
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/api/v2/release/{}/status", OPERATION_ID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "operationId": OPERATION_ID,
                "status": "pass"
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn requests_to(
        &self,
        method_name: &str,
        request_path: &str,
    ) -> Vec<wiremock::Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.to_string() == method_name && r.url.path() == request_path)
            .collect()
    }
}
