//! Throwaway key material for unit tests.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use openssl::asn1::Asn1Time;
use openssl::hash::MessageDigest;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509NameBuilder, X509};
use secrecy::Secret;

use crate::models::CertificateMaterial;

pub struct TestCertificate {
    pub material: CertificateMaterial,
    /// SPKI PEM of the public key.
    pub public_key_pem: String,
    /// Base64 PKCS#12 bundle with an empty password, as a vault secret holds it.
    pub pfx_base64: String,
    /// Raw SHA-1 thumbprint.
    pub thumbprint_bytes: Vec<u8>,
}

pub fn test_certificate(common_name: &str) -> TestCertificate {
    let rsa = Rsa::generate(2048).unwrap();
    let pkey: PKey<Private> = PKey::from_rsa(rsa).unwrap();
    let cert = self_signed(&pkey, common_name);

    let pfx = Pkcs12::builder()
        .name(common_name)
        .pkey(&pkey)
        .cert(&cert)
        .build2("")
        .unwrap();

    let thumbprint_bytes = cert.digest(MessageDigest::sha1()).unwrap().to_vec();
    let private_key_pem =
        String::from_utf8(pkey.rsa().unwrap().private_key_to_pem().unwrap()).unwrap();

    TestCertificate {
        material: CertificateMaterial {
            private_key_pem: Secret::new(private_key_pem),
            public_certificate: STANDARD.encode(cert.to_der().unwrap()),
            thumbprint: hex::encode(&thumbprint_bytes),
        },
        public_key_pem: String::from_utf8(pkey.public_key_to_pem().unwrap()).unwrap(),
        pfx_base64: STANDARD.encode(pfx.to_der().unwrap()),
        thumbprint_bytes,
    }
}

fn self_signed(pkey: &PKey<Private>, common_name: &str) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", common_name).unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(pkey).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(30).unwrap())
        .unwrap();
    builder.sign(pkey, MessageDigest::sha256()).unwrap();
    builder.build()
}
