use secrecy::Secret;

/// Key material of one vault identity.
#[derive(Debug, Clone)]
pub struct CertificateMaterial {
    /// PKCS#1 PEM of the RSA private key.
    pub private_key_pem: Secret<String>,
    /// DER public certificate, standard base64.
    pub public_certificate: String,
    /// x.509 SHA-1 thumbprint, lowercase hex.
    pub thumbprint: String,
}

/// Material for both identities, acquired together or not at all.
#[derive(Debug, Clone)]
pub struct SigningCredentials {
    /// Authenticates calls to the gateway.
    pub auth: CertificateMaterial,
    /// Signs the release request.
    pub sign: CertificateMaterial,
}
