use thiserror::Error;

/// Failure taxonomy shared by every stage of a release run.
///
/// Stages never retry. Each one either returns a fully valid value or one of these
/// variants, and callers log a stage label before propagating the error unchanged.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),

    #[error("No build descriptor found with extension {0}")]
    DescriptorNotFound(String),

    #[error("Build descriptor could not be parsed: {0}")]
    DescriptorParse(anyhow::Error),

    #[error("Certificate acquisition failed: {0}")]
    CertificateAcquisition(anyhow::Error),

    #[error("Packaging failed: {0}")]
    Packaging(anyhow::Error),

    #[error("Upload failed: {0}")]
    Upload(anyhow::Error),

    #[error("Signing failed: {0}")]
    Signing(anyhow::Error),

    #[error("Gateway error: {0}")]
    Gateway(String),
}

impl AppError {
    /// Human readable label of the stage that produced this error.
    pub fn stage_label(&self) -> &'static str {
        match self {
            AppError::ConfigError(_) => "Configuration creation failed",
            AppError::DescriptorNotFound(_) | AppError::DescriptorParse(_) => {
                "Product information could not be resolved"
            }
            AppError::CertificateAcquisition(_) => "Certificate information could not be populated",
            AppError::Packaging(_) => "Release archive could not be created",
            AppError::Upload(_) => "File uploading and blob SAS generation failed",
            AppError::Signing(_) => "Release request could not be signed",
            AppError::Gateway(_) => "Gateway call failed",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Packaging(anyhow::Error::new(err))
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(err: zip::result::ZipError) -> Self {
        AppError::Packaging(anyhow::Error::new(err))
    }
}

impl From<openssl::error::ErrorStack> for AppError {
    fn from(err: openssl::error::ErrorStack) -> Self {
        AppError::CertificateAcquisition(anyhow::Error::new(err))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::Signing(anyhow::Error::new(err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Signing(anyhow::Error::new(err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Gateway(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels_are_distinct_per_stage() {
        let upload = AppError::Upload(anyhow::anyhow!("connection reset"));
        let signing = AppError::Signing(anyhow::anyhow!("bad key"));

        assert_ne!(upload.stage_label(), signing.stage_label());
        assert_eq!(
            AppError::DescriptorNotFound(".xml".into()).stage_label(),
            AppError::DescriptorParse(anyhow::anyhow!("x")).stage_label()
        );
    }

    #[test]
    fn test_display_keeps_inner_message() {
        let err = AppError::ConfigError(anyhow::anyhow!("RELEASE_OWNERS is required but not set"));
        assert_eq!(
            err.to_string(),
            "Configuration error: RELEASE_OWNERS is required but not set"
        );
    }

    #[test]
    fn test_io_errors_map_to_packaging() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, AppError::Packaging(_)));
    }
}
