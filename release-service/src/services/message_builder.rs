//! Assembly of the release request payload.
//!
//! The embedded templates are overlaid with configuration, product and file data,
//! then the message is signed and the token attached. Once `jws_token` is set the
//! message is not modified again.

use service_core::error::AppError;
use service_core::utils::split_list;

use super::signer::TokenSigner;
use crate::config::{ReleaseConfig, ReleaseSettings};
use crate::models::{
    ApproverInfo, CertificateMaterial, FileLocation, HashType, OwnerInfo, ProductInfo,
    ReleaseFileInfo, ReleaseRequestMessage, RoutingInfo, SourceLocationType, UserInfo,
    LOCATION_TYPE_UNC,
};

/// The archive as it was uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    /// Base64 SHA-256 of the uploaded bytes.
    pub hash: String,
    pub size_in_bytes: u64,
    /// Time-boxed read URL of the blob.
    pub read_url: String,
}

pub fn file_info(
    release: &ReleaseSettings,
    product: &ProductInfo,
    file: &UploadedFile,
) -> ReleaseFileInfo {
    ReleaseFileInfo {
        name: product.name.clone(),
        friendly_file_name: file.file_name.clone(),
        hash: file.hash.clone(),
        size_in_bytes: file.size_in_bytes,
        hash_type: HashType::Sha256,
        source_location: FileLocation {
            location_type: SourceLocationType::AzureBlob,
            blob_url: file.read_url.clone(),
        },
        tenant_file_location_type: LOCATION_TYPE_UNC.to_string(),
        tenant_file_location: release.package_location.to_string_lossy().into_owned(),
    }
}

/// Unsigned release request.
pub fn compose(
    release: &ReleaseSettings,
    product: &ProductInfo,
    file: &UploadedFile,
) -> Result<ReleaseRequestMessage, AppError> {
    let mut message = ReleaseRequestMessage::template()?;
    let content_type = release.content_type.to_lowercase();

    message.esrp_correlation_id = release.correlation_id.clone();
    message.routing_info = RoutingInfo {
        intent: release.intent.to_lowercase(),
        content_type: content_type.clone(),
        content_origin: release.content_origin.to_lowercase(),
        product_state: release.product_state.to_lowercase(),
        audience: release.audience.to_lowercase(),
        ..RoutingInfo::template()?
    };

    message.product_info = product.clone();
    message.release_info.title = product.name.clone();
    message.release_info.properties.release_content_type = content_type;

    message.owners = split_list(&release.owners)
        .into_iter()
        .map(|upn| OwnerInfo {
            owner: UserInfo {
                user_principal_name: upn,
            },
        })
        .collect();

    message.approvers = split_list(&release.approvers)
        .into_iter()
        .map(|upn| ApproverInfo {
            approver: UserInfo {
                user_principal_name: upn,
            },
            is_auto_approved: false,
            is_mandatory: true,
        })
        .collect();

    message.access_permissions_info.main_publisher = release.main_publisher.clone();

    // Splitting always yields at least one owner.
    if let Some(first) = message.owners.first() {
        message.created_by = first.owner.clone();
    }

    message.files = vec![file_info(release, product, file)];
    message.jws_token = None;

    Ok(message)
}

/// Signed release request, ready for submission.
pub fn build(
    config: &ReleaseConfig,
    product: &ProductInfo,
    file: &UploadedFile,
    sign_material: &CertificateMaterial,
    signer: &dyn TokenSigner,
) -> Result<ReleaseRequestMessage, AppError> {
    let mut message = compose(&config.release, product, file)?;

    let token = signer.sign(&message, sign_material)?;
    message.jws_token = Some(token);

    tracing::info!(
        correlation_id = %message.esrp_correlation_id,
        owners = message.owners.len(),
        approvers = message.approvers.len(),
        "Release request message created"
    );

    Ok(message)
}
