//! Release request contract sent to the release signing gateway.
//!
//! Only the fields the pipeline populates are typed. Anything else present in the
//! embedded templates is carried through untouched in the `extra` maps, since the
//! full schema belongs to the gateway.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use service_core::error::AppError;

use super::product::ProductInfo;

const ROUTING_POLICY_TEMPLATE: &str = include_str!("../../templates/routing_policy.json");
const RELEASE_REQUEST_TEMPLATE: &str = include_str!("../../templates/release_request.json");

/// Steers the request to the right workflow inside the gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingInfo {
    pub intent: String,
    pub content_type: String,
    pub content_origin: String,
    pub product_state: String,
    pub audience: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseProperties {
    pub release_content_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInfo {
    pub title: String,
    #[serde(default)]
    pub minimum_number_of_approvers: u32,
    #[serde(default)]
    pub is_revision: bool,
    #[serde(default)]
    pub properties: ReleaseProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_principal_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerInfo {
    pub owner: UserInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproverInfo {
    pub approver: UserInfo,
    pub is_auto_approved: bool,
    pub is_mandatory: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPermissionsInfo {
    pub main_publisher: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HashType {
    Sha256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceLocationType {
    AzureBlob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileLocation {
    #[serde(rename = "type")]
    pub location_type: SourceLocationType,
    pub blob_url: String,
}

/// Location type of the file on the tenant side.
pub const LOCATION_TYPE_UNC: &str = "UNC";

/// Descriptor of the uploaded release archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseFileInfo {
    pub name: String,
    pub friendly_file_name: String,
    pub hash: String,
    pub size_in_bytes: u64,
    pub hash_type: HashType,
    pub source_location: FileLocation,
    pub tenant_file_location_type: String,
    pub tenant_file_location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRequestMessage {
    pub esrp_correlation_id: String,
    #[serde(default)]
    pub routing_info: RoutingInfo,
    #[serde(default)]
    pub product_info: ProductInfo,
    #[serde(default)]
    pub release_info: ReleaseInfo,
    #[serde(default)]
    pub owners: Vec<OwnerInfo>,
    #[serde(default)]
    pub approvers: Vec<ApproverInfo>,
    #[serde(default)]
    pub access_permissions_info: AccessPermissionsInfo,
    #[serde(default)]
    pub created_by: UserInfo,
    #[serde(default)]
    pub files: Vec<ReleaseFileInfo>,
    /// Compact signed token over the rest of the message. Unset while signing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jws_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RoutingInfo {
    /// Routing policy template embedded at build time.
    pub fn template() -> Result<Self, AppError> {
        serde_json::from_str(ROUTING_POLICY_TEMPLATE).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("Invalid routing policy template: {}", e))
        })
    }
}

impl ReleaseRequestMessage {
    /// Base release request template embedded at build time.
    pub fn template() -> Result<Self, AppError> {
        serde_json::from_str(RELEASE_REQUEST_TEMPLATE).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("Invalid release request template: {}", e))
        })
    }
}
