use serde::{Deserialize, Serialize};

/// Request for a storage session the release archive is uploaded into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    /// Validity of the container, `HH:MM:SS`.
    pub expires_after: String,
    pub partition_count: u32,
    pub is_provision_storage: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Container level SAS URL with write permission.
    pub container_sas_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    pub operation_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReleaseStatus {
    Pending,
    InProgress,
    Pass,
    Fail,
    Aborted,
    #[serde(other)]
    Unknown,
}

impl ReleaseStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReleaseStatus::Pass | ReleaseStatus::Fail | ReleaseStatus::Aborted
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDetails {
    pub operation_id: String,
    pub status: ReleaseStatus,
    #[serde(default)]
    pub status_message: Option<String>,
}
