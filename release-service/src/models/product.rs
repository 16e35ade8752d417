use serde::{Deserialize, Serialize};

/// Name, version and description of the product being released.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl ProductInfo {
    /// `{name}-{version}.zip`
    pub fn archive_file_name(&self) -> String {
        format!("{}-{}.zip", self.name, self.version)
    }
}

/// Build system the package directory was produced by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildSystem {
    Maven,
    Other(String),
}

impl BuildSystem {
    /// Matches case-insensitively, the way the content type is routed.
    pub fn from_content_type(content_type: &str) -> Self {
        match content_type.to_lowercase().as_str() {
            "maven" => BuildSystem::Maven,
            other => BuildSystem::Other(other.to_string()),
        }
    }
}
