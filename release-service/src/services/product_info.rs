//! Product name, version and description from the build descriptor.

use serde::Deserialize;
use service_core::error::AppError;
use std::path::{Path, PathBuf};

use crate::models::{BuildSystem, ProductInfo};

pub const POM_FILE_EXTENSION: &str = "xml";

pub const DEFAULT_PRODUCT_NAME: &str = "release-package";
pub const DEFAULT_PRODUCT_VERSION: &str = "1.0.0";
pub const DEFAULT_PRODUCT_DESCRIPTION: &str = "Release package";

/// The part of a Maven `pom.xml` the release needs. Everything else is ignored.
#[derive(Debug, Deserialize)]
struct PomProject {
    #[serde(rename = "artifactId")]
    artifact_id: Option<String>,
    version: Option<String>,
    description: Option<String>,
}

/// Fixed triple used for build systems without a descriptor reader.
pub fn default_product_info() -> ProductInfo {
    ProductInfo {
        name: DEFAULT_PRODUCT_NAME.to_string(),
        version: DEFAULT_PRODUCT_VERSION.to_string(),
        description: DEFAULT_PRODUCT_DESCRIPTION.to_string(),
    }
}

pub async fn resolve(
    build_system: &BuildSystem,
    package_directory: &Path,
) -> Result<ProductInfo, AppError> {
    match build_system {
        BuildSystem::Maven => resolve_maven(package_directory).await,
        BuildSystem::Other(kind) => {
            tracing::info!(
                build_system = %kind,
                "No descriptor reader for build system, using defaults"
            );
            Ok(default_product_info())
        }
    }
}

async fn resolve_maven(package_directory: &Path) -> Result<ProductInfo, AppError> {
    let descriptor = find_descriptor(package_directory).await?;
    tracing::info!(descriptor = %descriptor.display(), "Build descriptor found");

    let raw = tokio::fs::read_to_string(&descriptor).await.map_err(|e| {
        AppError::DescriptorParse(
            anyhow::Error::new(e).context(format!("Failed to read {}", descriptor.display())),
        )
    })?;

    parse_pom(&raw)
}

/// First file, by name, carrying the descriptor extension. Symlinked descriptors count.
async fn find_descriptor(package_directory: &Path) -> Result<PathBuf, AppError> {
    let unreadable = |e: std::io::Error| {
        AppError::DescriptorParse(anyhow::Error::new(e).context(format!(
            "Failed to read package directory {}",
            package_directory.display()
        )))
    };

    let mut reader = tokio::fs::read_dir(package_directory)
        .await
        .map_err(unreadable)?;

    let mut candidates = Vec::new();
    while let Some(entry) = reader.next_entry().await.map_err(unreadable)? {
        let path = entry.path();
        let is_descriptor = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(POM_FILE_EXTENSION));

        if is_descriptor
            && tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false)
        {
            candidates.push(path);
        }
    }

    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| AppError::DescriptorNotFound(format!(".{}", POM_FILE_EXTENSION)))
}

fn parse_pom(raw: &str) -> Result<ProductInfo, AppError> {
    let project: PomProject = quick_xml::de::from_str(raw)
        .map_err(|e| AppError::DescriptorParse(anyhow::anyhow!("Invalid pom: {}", e)))?;

    let name = required(project.artifact_id, "artifactId")?;
    let version = required(project.version, "version")?;

    let description = match project.description.map(|d| d.trim().to_string()) {
        Some(description) if !description.is_empty() => description,
        _ => {
            tracing::warn!(
                product = %name,
                "Descriptor has no description, using the product name"
            );
            name.clone()
        }
    };

    Ok(ProductInfo {
        name,
        version,
        description,
    })
}

fn required(value: Option<String>, element: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            AppError::DescriptorParse(anyhow::anyhow!("Descriptor has no <{}>", element))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>com.example</groupId>
  <artifactId>demo</artifactId>
  <version>1.2.3</version>
  <description>Demo library</description>
  <dependencies>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
      <version>4.13.2</version>
    </dependency>
  </dependencies>
</project>"#;

    #[tokio::test]
    async fn test_resolve_maven_descriptor() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("pom.xml"), POM).unwrap();

        let product = resolve(&BuildSystem::Maven, dir.path()).await.unwrap();

        assert_eq!(
            product,
            ProductInfo {
                name: "demo".into(),
                version: "1.2.3".into(),
                description: "Demo library".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_description_falls_back_to_name() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("pom.xml"),
            "<project><artifactId>demo</artifactId><version>1.2.3</version></project>",
        )
        .unwrap();

        let product = resolve(&BuildSystem::Maven, dir.path()).await.unwrap();
        assert_eq!(product.description, "demo");
    }

    #[tokio::test]
    async fn test_first_descriptor_by_name_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("b.xml"),
            "<project><artifactId>second</artifactId><version>2</version></project>",
        )
        .unwrap();
        fs::write(
            dir.path().join("a.xml"),
            "<project><artifactId>first</artifactId><version>1</version></project>",
        )
        .unwrap();
        fs::write(dir.path().join("readme.txt"), "not a descriptor").unwrap();

        let product = resolve(&BuildSystem::Maven, dir.path()).await.unwrap();
        assert_eq!(product.name, "first");
    }

    #[tokio::test]
    async fn test_no_descriptor_is_not_found() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("demo.jar"), "jar").unwrap();

        let err = resolve(&BuildSystem::Maven, dir.path()).await.unwrap_err();
        assert!(matches!(err, AppError::DescriptorNotFound(ext) if ext == ".xml"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_descriptor_is_found() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");
        let package = dir.path().join("package");
        fs::create_dir(&source).unwrap();
        fs::create_dir(&package).unwrap();
        fs::write(source.join("real.xml"), POM).unwrap();
        std::os::unix::fs::symlink(source.join("real.xml"), package.join("pom.xml")).unwrap();

        let product = resolve(&BuildSystem::Maven, &package).await.unwrap();
        assert_eq!(product.name, "demo");
        assert_eq!(product.version, "1.2.3");
    }

    #[tokio::test]
    async fn test_unreadable_package_directory_keeps_io_cause() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("no-such-package");

        let err = resolve(&BuildSystem::Maven, &missing).await.unwrap_err();

        assert!(matches!(err, AppError::DescriptorParse(_)));
        assert!(err.to_string().contains("no-such-package"));
        let AppError::DescriptorParse(source) = err else {
            unreachable!()
        };
        assert!(source.chain().any(|cause| cause.is::<std::io::Error>()));
    }

    #[tokio::test]
    async fn test_missing_version_is_parse_error() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("pom.xml"),
            "<project><artifactId>demo</artifactId></project>",
        )
        .unwrap();

        let err = resolve(&BuildSystem::Maven, dir.path()).await.unwrap_err();
        assert!(matches!(err, AppError::DescriptorParse(_)));
        assert!(err.to_string().contains("<version>"));
    }

    #[tokio::test]
    async fn test_malformed_xml_is_parse_error() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("pom.xml"),
            "<project><artifactId>demo</version>",
        )
        .unwrap();

        let err = resolve(&BuildSystem::Maven, dir.path()).await.unwrap_err();
        assert!(matches!(err, AppError::DescriptorParse(_)));
    }

    #[tokio::test]
    async fn test_other_build_system_uses_defaults_without_filesystem() {
        let missing = Path::new("/definitely/not/a/package/location");

        let product = resolve(&BuildSystem::Other("npm".into()), missing)
            .await
            .unwrap();
        assert_eq!(product, default_product_info());
    }
}
