//! Release archive creation.
//!
//! The package directory is zipped into `{name}-{version}.zip` inside the directory
//! itself. Entries are written in sorted order with a fixed timestamp and fixed
//! permissions, so the archive bytes depend only on the input tree.

use service_core::error::AppError;
use service_core::utils::sha256_base64;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::models::ProductInfo;

const FILE_PERMISSIONS: u32 = 0o644;
const DIRECTORY_PERMISSIONS: u32 = 0o755;

/// Archive written by [`package`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedArchive {
    pub path: PathBuf,
    pub file_name: String,
}

#[derive(Debug)]
enum Entry {
    Directory(String),
    File(String),
}

impl Entry {
    fn name(&self) -> &str {
        match self {
            Entry::Directory(name) | Entry::File(name) => name,
        }
    }
}

/// Zip `directory` into `{name}-{version}.zip` inside it.
pub async fn package(
    directory: &Path,
    product: &ProductInfo,
) -> Result<PackagedArchive, AppError> {
    let directory = directory.to_path_buf();
    let file_name = product.archive_file_name();

    tokio::task::spawn_blocking(move || package_blocking(&directory, &file_name))
        .await
        .map_err(|e| AppError::Packaging(anyhow::anyhow!("Packaging task failed: {}", e)))?
}

fn package_blocking(directory: &Path, file_name: &str) -> Result<PackagedArchive, AppError> {
    if !directory.is_dir() {
        return Err(AppError::Packaging(anyhow::anyhow!(
            "Package location {} is not a directory",
            directory.display()
        )));
    }

    // Collected before the archive is created, so a stale copy is skipped too.
    let mut entries = Vec::new();
    collect_entries(directory, "", file_name, &mut entries)?;
    entries.sort_by(|a, b| a.name().cmp(b.name()));

    let path = directory.join(file_name);
    let mut writer = ZipWriter::new(File::create(&path)?);

    for entry in &entries {
        match entry {
            Entry::Directory(name) => {
                writer.add_directory(name.as_str(), entry_options(DIRECTORY_PERMISSIONS))?;
            }
            Entry::File(name) => {
                writer.start_file(name.as_str(), entry_options(FILE_PERMISSIONS))?;
                let mut source = File::open(directory.join(name))?;
                io::copy(&mut source, &mut writer)?;
            }
        }
    }

    writer.finish()?;

    tracing::info!(
        archive = %path.display(),
        entries = entries.len(),
        "Release archive created"
    );

    Ok(PackagedArchive {
        path,
        file_name: file_name.to_string(),
    })
}

fn entry_options(permissions: u32) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(permissions)
}

fn collect_entries(
    root: &Path,
    prefix: &str,
    archive_name: &str,
    entries: &mut Vec<Entry>,
) -> Result<(), AppError> {
    let current = if prefix.is_empty() {
        root.to_path_buf()
    } else {
        root.join(prefix)
    };

    for dir_entry in fs::read_dir(&current)? {
        let dir_entry = dir_entry?;
        let name = dir_entry.file_name().to_string_lossy().into_owned();

        if prefix.is_empty() && name == archive_name {
            continue;
        }

        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };

        // Directory links are skipped so a link back to an ancestor cannot loop.
        let mut metadata = fs::symlink_metadata(dir_entry.path())?;
        if metadata.file_type().is_symlink() {
            metadata = fs::metadata(dir_entry.path())?;
            if metadata.is_dir() {
                tracing::warn!(entry = %relative, "Skipping symlinked directory");
                continue;
            }
        }

        if metadata.is_dir() {
            entries.push(Entry::Directory(format!("{}/", relative)));
            collect_entries(root, &relative, archive_name, entries)?;
        } else if metadata.is_file() {
            entries.push(Entry::File(relative));
        }
    }

    Ok(())
}

/// Base64 SHA-256 of the file at `path`.
pub fn hash(path: &Path) -> Result<String, AppError> {
    Ok(sha256_base64(&fs::read(path)?))
}

pub fn size_bytes(path: &Path) -> Result<u64, AppError> {
    Ok(fs::metadata(path)?.len())
}
