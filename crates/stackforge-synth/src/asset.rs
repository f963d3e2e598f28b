//! File assets: local directories shipped alongside the templates.
//!
//! A directory is identified by a SHA-256 over its relative paths and file
//! contents, so renaming or editing any file produces a new object key.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use stackforge_common::constants::ASSET_BUCKET_PATTERN;
use stackforge_common::error::{Result, StackforgeError};

use crate::intrinsics;

/// How an asset is packaged before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetPackaging {
    /// The directory is zipped.
    ZipDirectory,
}

/// A local directory referenced by a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAsset {
    /// Hex SHA-256 of the directory content.
    pub hash: String,
    /// Where the directory lives on disk.
    pub source_path: PathBuf,
    /// Packaging applied before upload.
    pub packaging: AssetPackaging,
}

impl FileAsset {
    /// Fingerprints a directory.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the path is not a directory, or `Io` if any
    /// entry cannot be read.
    pub fn from_directory(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path).map_err(|e| StackforgeError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if !meta.is_dir() {
            return Err(StackforgeError::Config {
                message: format!("asset path {} is not a directory", path.display()),
            });
        }
        let hash = hash_directory(path)?;
        tracing::debug!(path = %path.display(), hash = %hash, "fingerprinted asset directory");
        Ok(Self {
            hash,
            source_path: path.to_path_buf(),
            packaging: AssetPackaging::ZipDirectory,
        })
    }

    /// Object key of the uploaded archive.
    #[must_use]
    pub fn object_key(&self) -> String {
        format!("{}.zip", self.hash)
    }

    /// Expression for the bootstrap bucket the asset is uploaded to.
    #[must_use]
    pub fn bucket(&self) -> Value {
        intrinsics::sub(ASSET_BUCKET_PATTERN)
    }
}

fn hash_directory(root: &Path) -> Result<String> {
    let mut files = Vec::new();
    collect_files(root, root, &mut files)?;
    files.sort();

    let mut hasher = Sha256::new();
    for relative in &files {
        let full = root.join(relative);
        let bytes = std::fs::read(&full).map_err(|e| StackforgeError::Io {
            path: full.clone(),
            source: e,
        })?;
        hasher.update(relative.as_bytes());
        hasher.update([0u8]);
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Collects `/`-separated paths of regular files under `dir`, relative to `root`.
fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    let io_err = |e: std::io::Error| StackforgeError::Io {
        path: dir.to_path_buf(),
        source: e,
    };
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let parts: Vec<_> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            out.push(parts.join("/"));
        }
    }
    Ok(())
}
