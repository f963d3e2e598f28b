//! The synthesized output: one template per stack plus a manifest.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use stackforge_common::constants::{ASSEMBLY_VERSION, MANIFEST_FILE, TEMPLATE_FILE_SUFFIX};
use stackforge_common::error::{Result, StackforgeError};
use stackforge_common::types::{ParameterKey, StackName};

use crate::asset::FileAsset;
use crate::template::Template;

/// Index of everything in a cloud assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Manifest schema version.
    pub version: String,
    /// Stacks in deployment order.
    pub stacks: Vec<StackArtifact>,
    /// File assets to upload before deploying.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<FileAsset>,
}

impl Manifest {
    pub(crate) fn new(stacks: Vec<StackArtifact>, assets: Vec<FileAsset>) -> Self {
        Self {
            version: ASSEMBLY_VERSION.to_string(),
            stacks,
            assets,
        }
    }
}

/// Manifest entry for one stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackArtifact {
    /// Stack name.
    pub stack_name: StackName,
    /// Template file name relative to the assembly directory.
    pub template_file: String,
    /// Target environment.
    pub environment: String,
    /// Stacks that must deploy first.
    #[serde(default)]
    pub dependencies: Vec<StackName>,
    /// Stack-level tags.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// Parameter keys the stack writes.
    #[serde(default)]
    pub parameters_published: Vec<ParameterKey>,
    /// Parameter keys the stack reads.
    #[serde(default)]
    pub parameters_read: Vec<ParameterKey>,
}

/// Templates and manifest produced by [`App::synth`](crate::App::synth).
#[derive(Debug, Clone)]
pub struct CloudAssembly {
    manifest: Manifest,
    templates: Vec<(StackName, Template)>,
}

impl CloudAssembly {
    pub(crate) const fn new(manifest: Manifest, templates: Vec<(StackName, Template)>) -> Self {
        Self {
            manifest,
            templates,
        }
    }

    /// The manifest.
    #[must_use]
    pub const fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Template of a stack by name.
    #[must_use]
    pub fn template(&self, stack_name: &str) -> Option<&Template> {
        self.templates
            .iter()
            .find(|(name, _)| name.as_str() == stack_name)
            .map(|(_, t)| t)
    }

    /// Stacks and their templates in deployment order.
    pub fn stacks(&self) -> impl Iterator<Item = (&StackName, &Template)> {
        self.templates.iter().map(|(name, t)| (name, t))
    }

    /// Writes every template and the manifest into `dir`, creating it if needed.
    ///
    /// Returns the written paths, manifest last.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory or a file cannot be written, or
    /// `Serialization` if a template cannot be rendered.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        tracing::info!(dir = %dir.display(), "writing cloud assembly");
        std::fs::create_dir_all(dir).map_err(|e| StackforgeError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut written = Vec::with_capacity(self.templates.len() + 1);
        for (name, template) in &self.templates {
            let path = dir.join(format!("{name}{TEMPLATE_FILE_SUFFIX}"));
            write_file(&path, &template.to_json()?)?;
            written.push(path);
        }
        let manifest_path = dir.join(MANIFEST_FILE);
        write_file(&manifest_path, &serde_json::to_string_pretty(&self.manifest)?)?;
        written.push(manifest_path);
        Ok(written)
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    tracing::debug!(path = %path.display(), bytes = content.len(), "writing file");
    std::fs::write(path, content).map_err(|e| StackforgeError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
