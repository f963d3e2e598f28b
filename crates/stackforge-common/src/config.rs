//! Global configuration model for a Stackforge application.
//!
//! Every field has a default, so an empty YAML document (or no file at all)
//! yields the stock CI/CD pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, StackforgeError};
use crate::types::BatchComputeType;

/// Root configuration for a Stackforge application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Orchestrator id; prefixes every stack name and namespaces every parameter.
    pub app_id: String,
    /// Directory whose content seeds the source repository.
    pub assets_directory: PathBuf,
    /// Directory receiving the synthesized cloud assembly.
    pub output_dir: PathBuf,
    /// Branch the pipeline tracks.
    pub branch: String,
    /// Build project settings.
    pub build: BuildSettings,
    /// Batch compute environment settings.
    pub batch: BatchSettings,
    /// Tags applied to every stack.
    pub tags: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_id: constants::DEFAULT_APP_ID.to_string(),
            assets_directory: PathBuf::from(constants::DEFAULT_ASSETS_DIR),
            output_dir: PathBuf::from(constants::DEFAULT_OUTPUT_DIR),
            branch: constants::DEFAULT_BRANCH.to_string(),
            build: BuildSettings::default(),
            batch: BatchSettings::default(),
            tags: BTreeMap::new(),
        }
    }
}

/// CodeBuild project settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSettings {
    /// Curated CodeBuild image.
    pub image: String,
    /// CodeBuild compute type.
    pub compute_type: String,
    /// Whether the build container runs privileged (required for Docker).
    pub privileged: bool,
    /// Days after which untagged registry images expire. `None` keeps them.
    pub untagged_image_expiry_days: Option<u32>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            image: constants::DEFAULT_BUILD_IMAGE.to_string(),
            compute_type: constants::DEFAULT_BUILD_COMPUTE.to_string(),
            privileged: true,
            untagged_image_expiry_days: Some(14),
        }
    }
}

/// Managed batch compute environment settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchSettings {
    /// Provisioning model.
    pub compute_type: BatchComputeType,
    /// Upper bound on vCPUs the environment may scale to.
    pub max_vcpus: u32,
    /// Subnets for compute resources; empty means "ask at deploy time".
    pub subnet_ids: Vec<String>,
    /// Security groups for compute resources; empty means "ask at deploy time".
    pub security_group_ids: Vec<String>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            compute_type: BatchComputeType::default(),
            max_vcpus: constants::DEFAULT_BATCH_MAX_VCPUS,
            subnet_ids: Vec::new(),
            security_group_ids: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// fails [`AppConfig::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading configuration");
        let content = std::fs::read_to_string(path).map_err(|e| StackforgeError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Parses configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid YAML or fails validation.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns `Config` on an empty id or branch, or a zero vCPU ceiling.
    pub fn validate(&self) -> Result<()> {
        if self.app_id.trim().is_empty() {
            return Err(config_err("app_id must not be empty"));
        }
        if self.branch.trim().is_empty() {
            return Err(config_err("branch must not be empty"));
        }
        if self.batch.max_vcpus == 0 {
            return Err(config_err("batch.max_vcpus must be greater than zero"));
        }
        if self.build.untagged_image_expiry_days == Some(0) {
            return Err(config_err("build.untagged_image_expiry_days must be at least 1"));
        }
        Ok(())
    }
}

fn config_err(message: &str) -> StackforgeError {
    StackforgeError::Config {
        message: message.to_string(),
    }
}
