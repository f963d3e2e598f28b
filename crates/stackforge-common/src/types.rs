//! Domain primitive types used across the Stackforge workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_LOGICAL_ID_LENGTH, MAX_STACK_NAME_LENGTH};
use crate::error::{Result, StackforgeError};

/// CloudFormation logical ID of a resource, output, or template parameter.
///
/// Logical IDs are alphanumeric and unique within a template.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    /// Creates a logical ID, rejecting anything CloudFormation would refuse.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` if the value is empty, too long, or
    /// contains non-alphanumeric characters.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let reason = if id.is_empty() {
            Some("must not be empty")
        } else if id.len() > MAX_LOGICAL_ID_LENGTH {
            Some("exceeds 255 characters")
        } else if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            Some("must be alphanumeric")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(StackforgeError::InvalidIdentifier {
                kind: "logical ID",
                value: id,
                reason,
            }),
            None => Ok(Self(id)),
        }
    }

    /// Builds a logical ID from a construct path such as `codebuild-project-x`.
    ///
    /// Separators are dropped and the following character is upper-cased,
    /// so `artifacts-bucket-app` becomes `ArtifactsBucketApp`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` if nothing alphanumeric remains.
    pub fn from_path(raw: &str) -> Result<Self> {
        let mut out = String::with_capacity(raw.len());
        let mut upper_next = true;
        for c in raw.chars() {
            if c.is_ascii_alphanumeric() {
                if upper_next {
                    out.push(c.to_ascii_uppercase());
                } else {
                    out.push(c);
                }
                upper_next = false;
            } else {
                upper_next = true;
            }
        }
        Self::new(out)
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a deployable stack.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackName(String);

impl StackName {
    /// Creates a stack name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` unless the name starts with a letter,
    /// contains only letters, digits, and hyphens, and fits in 128 characters.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("must not be empty")
        } else if name.len() > MAX_STACK_NAME_LENGTH {
            Some("exceeds 128 characters")
        } else if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
            Some("must start with a letter")
        } else if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            Some("may only contain letters, digits, and hyphens")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(StackforgeError::InvalidIdentifier {
                kind: "stack name",
                value: name,
                reason,
            }),
            None => Ok(Self(name)),
        }
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key of a named parameter in the SSM parameter namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterKey(String);

impl ParameterKey {
    /// Builds the `{namespace}-{suffix}` key shared between stacks.
    #[must_use]
    pub fn namespaced(namespace: &str, suffix: &str) -> Self {
        Self(format!("{namespace}-{suffix}"))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Provisioning model of a managed batch compute environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchComputeType {
    /// Serverless Fargate capacity.
    #[default]
    Fargate,
    /// Fargate Spot capacity.
    FargateSpot,
    /// On-demand EC2 instances.
    Ec2,
    /// EC2 Spot instances.
    Spot,
}

impl BatchComputeType {
    /// Returns the value CloudFormation expects in `ComputeResources.Type`.
    #[must_use]
    pub const fn as_cfn(self) -> &'static str {
        match self {
            Self::Fargate => "FARGATE",
            Self::FargateSpot => "FARGATE_SPOT",
            Self::Ec2 => "EC2",
            Self::Spot => "SPOT",
        }
    }

    /// Whether the compute type runs on Fargate.
    #[must_use]
    pub const fn is_fargate(self) -> bool {
        matches!(self, Self::Fargate | Self::FargateSpot)
    }
}

impl fmt::Display for BatchComputeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_cfn())
    }
}
