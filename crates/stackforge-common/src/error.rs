//! Unified error types for the Stackforge workspace.
//!
//! Composition is all-or-nothing: every variant aborts the run that
//! produced it. Nothing in the workspace retries.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StackforgeError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// Two different stack declarations share a name.
    #[error("duplicate stack name: \"{name}\"")]
    DuplicateStack {
        /// The conflicting stack name.
        name: String,
    },

    /// A parameter key is already published by another stack.
    #[error("parameter \"{key}\" is already published by stack \"{owner}\", cannot publish from \"{requested_by}\"")]
    ParameterConflict {
        /// The contested parameter key.
        key: String,
        /// Stack that currently owns the key.
        owner: String,
        /// Stack that attempted to publish it.
        requested_by: String,
    },

    /// A stack reads a parameter that no upstream stack publishes.
    #[error("stack \"{stack}\" reads parameter \"{key}\" which is not published upstream")]
    UnresolvedParameter {
        /// The unresolved parameter key.
        key: String,
        /// Stack that consumes the key.
        stack: String,
    },

    /// The stack dependency graph contains a cycle.
    #[error("cyclic dependency detected in stack graph involving \"{stack}\"")]
    CyclicDependency {
        /// A stack participating in the cycle.
        stack: String,
    },

    /// A pipeline declaration is structurally invalid.
    #[error("invalid pipeline \"{pipeline}\": {message}")]
    InvalidPipeline {
        /// Pipeline name.
        pipeline: String,
        /// Description of the structural problem.
        message: String,
    },

    /// A CloudFormation logical ID or stack name is malformed.
    #[error("invalid {kind} \"{value}\": {reason}")]
    InvalidIdentifier {
        /// Which identifier kind was rejected.
        kind: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// JSON serialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// YAML configuration could not be parsed.
    #[error("YAML error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StackforgeError>;
