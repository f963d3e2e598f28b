//! Source repository unit.
//!
//! Declares a CodeCommit repository whose first commit is the content of the
//! assets directory, and publishes its name as `{namespace}-repository`.

use std::path::Path;

use serde_json::json;

use stackforge_common::constants::REPOSITORY_PARAM_SUFFIX;
use stackforge_common::error::Result;
use stackforge_common::types::{ParameterKey, StackName};
use stackforge_synth::asset::FileAsset;
use stackforge_synth::intrinsics::get_att;
use stackforge_synth::parameters::ParameterRef;
use stackforge_synth::template::Resource;
use stackforge_synth::{App, Stack, StackId};

use super::Unit;

/// Handle returned by [`compose`].
#[derive(Debug, Clone)]
pub struct RepositoryHandle {
    stack: StackId,
    repository_name: ParameterRef,
}

impl RepositoryHandle {
    /// The published repository name.
    #[must_use]
    pub const fn repository_name(&self) -> &ParameterRef {
        &self.repository_name
    }
}

impl Unit for RepositoryHandle {
    fn stack_id(&self) -> StackId {
        self.stack
    }
}

/// Builds and registers the repository stack.
///
/// # Errors
///
/// Returns an error if the assets directory cannot be read, the stack name
/// is invalid, or registration fails.
pub fn compose(
    app: &mut App,
    stack_name: &str,
    namespace: &str,
    assets_directory: &Path,
    branch: &str,
) -> Result<RepositoryHandle> {
    tracing::info!(stack = stack_name, namespace, "composing repository stack");
    let asset = FileAsset::from_directory(assets_directory)?;

    let mut stack = Stack::new(StackName::new(stack_name)?)
        .with_description(format!("Source repository for {namespace}"));

    let repository = stack.add_resource(
        "CodeCommitRepository",
        Resource::new(
            "AWS::CodeCommit::Repository",
            json!({
                "RepositoryName": namespace,
                "RepositoryDescription": format!("Application sources for {namespace}"),
                "Code": {
                    "BranchName": branch,
                    "S3": { "Bucket": asset.bucket(), "Key": asset.object_key() },
                },
            }),
        ),
    )?;
    stack.add_asset(asset);

    let repository_name = stack.publish_parameter(
        "CodeCommitRepositoryName",
        ParameterKey::namespaced(namespace, REPOSITORY_PARAM_SUFFIX),
        get_att(&repository, "Name"),
        "CodeCommit Repository Name",
    )?;
    let _ = stack.add_output(
        "RepositoryCloneUrlHttp",
        get_att(&repository, "CloneUrlHttp"),
        "CodeCommit HTTPS clone URL",
    )?;

    let stack = app.add_stack(stack)?;
    Ok(RepositoryHandle {
        stack,
        repository_name,
    })
}
