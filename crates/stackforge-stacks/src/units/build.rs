//! Build unit: CodeBuild project, container registry, and artifact bucket.
//!
//! Publishes `{namespace}-codebuild` and `{namespace}-sourcebucket`.

use serde_json::{Value, json};

use stackforge_common::config::BuildSettings;
use stackforge_common::constants::{CODEBUILD_PARAM_SUFFIX, SOURCE_BUCKET_PARAM_SUFFIX};
use stackforge_common::error::Result;
use stackforge_common::types::{ParameterKey, StackName};
use stackforge_synth::iam::{self, PolicyDocument, PolicyStatement};
use stackforge_synth::intrinsics::{account_id, get_att, reference, regional_arn};
use stackforge_synth::parameters::ParameterRef;
use stackforge_synth::template::Resource;
use stackforge_synth::{App, Stack, StackId};

use super::Unit;

const ECR_PUSH_ACTIONS: &[&str] = &[
    "ecr:BatchCheckLayerAvailability",
    "ecr:BatchGetImage",
    "ecr:CompleteLayerUpload",
    "ecr:GetDownloadUrlForLayer",
    "ecr:InitiateLayerUpload",
    "ecr:PutImage",
    "ecr:UploadLayerPart",
];

const LOG_ACTIONS: &[&str] = &[
    "logs:CreateLogGroup",
    "logs:CreateLogStream",
    "logs:PutLogEvents",
];

/// Handle returned by [`compose`].
#[derive(Debug, Clone)]
pub struct BuildHandle {
    stack: StackId,
    project_name: ParameterRef,
    source_bucket: ParameterRef,
}

impl BuildHandle {
    /// The published build project name.
    #[must_use]
    pub const fn project_name(&self) -> &ParameterRef {
        &self.project_name
    }

    /// The published source/artifact bucket name.
    #[must_use]
    pub const fn source_bucket(&self) -> &ParameterRef {
        &self.source_bucket
    }
}

impl Unit for BuildHandle {
    fn stack_id(&self) -> StackId {
        self.stack
    }
}

/// Builds and registers the build stack.
///
/// # Errors
///
/// Returns an error if the stack name is invalid or registration fails.
pub fn compose(
    app: &mut App,
    stack_name: &str,
    namespace: &str,
    settings: &BuildSettings,
) -> Result<BuildHandle> {
    tracing::info!(stack = stack_name, namespace, "composing build stack");
    let mut stack = Stack::new(StackName::new(stack_name)?)
        .with_description(format!("Build project and image registry for {namespace}"));

    let bucket = stack.add_resource(
        "SourceBucket",
        Resource::new(
            "AWS::S3::Bucket",
            json!({
                "VersioningConfiguration": { "Status": "Enabled" },
                "BucketEncryption": {
                    "ServerSideEncryptionConfiguration": [{
                        "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" }
                    }]
                },
                "PublicAccessBlockConfiguration": {
                    "BlockPublicAcls": true,
                    "BlockPublicPolicy": true,
                    "IgnorePublicAcls": true,
                    "RestrictPublicBuckets": true,
                },
            }),
        )
        .retain(),
    )?;

    let registry = stack.add_resource(
        "ImageRepository",
        Resource::new("AWS::ECR::Repository", registry_properties(namespace, settings)?).retain(),
    )?;

    let role = stack.add_resource("BuildRole", iam::service_role("codebuild.amazonaws.com"))?;
    let log_group = format!("log-group:/aws/codebuild/{namespace}*");
    let role_policy = iam::attach_policy(
        &mut stack,
        "BuildRoleDefaultPolicy",
        &role,
        &PolicyDocument::new()
            .statement(PolicyStatement::allow(
                LOG_ACTIONS,
                vec![regional_arn("logs", json!(log_group))],
            ))
            .statement(PolicyStatement::allow(&["ecr:GetAuthorizationToken"], vec![json!("*")]))
            .statement(PolicyStatement::allow(
                ECR_PUSH_ACTIONS,
                vec![get_att(&registry, "Arn")],
            )),
    )?;
    let bucket_policy =
        iam::grant_bucket_read_write(&mut stack, "BuildRoleBucketPolicy", &role, &reference(&bucket))?;

    let project = stack.add_resource(
        "BuildProject",
        Resource::new(
            "AWS::CodeBuild::Project",
            json!({
                "Name": namespace,
                "ServiceRole": get_att(&role, "Arn"),
                "Source": { "Type": "CODEPIPELINE" },
                "Artifacts": { "Type": "CODEPIPELINE" },
                "Environment": {
                    "Type": "LINUX_CONTAINER",
                    "ComputeType": settings.compute_type,
                    "Image": settings.image,
                    "PrivilegedMode": settings.privileged,
                    "ImagePullCredentialsType": "CODEBUILD",
                    "EnvironmentVariables": [
                        plaintext("AWS_ACCOUNT_ID", account_id()),
                        plaintext("IMAGE_REPO_NAME", reference(&registry)),
                        plaintext("REPOSITORY_URI", get_att(&registry, "RepositoryUri")),
                    ],
                },
            }),
        )
        .depends_on(&role_policy)
        .depends_on(&bucket_policy),
    )?;

    let project_name = stack.publish_parameter(
        "CodeBuildProjectName",
        ParameterKey::namespaced(namespace, CODEBUILD_PARAM_SUFFIX),
        reference(&project),
        "CodeBuild Project Name",
    )?;
    let source_bucket = stack.publish_parameter(
        "SourceBucketName",
        ParameterKey::namespaced(namespace, SOURCE_BUCKET_PARAM_SUFFIX),
        reference(&bucket),
        "Pipeline Source Bucket Name",
    )?;
    let _ = stack.add_output(
        "ImageRepositoryUri",
        get_att(&registry, "RepositoryUri"),
        "ECR Repository URI",
    )?;

    let stack = app.add_stack(stack)?;
    Ok(BuildHandle {
        stack,
        project_name,
        source_bucket,
    })
}

fn registry_properties(namespace: &str, settings: &BuildSettings) -> Result<Value> {
    // Registry names must be lowercase.
    let mut properties = json!({
        "RepositoryName": namespace.to_ascii_lowercase(),
        "ImageScanningConfiguration": { "ScanOnPush": true },
    });
    if let Some(days) = settings.untagged_image_expiry_days {
        let policy = json!({
            "rules": [{
                "rulePriority": 1,
                "description": format!("Expire untagged images after {days} days"),
                "selection": {
                    "tagStatus": "untagged",
                    "countType": "sinceImagePushed",
                    "countUnit": "days",
                    "countNumber": days,
                },
                "action": { "type": "expire" },
            }]
        });
        properties["LifecyclePolicy"] = json!({
            "LifecyclePolicyText": serde_json::to_string(&policy)?,
        });
    }
    Ok(properties)
}

fn plaintext(name: &str, value: Value) -> Value {
    json!({ "Name": name, "Type": "PLAINTEXT", "Value": value })
}
