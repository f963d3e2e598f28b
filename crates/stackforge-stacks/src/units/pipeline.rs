//! Pipeline unit: a two-stage CodePipeline from repository to image build.
//!
//! Repository, project, and bucket names are read through the parameter
//! namespace, so this stack deploys independently of its producers once
//! their parameters exist.

use serde_json::{Value, json};

use stackforge_common::constants::{
    BUILD_ACTION, BUILD_STAGE, PIPELINE_PARAM_SUFFIX, SOURCE_ACTION, SOURCE_ARTIFACT, SOURCE_STAGE,
};
use stackforge_common::error::Result;
use stackforge_common::types::{LogicalId, ParameterKey, StackName};
use stackforge_synth::iam::{self, PolicyDocument, PolicyStatement};
use stackforge_synth::intrinsics::{get_att, join, reference, regional_arn};
use stackforge_synth::parameters::ParameterRef;
use stackforge_synth::pipeline::{Action, Artifact, PipelineDeclaration, Stage};
use stackforge_synth::template::Resource;
use stackforge_synth::{App, Stack, StackId};

use super::Unit;
use super::build::BuildHandle;
use super::repository::RepositoryHandle;

const CODECOMMIT_SOURCE_ACTIONS: &[&str] = &[
    "codecommit:GetBranch",
    "codecommit:GetCommit",
    "codecommit:UploadArchive",
    "codecommit:GetUploadArchiveStatus",
    "codecommit:CancelUploadArchive",
];

const CODEBUILD_ACTIONS: &[&str] = &[
    "codebuild:BatchGetBuilds",
    "codebuild:StartBuild",
    "codebuild:StopBuild",
];

/// Handle returned by [`compose`].
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    stack: StackId,
    pipeline_name: ParameterRef,
}

impl PipelineHandle {
    /// The published pipeline name.
    #[must_use]
    pub const fn pipeline_name(&self) -> &ParameterRef {
        &self.pipeline_name
    }
}

impl Unit for PipelineHandle {
    fn stack_id(&self) -> StackId {
        self.stack
    }
}

/// Builds and registers the pipeline stack.
///
/// # Errors
///
/// Returns `UnresolvedParameter` if the repository or build handles were
/// not registered in `app`, or any declaration error.
pub fn compose(
    app: &mut App,
    stack_name: &str,
    namespace: &str,
    repository: &RepositoryHandle,
    build: &BuildHandle,
    branch: &str,
) -> Result<PipelineHandle> {
    tracing::info!(stack = stack_name, namespace, "composing pipeline stack");
    let mut stack = Stack::new(StackName::new(stack_name)?)
        .with_description(format!("CI/CD pipeline for {namespace}"));

    let repository_name =
        stack.consume_parameter("codecommit-repository-name", repository.repository_name())?;
    let project_name = stack.consume_parameter("codebuild-project-name", build.project_name())?;
    let bucket_name = stack.consume_parameter("artifacts-bucket-name", build.source_bucket())?;

    let role = stack.add_resource("CodePipelineRole", iam::service_role("codepipeline.amazonaws.com"))?;
    let role_policy = iam::attach_policy(
        &mut stack,
        "CodePipelineRoleDefaultPolicy",
        &role,
        &PolicyDocument::new()
            .statement(PolicyStatement::allow(
                CODECOMMIT_SOURCE_ACTIONS,
                vec![regional_arn("codecommit", repository_name.clone())],
            ))
            .statement(PolicyStatement::allow(
                CODEBUILD_ACTIONS,
                vec![regional_arn(
                    "codebuild",
                    join("", vec![json!("project/"), project_name.clone()]),
                )],
            )),
    )?;
    let bucket_grant =
        iam::grant_bucket_read_write(&mut stack, "CodePipelineRoleArtifactsPolicy", &role, &bucket_name)?;

    let source = Artifact::new(SOURCE_ARTIFACT);
    let declaration = PipelineDeclaration::new(namespace, bucket_name, get_att(&role, "Arn"))
        .stage(Stage::new(SOURCE_STAGE).action(Action::codecommit_source(
            SOURCE_ACTION,
            repository_name.clone(),
            branch,
            &source,
        )))
        .stage(Stage::new(BUILD_STAGE).action(Action::codebuild(BUILD_ACTION, project_name, &source)));

    let pipeline = stack.add_resource(
        "CodePipeline",
        Resource::new("AWS::CodePipeline::Pipeline", declaration.to_properties()?)
            .depends_on(&role_policy)
            .depends_on(&bucket_grant),
    )?;

    add_source_trigger(&mut stack, &pipeline, repository_name, branch)?;

    let pipeline_name = stack.publish_parameter(
        "CodePipelineName",
        ParameterKey::namespaced(namespace, PIPELINE_PARAM_SUFFIX),
        reference(&pipeline),
        "Code Pipeline Name",
    )?;
    let _ = stack.add_output("PipelineName", reference(&pipeline), "CodePipeline Name")?;

    let stack = app.add_stack(stack)?;
    Ok(PipelineHandle {
        stack,
        pipeline_name,
    })
}

/// Starts the pipeline when `branch` is created or updated.
fn add_source_trigger(
    stack: &mut Stack,
    pipeline: &LogicalId,
    repository_name: Value,
    branch: &str,
) -> Result<()> {
    let pipeline_arn = regional_arn("codepipeline", reference(pipeline));
    let events_role = stack.add_resource("CodePipelineEventsRole", iam::service_role("events.amazonaws.com"))?;
    let _ = iam::attach_policy(
        stack,
        "CodePipelineEventsRoleDefaultPolicy",
        &events_role,
        &PolicyDocument::new().statement(PolicyStatement::allow(
            &["codepipeline:StartPipelineExecution"],
            vec![pipeline_arn.clone()],
        )),
    )?;
    let _ = stack.add_resource(
        "SourceChangeRule",
        Resource::new(
            "AWS::Events::Rule",
            json!({
                "State": "ENABLED",
                "EventPattern": {
                    "source": ["aws.codecommit"],
                    "resources": [regional_arn("codecommit", repository_name)],
                    "detail-type": ["CodeCommit Repository State Change"],
                    "detail": {
                        "event": ["referenceCreated", "referenceUpdated"],
                        "referenceName": [branch],
                    },
                },
                "Targets": [{
                    "Id": "Target0",
                    "Arn": pipeline_arn,
                    "RoleArn": get_att(&events_role, "Arn"),
                }],
            }),
        ),
    )?;
    Ok(())
}
