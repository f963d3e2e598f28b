//! System-wide constants and naming contracts.
//!
//! The parameter key suffixes and pipeline names below are shared between
//! independently deployed stacks and must match exactly.

/// Default orchestrator id; also used as the namespace for every unit.
pub const DEFAULT_APP_ID: &str = "CICDPipelineAWSBatch";

/// Default directory holding the initial repository content.
pub const DEFAULT_ASSETS_DIR: &str = "app-package";

/// Default cloud assembly output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "cdk.out";

/// CloudFormation template format version.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Cloud assembly manifest schema version.
pub const ASSEMBLY_VERSION: &str = "36.0.0";

/// Environment string used when account and region are resolved at deploy time.
pub const AGNOSTIC_ENVIRONMENT: &str = "aws://unknown-account/unknown-region";

/// Suffix of the manifest file inside the output directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Suffix appended to a stack name to form its template file name.
pub const TEMPLATE_FILE_SUFFIX: &str = ".template.json";

/// Bootstrap bucket receiving file assets, as a `Fn::Sub` pattern.
pub const ASSET_BUCKET_PATTERN: &str = "cdk-hnb659fds-assets-${AWS::AccountId}-${AWS::Region}";

/// CloudFormation template parameter type that dereferences an SSM key.
pub const SSM_PARAMETER_VALUE_TYPE: &str = "AWS::SSM::Parameter::Value<String>";

/// Parameter key suffix for the repository name.
pub const REPOSITORY_PARAM_SUFFIX: &str = "repository";
/// Parameter key suffix for the build project name.
pub const CODEBUILD_PARAM_SUFFIX: &str = "codebuild";
/// Parameter key suffix for the source/artifact bucket name.
pub const SOURCE_BUCKET_PARAM_SUFFIX: &str = "sourcebucket";
/// Parameter key suffix for the pipeline name.
pub const PIPELINE_PARAM_SUFFIX: &str = "pipeline";

/// Name of the first pipeline stage.
pub const SOURCE_STAGE: &str = "Source";
/// Name of the second pipeline stage.
pub const BUILD_STAGE: &str = "Build";
/// Name of the source retrieval action.
pub const SOURCE_ACTION: &str = "CodeCommitSourceRetrieval";
/// Name of the image build action.
pub const BUILD_ACTION: &str = "DockerBuildImages";
/// Artifact passed from the source stage to the build stage.
pub const SOURCE_ARTIFACT: &str = "source";
/// Branch tracked by the pipeline.
pub const DEFAULT_BRANCH: &str = "main";

/// Default CodeBuild image.
pub const DEFAULT_BUILD_IMAGE: &str = "aws/codebuild/standard:7.0";
/// Default CodeBuild compute type.
pub const DEFAULT_BUILD_COMPUTE: &str = "BUILD_GENERAL1_SMALL";

/// Default maximum vCPUs for the batch compute environment.
pub const DEFAULT_BATCH_MAX_VCPUS: u32 = 16;

/// Maximum length of a CloudFormation logical ID.
pub const MAX_LOGICAL_ID_LENGTH: usize = 255;
/// Maximum length of a CloudFormation stack name.
pub const MAX_STACK_NAME_LENGTH: usize = 128;

/// Largest template body CloudFormation accepts without an S3 upload.
pub const MAX_INLINE_TEMPLATE_BYTES: u64 = 51_200;
