//! CodePipeline declarations.
//!
//! A pipeline is an ordered list of stages, each an ordered list of
//! actions. Actions exchange named artifacts; every artifact has exactly
//! one producer and is only consumed by actions in later stages.

use std::collections::{HashMap, HashSet};

use serde_json::{Value, json};

use stackforge_common::error::{Result, StackforgeError};

/// A named handle to stage output stored in the artifact bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Artifact {
    name: String,
}

impl Artifact {
    /// Creates an artifact handle.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The artifact name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn to_value(&self) -> Value {
        json!({ "Name": self.name })
    }
}

/// The service an action delegates to.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionProvider {
    /// Pull a branch of a CodeCommit repository.
    CodeCommit {
        /// Expression for the repository name.
        repository_name: Value,
        /// Tracked branch.
        branch: String,
    },
    /// Run a CodeBuild project.
    CodeBuild {
        /// Expression for the project name.
        project_name: Value,
    },
}

impl ActionProvider {
    const fn category(&self) -> &'static str {
        match self {
            Self::CodeCommit { .. } => "Source",
            Self::CodeBuild { .. } => "Build",
        }
    }

    const fn provider(&self) -> &'static str {
        match self {
            Self::CodeCommit { .. } => "CodeCommit",
            Self::CodeBuild { .. } => "CodeBuild",
        }
    }

    const fn is_source(&self) -> bool {
        matches!(self, Self::CodeCommit { .. })
    }

    fn configuration(&self) -> Value {
        match self {
            // Change detection goes through an EventBridge rule instead of polling.
            Self::CodeCommit {
                repository_name,
                branch,
            } => json!({
                "RepositoryName": repository_name,
                "BranchName": branch,
                "PollForSourceChanges": false,
            }),
            Self::CodeBuild { project_name } => json!({ "ProjectName": project_name }),
        }
    }
}

/// A single step inside a stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    name: String,
    provider: ActionProvider,
    inputs: Vec<Artifact>,
    outputs: Vec<Artifact>,
    run_order: u32,
}

impl Action {
    /// A CodeCommit source action writing the branch content to `output`.
    #[must_use]
    pub fn codecommit_source(
        name: impl Into<String>,
        repository_name: Value,
        branch: impl Into<String>,
        output: &Artifact,
    ) -> Self {
        Self {
            name: name.into(),
            provider: ActionProvider::CodeCommit {
                repository_name,
                branch: branch.into(),
            },
            inputs: Vec::new(),
            outputs: vec![output.clone()],
            run_order: 1,
        }
    }

    /// A CodeBuild action reading `input`.
    #[must_use]
    pub fn codebuild(name: impl Into<String>, project_name: Value, input: &Artifact) -> Self {
        Self {
            name: name.into(),
            provider: ActionProvider::CodeBuild { project_name },
            inputs: vec![input.clone()],
            outputs: Vec::new(),
            run_order: 1,
        }
    }

    /// Adds an output artifact.
    #[must_use]
    pub fn with_output(mut self, artifact: &Artifact) -> Self {
        self.outputs.push(artifact.clone());
        self
    }

    /// Sets the position of the action inside its stage (1-based).
    #[must_use]
    pub const fn with_run_order(mut self, run_order: u32) -> Self {
        self.run_order = run_order;
        self
    }

    /// The action name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The provider configuration.
    #[must_use]
    pub const fn provider(&self) -> &ActionProvider {
        &self.provider
    }

    /// Artifacts consumed.
    #[must_use]
    pub fn inputs(&self) -> &[Artifact] {
        &self.inputs
    }

    /// Artifacts produced.
    #[must_use]
    pub fn outputs(&self) -> &[Artifact] {
        &self.outputs
    }

    fn to_value(&self) -> Value {
        let mut action = json!({
            "Name": self.name,
            "ActionTypeId": {
                "Category": self.provider.category(),
                "Owner": "AWS",
                "Provider": self.provider.provider(),
                "Version": "1",
            },
            "Configuration": self.provider.configuration(),
            "RunOrder": self.run_order,
        });
        if !self.inputs.is_empty() {
            action["InputArtifacts"] = self.inputs.iter().map(Artifact::to_value).collect();
        }
        if !self.outputs.is_empty() {
            action["OutputArtifacts"] = self.outputs.iter().map(Artifact::to_value).collect();
        }
        action
    }
}

/// A named group of actions.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    name: String,
    actions: Vec<Action>,
}

impl Stage {
    /// Creates an empty stage.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    /// Appends an action.
    #[must_use]
    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// The stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Actions in declaration order.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}

/// A complete pipeline declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDeclaration {
    name: String,
    artifact_bucket: Value,
    role_arn: Value,
    stages: Vec<Stage>,
}

impl PipelineDeclaration {
    /// Creates a pipeline storing artifacts in `artifact_bucket` and running as `role_arn`.
    #[must_use]
    pub fn new(name: impl Into<String>, artifact_bucket: Value, role_arn: Value) -> Self {
        Self {
            name: name.into(),
            artifact_bucket,
            role_arn,
            stages: Vec::new(),
        }
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// The pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Checks the structural rules CodePipeline enforces at deploy time.
    ///
    /// # Checks performed
    ///
    /// 1. At least two stages; stage names are unique.
    /// 2. Every stage has at least one action; action names are unique per stage.
    /// 3. Source actions appear only in the first stage, which holds nothing else.
    /// 4. Every artifact has exactly one producer.
    /// 5. Every consumed artifact is produced by an earlier stage.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPipeline` describing the first violated rule.
    pub fn validate(&self) -> Result<()> {
        if self.stages.len() < 2 {
            return Err(self.invalid(format!(
                "a pipeline needs at least two stages, found {}",
                self.stages.len()
            )));
        }

        let mut stage_names = HashSet::new();
        let mut producers: HashMap<&str, usize> = HashMap::new();

        for (position, stage) in self.stages.iter().enumerate() {
            if !stage_names.insert(stage.name.as_str()) {
                return Err(self.invalid(format!("duplicate stage name \"{}\"", stage.name)));
            }
            if stage.actions.is_empty() {
                return Err(self.invalid(format!("stage \"{}\" has no actions", stage.name)));
            }
            self.check_stage_actions(position, stage, &mut producers)?;
        }
        Ok(())
    }

    fn check_stage_actions<'a>(
        &self,
        position: usize,
        stage: &'a Stage,
        producers: &mut HashMap<&'a str, usize>,
    ) -> Result<()> {
        for action in &stage.actions {
            for output in &action.outputs {
                if producers.insert(output.name.as_str(), position).is_some() {
                    return Err(self.invalid(format!(
                        "artifact \"{}\" is produced more than once",
                        output.name
                    )));
                }
            }
        }

        let mut action_names = HashSet::new();
        for action in &stage.actions {
            if !action_names.insert(action.name.as_str()) {
                return Err(self.invalid(format!(
                    "duplicate action name \"{}\" in stage \"{}\"",
                    action.name, stage.name
                )));
            }
            match (position == 0, action.provider.is_source()) {
                (true, false) => {
                    return Err(self.invalid(format!(
                        "first stage \"{}\" may only contain source actions, found \"{}\"",
                        stage.name, action.name
                    )));
                }
                (false, true) => {
                    return Err(self.invalid(format!(
                        "source action \"{}\" must be in the first stage",
                        action.name
                    )));
                }
                _ => {}
            }
            for input in &action.inputs {
                match producers.get(input.name()) {
                    Some(&produced_in) if produced_in < position => {}
                    Some(_) => {
                        return Err(self.invalid(format!(
                            "action \"{}\" consumes artifact \"{}\" produced in the same stage",
                            action.name, input.name
                        )));
                    }
                    None => {
                        return Err(self.invalid(format!(
                            "action \"{}\" consumes artifact \"{}\" which no earlier stage produces",
                            action.name, input.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Renders the `AWS::CodePipeline::Pipeline` properties after validation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPipeline` if [`validate`](Self::validate) fails.
    pub fn to_properties(&self) -> Result<Value> {
        self.validate()?;
        let stages: Vec<Value> = self
            .stages
            .iter()
            .map(|stage| {
                json!({
                    "Name": stage.name,
                    "Actions": stage.actions.iter().map(Action::to_value).collect::<Vec<_>>(),
                })
            })
            .collect();
        Ok(json!({
            "Name": self.name,
            "RoleArn": self.role_arn,
            "ArtifactStore": { "Type": "S3", "Location": self.artifact_bucket },
            "Stages": stages,
        }))
    }

    fn invalid(&self, message: String) -> StackforgeError {
        StackforgeError::InvalidPipeline {
            pipeline: self.name.clone(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_stage() -> PipelineDeclaration {
        let source = Artifact::new("source");
        PipelineDeclaration::new("demo", json!("bucket"), json!("role"))
            .stage(Stage::new("Source").action(Action::codecommit_source(
                "CodeCommitSourceRetrieval",
                json!("repo"),
                "main",
                &source,
            )))
            .stage(Stage::new("Build").action(Action::codebuild(
                "DockerBuildImages",
                json!("project"),
                &source,
            )))
    }

    #[test]
    fn two_stage_pipeline_is_valid() {
        assert!(two_stage().validate().is_ok());
    }

    #[test]
    fn properties_render_stages_in_order() {
        let props = two_stage().to_properties().expect("render");
        assert_eq!(props["Name"], json!("demo"));
        assert_eq!(props["ArtifactStore"], json!({ "Type": "S3", "Location": "bucket" }));
        let stages = props["Stages"].as_array().expect("stages");
        assert_eq!(stages[0]["Name"], json!("Source"));
        assert_eq!(stages[1]["Name"], json!("Build"));
    }

    #[test]
    fn properties_render_action_types_and_artifacts() {
        let props = two_stage().to_properties().expect("render");
        let source = &props["Stages"][0]["Actions"][0];
        assert_eq!(source["ActionTypeId"]["Provider"], json!("CodeCommit"));
        assert_eq!(source["ActionTypeId"]["Category"], json!("Source"));
        assert_eq!(source["Configuration"]["BranchName"], json!("main"));
        assert_eq!(source["Configuration"]["PollForSourceChanges"], json!(false));
        assert_eq!(source["OutputArtifacts"], json!([{ "Name": "source" }]));
        assert!(source.get("InputArtifacts").is_none());

        let build = &props["Stages"][1]["Actions"][0];
        assert_eq!(build["ActionTypeId"]["Provider"], json!("CodeBuild"));
        assert_eq!(build["Configuration"]["ProjectName"], json!("project"));
        assert_eq!(build["InputArtifacts"], json!([{ "Name": "source" }]));
        assert_eq!(build["RunOrder"], json!(1));
    }

    #[test]
    fn single_stage_is_rejected() {
        let source = Artifact::new("source");
        let pipeline = PipelineDeclaration::new("p", json!("b"), json!("r")).stage(
            Stage::new("Source").action(Action::codecommit_source("S", json!("r"), "main", &source)),
        );
        let msg = pipeline.validate().unwrap_err().to_string();
        assert!(msg.contains("at least two stages"), "got: {msg}");
    }

    #[test]
    fn unproduced_input_is_rejected() {
        let source = Artifact::new("source");
        let missing = Artifact::new("compiled");
        let pipeline = PipelineDeclaration::new("p", json!("b"), json!("r"))
            .stage(Stage::new("Source").action(Action::codecommit_source(
                "S",
                json!("r"),
                "main",
                &source,
            )))
            .stage(Stage::new("Build").action(Action::codebuild("B", json!("p"), &missing)));
        let msg = pipeline.validate().unwrap_err().to_string();
        assert!(msg.contains("compiled"), "got: {msg}");
        assert!(msg.contains("no earlier stage"), "got: {msg}");
    }

    #[test]
    fn same_stage_consumption_is_rejected() {
        let source = Artifact::new("source");
        let image = Artifact::new("image");
        let pipeline = PipelineDeclaration::new("p", json!("b"), json!("r"))
            .stage(Stage::new("Source").action(Action::codecommit_source(
                "S",
                json!("r"),
                "main",
                &source,
            )))
            .stage(
                Stage::new("Build")
                    .action(Action::codebuild("Compile", json!("p"), &source).with_output(&image))
                    .action(Action::codebuild("Scan", json!("p"), &image).with_run_order(2)),
            );
        let msg = pipeline.validate().unwrap_err().to_string();
        assert!(msg.contains("same stage"), "got: {msg}");
    }

    #[test]
    fn duplicate_producer_is_rejected() {
        let source = Artifact::new("source");
        let pipeline = PipelineDeclaration::new("p", json!("b"), json!("r"))
            .stage(
                Stage::new("Source")
                    .action(Action::codecommit_source("A", json!("r1"), "main", &source))
                    .action(Action::codecommit_source("B", json!("r2"), "main", &source)),
            )
            .stage(Stage::new("Build").action(Action::codebuild("C", json!("p"), &source)));
        let msg = pipeline.validate().unwrap_err().to_string();
        assert!(msg.contains("more than once"), "got: {msg}");
    }

    #[test]
    fn source_outside_first_stage_is_rejected() {
        let source = Artifact::new("source");
        let other = Artifact::new("other");
        let pipeline = PipelineDeclaration::new("p", json!("b"), json!("r"))
            .stage(Stage::new("Source").action(Action::codecommit_source(
                "S",
                json!("r"),
                "main",
                &source,
            )))
            .stage(Stage::new("Late").action(Action::codecommit_source(
                "Late",
                json!("r"),
                "main",
                &other,
            )));
        let msg = pipeline.validate().unwrap_err().to_string();
        assert!(msg.contains("must be in the first stage"), "got: {msg}");
    }

    #[test]
    fn build_in_first_stage_is_rejected() {
        let source = Artifact::new("source");
        let pipeline = PipelineDeclaration::new("p", json!("b"), json!("r"))
            .stage(Stage::new("Build").action(Action::codebuild("B", json!("p"), &source)))
            .stage(Stage::new("Other").action(Action::codebuild("C", json!("p"), &source)));
        let msg = pipeline.validate().unwrap_err().to_string();
        assert!(msg.contains("only contain source actions"), "got: {msg}");
    }

    #[test]
    fn duplicate_stage_name_is_rejected() {
        let source = Artifact::new("source");
        let pipeline = PipelineDeclaration::new("p", json!("b"), json!("r"))
            .stage(Stage::new("Source").action(Action::codecommit_source(
                "S",
                json!("r"),
                "main",
                &source,
            )))
            .stage(Stage::new("Source").action(Action::codebuild("B", json!("p"), &source)));
        let msg = pipeline.validate().unwrap_err().to_string();
        assert!(msg.contains("duplicate stage name"), "got: {msg}");
    }
}
