//! A named, deployable bundle of resource declarations.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use stackforge_common::constants::SSM_PARAMETER_VALUE_TYPE;
use stackforge_common::error::{Result, StackforgeError};
use stackforge_common::types::{LogicalId, ParameterKey, StackName};

use crate::asset::FileAsset;
use crate::intrinsics;
use crate::parameters::ParameterRef;
use crate::template::{Output, Resource, Template, TemplateParameter};

/// A stack under construction.
///
/// Once handed to [`App::add_stack`](crate::App::add_stack) it is frozen.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    name: StackName,
    template: Template,
    published: BTreeMap<ParameterKey, LogicalId>,
    consumed: BTreeMap<ParameterKey, (ParameterRef, LogicalId)>,
    assets: Vec<FileAsset>,
}

impl Stack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new(name: StackName) -> Self {
        Self {
            name,
            template: Template::new(),
            published: BTreeMap::new(),
            consumed: BTreeMap::new(),
            assets: Vec::new(),
        }
    }

    /// Sets the template description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.template.description = Some(description.into());
        self
    }

    /// The stack name.
    #[must_use]
    pub const fn name(&self) -> &StackName {
        &self.name
    }

    /// The template declared so far.
    #[must_use]
    pub const fn template(&self) -> &Template {
        &self.template
    }

    /// Declares a resource under a construct id such as `CodePipeline` or
    /// `artifacts-bucket`. The id is camel-cased into a logical ID.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` if the id is unusable or already taken.
    pub fn add_resource(&mut self, id: &str, resource: Resource) -> Result<LogicalId> {
        let logical_id = LogicalId::from_path(id)?;
        self.template.add_resource(logical_id.clone(), resource)?;
        Ok(logical_id)
    }

    /// Declares an output.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` if the id is unusable or already taken.
    pub fn add_output(&mut self, id: &str, value: Value, description: &str) -> Result<LogicalId> {
        let logical_id = LogicalId::from_path(id)?;
        self.template
            .add_output(logical_id.clone(), Output::new(value, description))?;
        Ok(logical_id)
    }

    /// Declares a deploy-time template parameter and returns a `Ref` to it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` if the id is unusable or already taken.
    pub fn add_parameter(&mut self, id: &str, parameter: TemplateParameter) -> Result<Value> {
        let logical_id = LogicalId::from_path(id)?;
        self.template.add_parameter(logical_id.clone(), parameter)?;
        Ok(intrinsics::reference(&logical_id))
    }

    /// Writes `value` to the parameter namespace under `key`.
    ///
    /// # Errors
    ///
    /// Returns `ParameterConflict` if this stack already publishes `key`, or
    /// an identifier error if `id` is unusable.
    pub fn publish_parameter(
        &mut self,
        id: &str,
        key: ParameterKey,
        value: Value,
        description: &str,
    ) -> Result<ParameterRef> {
        if self.published.contains_key(&key) {
            return Err(StackforgeError::ParameterConflict {
                key: key.to_string(),
                owner: self.name.to_string(),
                requested_by: self.name.to_string(),
            });
        }
        let resource = Resource::new(
            "AWS::SSM::Parameter",
            json!({
                "Type": "String",
                "Name": key.as_str(),
                "Value": value,
                "Description": description,
            }),
        );
        let logical_id = self.add_resource(id, resource)?;
        tracing::debug!(stack = %self.name, key = %key, "publishing parameter");
        let _ = self.published.insert(key.clone(), logical_id);
        Ok(ParameterRef::new(key, self.name.clone()))
    }

    /// Reads a published parameter and returns an expression for its value.
    ///
    /// The value is resolved at deploy time through a template parameter of
    /// type `AWS::SSM::Parameter::Value<String>`. Reading the same key twice
    /// reuses the first template parameter.
    ///
    /// # Errors
    ///
    /// Returns an identifier error if `id` is unusable or already taken.
    pub fn consume_parameter(&mut self, id: &str, param: &ParameterRef) -> Result<Value> {
        if let Some((_, logical_id)) = self.consumed.get(param.key()) {
            return Ok(intrinsics::reference(logical_id));
        }
        let logical_id = LogicalId::from_path(id)?;
        self.template.add_parameter(
            logical_id.clone(),
            TemplateParameter::new(SSM_PARAMETER_VALUE_TYPE).with_default(param.key().as_str()),
        )?;
        tracing::debug!(stack = %self.name, key = %param.key(), "reading parameter");
        let reference = intrinsics::reference(&logical_id);
        let _ = self
            .consumed
            .insert(param.key().clone(), (param.clone(), logical_id));
        Ok(reference)
    }

    /// Registers a file asset used by this stack.
    pub fn add_asset(&mut self, asset: FileAsset) {
        if !self.assets.contains(&asset) {
            self.assets.push(asset);
        }
    }

    /// Keys this stack writes.
    pub fn published(&self) -> impl Iterator<Item = &ParameterKey> {
        self.published.keys()
    }

    /// Handles of the parameters this stack reads.
    pub fn consumed(&self) -> impl Iterator<Item = &ParameterRef> {
        self.consumed.values().map(|(param, _)| param)
    }

    /// File assets this stack references.
    #[must_use]
    pub fn assets(&self) -> &[FileAsset] {
        &self.assets
    }

    pub(crate) fn into_template(self) -> Template {
        self.template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_stack(name: &str) -> Stack {
        Stack::new(StackName::new(name).expect("valid name"))
    }

    #[test]
    fn add_resource_camel_cases_construct_id() {
        let mut stack = new_stack("s");
        let id = stack
            .add_resource("artifacts-bucket", Resource::new("AWS::S3::Bucket", json!({})))
            .expect("add");
        assert_eq!(id.as_str(), "ArtifactsBucket");
    }

    #[test]
    fn publish_declares_ssm_parameter() {
        let mut stack = new_stack("app-code");
        let param = stack
            .publish_parameter(
                "RepositoryName",
                ParameterKey::namespaced("app", "repository"),
                json!("app"),
                "Repository Name",
            )
            .expect("publish");

        assert_eq!(param.key().as_str(), "app-repository");
        assert_eq!(param.producer().as_str(), "app-code");
        let resource = stack.template().resource("RepositoryName").expect("resource");
        assert_eq!(resource.resource_type, "AWS::SSM::Parameter");
        assert_eq!(resource.properties["Name"], json!("app-repository"));
        assert_eq!(resource.properties["Value"], json!("app"));
        assert_eq!(stack.published().count(), 1);
    }

    #[test]
    fn publishing_same_key_twice_fails() {
        let mut stack = new_stack("app-build");
        let key = ParameterKey::namespaced("app", "codebuild");
        let _ = stack
            .publish_parameter("First", key.clone(), json!("a"), "d")
            .expect("first");
        let err = stack
            .publish_parameter("Second", key, json!("b"), "d")
            .unwrap_err();
        assert!(matches!(err, StackforgeError::ParameterConflict { .. }));
    }

    #[test]
    fn consume_declares_ssm_typed_template_parameter() {
        let mut producer = new_stack("app-code");
        let param = producer
            .publish_parameter(
                "RepositoryName",
                ParameterKey::namespaced("app", "repository"),
                json!("app"),
                "d",
            )
            .expect("publish");

        let mut consumer = new_stack("app-pipeline");
        let value = consumer
            .consume_parameter("repository-name", &param)
            .expect("consume");
        assert_eq!(value, json!({ "Ref": "RepositoryName" }));

        let template = consumer.template();
        let (_, declared) = template.parameters.iter().next().expect("parameter");
        assert_eq!(declared.parameter_type, "AWS::SSM::Parameter::Value<String>");
        assert_eq!(declared.default.as_deref(), Some("app-repository"));
        assert_eq!(consumer.consumed().count(), 1);
    }

    #[test]
    fn consuming_same_key_twice_reuses_parameter() {
        let mut producer = new_stack("app-build");
        let param = producer
            .publish_parameter(
                "ProjectName",
                ParameterKey::namespaced("app", "codebuild"),
                json!("p"),
                "d",
            )
            .expect("publish");

        let mut consumer = new_stack("app-pipeline");
        let first = consumer.consume_parameter("project-a", &param).expect("first");
        let second = consumer.consume_parameter("project-b", &param).expect("second");
        assert_eq!(first, second);
        assert_eq!(consumer.template().parameters.len(), 1);
    }
}
