//! CloudFormation template model.
//!
//! Maps are ordered by logical ID so repeated synthesis of the same
//! declaration produces byte-identical templates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use stackforge_common::constants::TEMPLATE_FORMAT_VERSION;
use stackforge_common::error::{Result, StackforgeError};
use stackforge_common::types::LogicalId;

/// A complete CloudFormation template for one stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    /// Template format version.
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    /// Human-readable stack description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Deploy-time inputs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<LogicalId, TemplateParameter>,
    /// Declared resources.
    #[serde(default)]
    pub resources: BTreeMap<LogicalId, Resource>,
    /// Values exposed after deployment.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<LogicalId, Output>,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description: None,
            parameters: BTreeMap::new(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }
}

impl Template {
    /// Creates an empty template.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` if the logical ID is already used by a
    /// resource or parameter of this template.
    pub fn add_resource(&mut self, id: LogicalId, resource: Resource) -> Result<()> {
        self.ensure_free(&id)?;
        tracing::debug!(id = %id, kind = %resource.resource_type, "declaring resource");
        let _ = self.resources.insert(id, resource);
        Ok(())
    }

    /// Adds a deploy-time parameter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` if the logical ID is already in use.
    pub fn add_parameter(&mut self, id: LogicalId, parameter: TemplateParameter) -> Result<()> {
        self.ensure_free(&id)?;
        let _ = self.parameters.insert(id, parameter);
        Ok(())
    }

    /// Adds an output.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` if an output with this ID already exists.
    pub fn add_output(&mut self, id: LogicalId, output: Output) -> Result<()> {
        if self.outputs.contains_key(&id) {
            return Err(taken(&id));
        }
        let _ = self.outputs.insert(id, output);
        Ok(())
    }

    /// Looks up a resource by logical ID.
    #[must_use]
    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|(k, _)| k.as_str() == id).map(|(_, r)| r)
    }

    /// Iterates over resources of a given CloudFormation type.
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a LogicalId, &'a Resource)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }

    /// Renders the template as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if a property value cannot be serialized.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn ensure_free(&self, id: &LogicalId) -> Result<()> {
        if self.resources.contains_key(id) || self.parameters.contains_key(id) {
            return Err(taken(id));
        }
        Ok(())
    }
}

fn taken(id: &LogicalId) -> StackforgeError {
    StackforgeError::InvalidIdentifier {
        kind: "logical ID",
        value: id.to_string(),
        reason: "already declared in this template",
    }
}

/// A single resource declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    /// CloudFormation resource type, e.g. `AWS::S3::Bucket`.
    #[serde(rename = "Type")]
    pub resource_type: String,
    /// Resource properties.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub properties: Value,
    /// Explicit ordering constraints inside the template.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<LogicalId>,
    /// What happens to the physical resource on stack deletion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,
    /// What happens to the old physical resource on replacement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<DeletionPolicy>,
}

impl Resource {
    /// Creates a resource of the given type.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, properties: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties,
            depends_on: Vec::new(),
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    /// Adds an explicit `DependsOn` entry.
    #[must_use]
    pub fn depends_on(mut self, id: &LogicalId) -> Self {
        if !self.depends_on.contains(id) {
            self.depends_on.push(id.clone());
        }
        self
    }

    /// Keeps the physical resource when the stack is deleted or the
    /// resource is replaced.
    #[must_use]
    pub const fn retain(mut self) -> Self {
        self.deletion_policy = Some(DeletionPolicy::Retain);
        self.update_replace_policy = Some(DeletionPolicy::Retain);
        self
    }

    /// Reads a top-level property.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// Deletion and replacement behaviour. Resources without one are deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionPolicy {
    /// Keep the physical resource.
    Retain,
}

/// A deploy-time template parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateParameter {
    /// Parameter type, e.g. `String` or `AWS::SSM::Parameter::Value<String>`.
    #[serde(rename = "Type")]
    pub parameter_type: String,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Description shown in the console.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TemplateParameter {
    /// Creates a parameter of the given type with no default.
    #[must_use]
    pub fn new(parameter_type: impl Into<String>) -> Self {
        Self {
            parameter_type: parameter_type.into(),
            default: None,
            description: None,
        }
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A stack output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    /// Description shown in the console.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Output value expression.
    pub value: Value,
}

impl Output {
    /// Creates an output.
    #[must_use]
    pub fn new(value: Value, description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            value,
        }
    }
}
