//! IAM roles, policies, and grants.

use serde_json::{Value, json};

use stackforge_common::error::Result;
use stackforge_common::types::LogicalId;

use crate::intrinsics;
use crate::stack::Stack;
use crate::template::Resource;

/// Actions granted by [`grant_bucket_read_write`].
pub const BUCKET_READ_WRITE_ACTIONS: &[&str] = &[
    "s3:GetObject*",
    "s3:GetBucket*",
    "s3:List*",
    "s3:DeleteObject*",
    "s3:PutObject",
    "s3:PutObjectLegalHold",
    "s3:PutObjectRetention",
    "s3:PutObjectTagging",
    "s3:PutObjectVersionTagging",
    "s3:Abort*",
];

/// One `Allow` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStatement {
    actions: Vec<String>,
    resources: Vec<Value>,
}

impl PolicyStatement {
    /// Allows `actions` on `resources`.
    #[must_use]
    pub fn allow(actions: &[&str], resources: Vec<Value>) -> Self {
        Self {
            actions: actions.iter().map(ToString::to_string).collect(),
            resources,
        }
    }

    fn to_value(&self) -> Value {
        let action = match self.actions.as_slice() {
            [single] => json!(single),
            many => json!(many),
        };
        let resource = match self.resources.as_slice() {
            [single] => single.clone(),
            many => json!(many),
        };
        json!({ "Effect": "Allow", "Action": action, "Resource": resource })
    }
}

/// An ordered list of statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyDocument {
    statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a statement.
    #[must_use]
    pub fn statement(mut self, statement: PolicyStatement) -> Self {
        self.statements.push(statement);
        self
    }

    /// Renders the IAM JSON policy language form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let statements: Vec<Value> = self.statements.iter().map(PolicyStatement::to_value).collect();
        json!({ "Version": "2012-10-17", "Statement": statements })
    }
}

/// A role assumable by an AWS service principal such as `codebuild.amazonaws.com`.
#[must_use]
pub fn service_role(service_principal: &str) -> Resource {
    Resource::new(
        "AWS::IAM::Role",
        json!({
            "AssumeRolePolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "Service": service_principal },
                    "Action": "sts:AssumeRole"
                }]
            }
        }),
    )
}

/// ARN of an AWS managed policy such as `service-role/AWSBatchServiceRole`.
#[must_use]
pub fn managed_policy_arn(name: &str) -> Value {
    intrinsics::join(
        "",
        vec![
            json!("arn:"),
            intrinsics::partition(),
            json!(format!(":iam::aws:policy/{name}")),
        ],
    )
}

/// A service role with AWS managed policies attached.
#[must_use]
pub fn service_role_with_managed_policies(service_principal: &str, policies: &[&str]) -> Resource {
    let mut role = service_role(service_principal);
    let arns: Vec<Value> = policies.iter().map(|name| managed_policy_arn(name)).collect();
    role.properties["ManagedPolicyArns"] = json!(arns);
    role
}

/// Attaches `document` to `role` as a separate `AWS::IAM::Policy` resource.
///
/// The policy is named after its logical ID so it is stable across deploys.
///
/// # Errors
///
/// Returns an error if `id` is not a valid logical ID or is already taken.
pub fn attach_policy(
    stack: &mut Stack,
    id: &str,
    role: &LogicalId,
    document: &PolicyDocument,
) -> Result<LogicalId> {
    let policy_id = LogicalId::from_path(id)?;
    let resource = Resource::new(
        "AWS::IAM::Policy",
        json!({
            "PolicyName": policy_id.as_str(),
            "PolicyDocument": document.to_value(),
            "Roles": [intrinsics::reference(role)],
        }),
    );
    stack.add_resource(id, resource)
}

/// Grants `role` read/write access to the bucket named by `bucket_name`.
///
/// # Errors
///
/// Returns an error if the policy resource cannot be declared.
pub fn grant_bucket_read_write(
    stack: &mut Stack,
    id: &str,
    role: &LogicalId,
    bucket_name: &Value,
) -> Result<LogicalId> {
    tracing::debug!(stack = %stack.name(), role = %role, "granting bucket read/write");
    let document = PolicyDocument::new().statement(PolicyStatement::allow(
        BUCKET_READ_WRITE_ACTIONS,
        vec![
            intrinsics::bucket_arn(bucket_name.clone()),
            intrinsics::bucket_objects_arn(bucket_name.clone()),
        ],
    ));
    attach_policy(stack, id, role, &document)
}

#[cfg(test)]
mod tests {
    use stackforge_common::types::StackName;

    use super::*;

    #[test]
    fn single_action_statement_is_scalar() {
        let doc = PolicyDocument::new().statement(PolicyStatement::allow(
            &["codebuild:StartBuild"],
            vec![json!("*")],
        ));
        let value = doc.to_value();
        assert_eq!(value["Statement"][0]["Action"], json!("codebuild:StartBuild"));
        assert_eq!(value["Statement"][0]["Resource"], json!("*"));
    }

    #[test]
    fn multi_action_statement_is_array() {
        let doc = PolicyDocument::new().statement(PolicyStatement::allow(
            &["a:One", "a:Two"],
            vec![json!("x"), json!("y")],
        ));
        let value = doc.to_value();
        assert_eq!(value["Statement"][0]["Action"], json!(["a:One", "a:Two"]));
        assert_eq!(value["Statement"][0]["Resource"], json!(["x", "y"]));
    }

    #[test]
    fn service_role_trusts_principal() {
        let role = service_role("codepipeline.amazonaws.com");
        let principal = &role.properties["AssumeRolePolicyDocument"]["Statement"][0]["Principal"];
        assert_eq!(principal["Service"], json!("codepipeline.amazonaws.com"));
    }

    #[test]
    fn managed_policies_are_attached_by_arn() {
        let role = service_role_with_managed_policies(
            "batch.amazonaws.com",
            &["service-role/AWSBatchServiceRole"],
        );
        let arns = role.properties["ManagedPolicyArns"].as_array().expect("arns");
        assert_eq!(arns.len(), 1);
        assert_eq!(
            arns[0]["Fn::Join"][1][2],
            json!(":iam::aws:policy/service-role/AWSBatchServiceRole")
        );
    }

    #[test]
    fn grant_read_write_targets_bucket_and_objects() {
        let mut stack = Stack::new(StackName::new("grant-test").expect("name"));
        let role = stack
            .add_resource("Role", service_role("codepipeline.amazonaws.com"))
            .expect("role");
        let policy = grant_bucket_read_write(&mut stack, "RoleBucketPolicy", &role, &json!("bkt"))
            .expect("grant");

        let resource = stack.template().resource(policy.as_str()).expect("policy");
        assert_eq!(resource.resource_type, "AWS::IAM::Policy");
        let statement = &resource.properties["PolicyDocument"]["Statement"][0];
        let actions = statement["Action"].as_array().expect("actions");
        assert!(actions.contains(&json!("s3:PutObject")));
        assert!(actions.contains(&json!("s3:GetObject*")));
        assert_eq!(statement["Resource"].as_array().map(Vec::len), Some(2));
        assert_eq!(resource.properties["Roles"], json!([{ "Ref": "Role" }]));
    }
}
