//! Batch compute unit: a managed AWS Batch compute environment and job queue.
//!
//! The rest of the graph only sees the stack handle; nothing here assumes
//! which jobs will be submitted to the queue.

use serde_json::{Value, json};

use stackforge_common::config::BatchSettings;
use stackforge_common::error::Result;
use stackforge_common::types::{BatchComputeType, LogicalId, StackName};
use stackforge_synth::iam;
use stackforge_synth::intrinsics::{get_att, reference};
use stackforge_synth::template::{Resource, TemplateParameter};
use stackforge_synth::{App, Stack, StackId};

use super::Unit;

/// Handle returned by [`compose`].
#[derive(Debug, Clone, Copy)]
pub struct BatchHandle {
    stack: StackId,
}

impl Unit for BatchHandle {
    fn stack_id(&self) -> StackId {
        self.stack
    }
}

/// Builds and registers the batch stack.
///
/// Subnets and security groups left empty in `settings` become deploy-time
/// template parameters.
///
/// # Errors
///
/// Returns an error if the stack name is invalid or registration fails.
pub fn compose(
    app: &mut App,
    stack_name: &str,
    namespace: &str,
    settings: &BatchSettings,
) -> Result<BatchHandle> {
    tracing::info!(
        stack = stack_name,
        namespace,
        compute_type = %settings.compute_type,
        "composing batch stack"
    );
    let mut stack = Stack::new(StackName::new(stack_name)?)
        .with_description(format!("Batch compute environment for {namespace}"));

    let subnets = if settings.subnet_ids.is_empty() {
        stack.add_parameter(
            "BatchSubnetIds",
            TemplateParameter::new("List<AWS::EC2::Subnet::Id>")
                .with_description("Subnets for batch compute resources"),
        )?
    } else {
        json!(settings.subnet_ids)
    };
    let security_groups = if settings.security_group_ids.is_empty() {
        stack.add_parameter(
            "BatchSecurityGroupIds",
            TemplateParameter::new("List<AWS::EC2::SecurityGroup::Id>")
                .with_description("Security groups for batch compute resources"),
        )?
    } else {
        json!(settings.security_group_ids)
    };

    let service_role = stack.add_resource(
        "BatchServiceRole",
        iam::service_role_with_managed_policies(
            "batch.amazonaws.com",
            &["service-role/AWSBatchServiceRole"],
        ),
    )?;

    let mut compute_resources = json!({
        "Type": settings.compute_type.as_cfn(),
        "MaxvCpus": settings.max_vcpus,
        "Subnets": subnets,
        "SecurityGroupIds": security_groups,
    });
    if !settings.compute_type.is_fargate() {
        let instance_profile = add_instance_profile(&mut stack)?;
        compute_resources["MinvCpus"] = json!(0);
        compute_resources["InstanceTypes"] = json!(["optimal"]);
        compute_resources["InstanceRole"] = get_att(&instance_profile, "Arn");
        compute_resources["AllocationStrategy"] = json!(allocation_strategy(settings.compute_type));
    }

    let environment = stack.add_resource(
        "ComputeEnvironment",
        Resource::new(
            "AWS::Batch::ComputeEnvironment",
            json!({
                "Type": "MANAGED",
                "State": "ENABLED",
                "ServiceRole": get_att(&service_role, "Arn"),
                "ComputeResources": compute_resources,
            }),
        ),
    )?;
    let queue = stack.add_resource(
        "JobQueue",
        Resource::new(
            "AWS::Batch::JobQueue",
            json!({
                "Priority": 1,
                "State": "ENABLED",
                "ComputeEnvironmentOrder": [
                    { "Order": 1, "ComputeEnvironment": reference(&environment) }
                ],
            }),
        ),
    )?;

    let _ = stack.add_output(
        "ComputeEnvironmentArn",
        reference(&environment),
        "Batch Compute Environment ARN",
    )?;
    let _ = stack.add_output("JobQueueArn", reference(&queue), "Batch Job Queue ARN")?;

    let stack = app.add_stack(stack)?;
    Ok(BatchHandle { stack })
}

fn add_instance_profile(stack: &mut Stack) -> Result<LogicalId> {
    let role = stack.add_resource(
        "BatchInstanceRole",
        iam::service_role_with_managed_policies(
            "ec2.amazonaws.com",
            &["service-role/AmazonEC2ContainerServiceforEC2Role"],
        ),
    )?;
    stack.add_resource(
        "BatchInstanceProfile",
        Resource::new(
            "AWS::IAM::InstanceProfile",
            json!({ "Roles": [reference(&role)] }),
        ),
    )
}

const fn allocation_strategy(compute_type: BatchComputeType) -> &'static str {
    match compute_type {
        BatchComputeType::Spot | BatchComputeType::FargateSpot => "SPOT_CAPACITY_OPTIMIZED",
        BatchComputeType::Ec2 | BatchComputeType::Fargate => "BEST_FIT_PROGRESSIVE",
    }
}

/// Compute resources of the environment, for inspection in tests and plans.
#[must_use]
pub fn compute_resources(stack: &Stack) -> Option<&Value> {
    stack
        .template()
        .resource("ComputeEnvironment")
        .and_then(|r| r.property("ComputeResources"))
}
