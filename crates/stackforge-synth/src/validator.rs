//! Static analysis of a composed application before synthesis.
//!
//! Checks for cycles, parameters read without an upstream producer, and
//! empty stacks before any template is emitted.

use stackforge_common::error::{Result, StackforgeError};

use crate::app::App;

/// Validates a composed application for semantic correctness.
///
/// # Checks performed
///
/// 1. Every stack declares at least one resource.
/// 2. The dependency graph is acyclic.
/// 3. Every parameter a stack reads is published by a stack that is
///    upstream of it in the dependency graph.
///
/// # Errors
///
/// Returns an error if any semantic check fails.
pub fn validate(app: &App) -> Result<()> {
    tracing::info!(stacks = app.len(), "validating stack graph");
    check_resources_declared(app)?;
    let _ = app.deployment_order()?;
    check_parameter_flow(app)?;
    Ok(())
}

fn check_resources_declared(app: &App) -> Result<()> {
    for stack in app.stacks() {
        if stack.template().resources.is_empty() {
            return Err(StackforgeError::Config {
                message: format!("stack \"{}\" declares no resources", stack.name()),
            });
        }
    }
    Ok(())
}

fn check_parameter_flow(app: &App) -> Result<()> {
    for stack in app.stacks() {
        for param in stack.consumed() {
            let upstream = app
                .is_upstream(param.producer(), stack.name())
                .unwrap_or(false);
            if !upstream {
                return Err(StackforgeError::UnresolvedParameter {
                    key: param.key().to_string(),
                    stack: stack.name().to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use stackforge_common::types::{ParameterKey, StackName};

    use super::*;
    use crate::stack::Stack;
    use crate::template::Resource;

    fn stack_with_topic(name: &str) -> Stack {
        let mut stack = Stack::new(StackName::new(name).expect("name"));
        let _ = stack
            .add_resource("Topic", Resource::new("AWS::SNS::Topic", json!({})))
            .expect("resource");
        stack
    }

    #[test]
    fn validate_empty_app_succeeds() {
        assert!(validate(&App::new()).is_ok());
    }

    #[test]
    fn validate_empty_stack_fails() {
        let mut app = App::new();
        let _ = app
            .add_stack(Stack::new(StackName::new("empty").expect("name")))
            .expect("add");
        let msg = validate(&app).unwrap_err().to_string();
        assert!(msg.contains("declares no resources"), "got: {msg}");
    }

    #[test]
    fn validate_consumer_without_edge_fails() {
        let mut app = App::new();
        let mut producer = stack_with_topic("producer");
        let param = producer
            .publish_parameter("Name", ParameterKey::namespaced("ns", "x"), json!("v"), "d")
            .expect("publish");
        let _ = app.add_stack(producer).expect("producer");

        let mut consumer = stack_with_topic("consumer");
        let _ = consumer.consume_parameter("x", &param).expect("consume");
        let _ = app.add_stack(consumer).expect("consumer");

        let err = validate(&app).unwrap_err();
        assert!(matches!(err, StackforgeError::UnresolvedParameter { .. }), "got: {err}");
    }

    #[test]
    fn validate_transitive_producer_succeeds() {
        let mut app = App::new();
        let mut first = stack_with_topic("first");
        let param = first
            .publish_parameter("Name", ParameterKey::namespaced("ns", "x"), json!("v"), "d")
            .expect("publish");
        let first = app.add_stack(first).expect("first");
        let middle = app.add_stack(stack_with_topic("middle")).expect("middle");

        let mut last = stack_with_topic("last");
        let _ = last.consume_parameter("x", &param).expect("consume");
        let last = app.add_stack(last).expect("last");

        app.add_dependency(middle, first).expect("edge");
        app.add_dependency(last, middle).expect("edge");
        assert!(validate(&app).is_ok());
    }

    #[test]
    fn validate_cycle_fails() {
        let mut app = App::new();
        let a = app.add_stack(stack_with_topic("a")).expect("a");
        let b = app.add_stack(stack_with_topic("b")).expect("b");
        app.add_dependency(a, b).expect("edge");
        app.add_dependency(b, a).expect("edge");
        let err = validate(&app).unwrap_err();
        assert!(matches!(err, StackforgeError::CyclicDependency { .. }), "got: {err}");
    }
}
