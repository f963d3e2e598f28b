//! `sfg plan`: Display the stack graph before synthesizing.

use anyhow::Context;
use clap::Args;
use serde_json::{Value, json};

use stackforge_common::config::AppConfig;
use stackforge_synth::App;

use crate::output;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Print the plan as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `plan` command.
///
/// Composes the application, validates the graph, and shows each stack in
/// deployment order with its dependencies and the parameters it publishes
/// and reads. Nothing is written.
///
/// # Errors
///
/// Returns an error if composition or validation fails.
pub fn execute(args: &PlanArgs, config: &AppConfig) -> anyhow::Result<()> {
    let app = super::compose(config)?;
    app.validate().context("stack graph is invalid")?;
    let plan = build_plan(&app)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("{}", output::heading(&format!("Deployment Plan for: {}", config.app_id)));
    println!();
    let stacks = plan["stacks"].as_array().map(Vec::as_slice).unwrap_or_default();
    for stack in stacks {
        println!("  + {}", stack["name"].as_str().unwrap_or_default());
        print_list("after", &stack["dependencies"]);
        print_list("publishes", &stack["publishes"]);
        print_list("reads", &stack["reads"]);
        let resources = stack["resources"].as_u64().unwrap_or_default();
        let bytes = stack["templateBytes"].as_u64().unwrap_or_default();
        println!(
            "      {resources} resource(s), template {}",
            output::template_size(bytes)
        );
    }
    if !app.parameters().is_empty() {
        println!();
        println!("  Parameters:");
        for (key, producer) in app.parameters().iter() {
            println!("    {key} <- {producer}");
        }
    }
    println!();
    println!("  {} stack(s) will be synthesized.", stacks.len());
    Ok(())
}

fn print_list(label: &str, values: &Value) {
    let items: Vec<&str> = values
        .as_array()
        .map(|a| a.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if !items.is_empty() {
        println!("      {label}: {}", items.join(", "));
    }
}

fn build_plan(app: &App) -> anyhow::Result<Value> {
    let edges = app.dependency_edges();
    let mut stacks = Vec::new();
    for name in app.deployment_order()? {
        let stack = app
            .stack_by_name(name.as_str())
            .with_context(|| format!("stack {name} missing from app"))?;
        let dependencies: Vec<String> = edges
            .iter()
            .filter(|(dependent, _)| *dependent == name)
            .map(|(_, dependency)| dependency.to_string())
            .collect();
        let publishes: Vec<String> = stack.published().map(ToString::to_string).collect();
        let reads: Vec<String> = stack
            .consumed()
            .map(|p| format!("{} (from {})", p.key(), p.producer()))
            .collect();
        stacks.push(json!({
            "name": name.as_str(),
            "dependencies": dependencies,
            "publishes": publishes,
            "reads": reads,
            "resources": stack.template().resources.len(),
            "templateBytes": stack.template().to_json()?.len(),
        }));
    }
    let parameters: Vec<Value> = app
        .parameters()
        .iter()
        .map(|(key, producer)| json!({ "key": key.as_str(), "producer": producer.as_str() }))
        .collect();
    Ok(json!({ "stacks": stacks, "parameters": parameters }))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use stackforge_stacks::CicdSoftwarePipeline;

    use super::*;

    #[test]
    fn plan_lists_parameter_flow_in_order() {
        let assets = tempfile::tempdir().expect("tempdir");
        let config = AppConfig {
            app_id: "Orders".into(),
            assets_directory: assets.path().to_path_buf(),
            ..AppConfig::default()
        };
        let mut app = App::new();
        let _ = CicdSoftwarePipeline::compose(&mut app, &config).expect("compose");

        let plan = build_plan(&app).expect("plan");
        let stacks = plan["stacks"].as_array().expect("stacks");
        assert_eq!(stacks.len(), 4);
        assert_eq!(stacks[0]["name"], json!("Orders-code"));
        assert_eq!(stacks[0]["publishes"], json!(["Orders-repository"]));

        let pipeline = stacks
            .iter()
            .find(|s| s["name"] == json!("Orders-pipeline"))
            .expect("pipeline");
        assert_eq!(pipeline["dependencies"], json!(["Orders-build"]));
        assert!(
            pipeline["reads"]
                .as_array()
                .expect("reads")
                .contains(&json!("Orders-repository (from Orders-code)"))
        );
        assert_eq!(
            plan["parameters"][0],
            json!({ "key": "Orders-codebuild", "producer": "Orders-build" })
        );
        assert_eq!(plan["parameters"].as_array().map(Vec::len), Some(4));
    }

    #[test]
    fn empty_app_plans_nothing() {
        let plan = build_plan(&App::new()).expect("plan");
        assert_eq!(plan, json!({ "stacks": [], "parameters": [] }));
    }
}
