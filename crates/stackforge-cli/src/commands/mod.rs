//! CLI command definitions and dispatch.

pub mod list;
pub mod plan;
pub mod synth;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use stackforge_common::config::AppConfig;
use stackforge_synth::App;
use stackforge_stacks::CicdSoftwarePipeline;

/// stackforge: CI/CD pipeline stacks for container builds and AWS Batch.
#[derive(Parser, Debug)]
#[command(name = "sfg", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute. Defaults to `synth`.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// YAML configuration file.
    #[arg(long, global = true, env = "STACKFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Application id, also used as the parameter namespace.
    #[arg(long, global = true, env = "STACKFORGE_APP_ID")]
    pub app_id: Option<String>,

    /// Directory committed as the repository's initial content.
    #[arg(long, global = true)]
    pub assets_dir: Option<PathBuf>,

    /// Output directory for templates and the manifest.
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Synthesize templates and the manifest into the output directory.
    Synth(synth::SynthArgs),
    /// Show deployment order, dependencies, and parameter flow.
    Plan(plan::PlanArgs),
    /// List stack names in deployment order.
    List(list::ListArgs),
}

impl Cli {
    /// Builds the effective configuration: defaults, then the config file,
    /// then command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or the result is invalid.
    pub fn load_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => AppConfig::default(),
        };
        if let Some(id) = &self.app_id {
            config.app_id.clone_from(id);
        }
        if let Some(dir) = &self.assets_dir {
            config.assets_directory.clone_from(dir);
        }
        if let Some(dir) = &self.output {
            config.output_dir.clone_from(dir);
        }
        config.validate()?;
        tracing::debug!(app_id = %config.app_id, "effective configuration");
        Ok(config)
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.load_config()?;
    match cli.command.unwrap_or_else(|| Command::Synth(synth::SynthArgs::default())) {
        Command::Synth(args) => synth::execute(&args, &config),
        Command::Plan(args) => plan::execute(&args, &config),
        Command::List(args) => list::execute(&args, &config),
    }
}

/// Composes the application into a fresh `App` without synthesizing it.
fn compose(config: &AppConfig) -> anyhow::Result<App> {
    let mut app = App::with_tags(config.tags.clone());
    let _ = CicdSoftwarePipeline::compose(&mut app, config)
        .with_context(|| format!("failed to compose {}", config.app_id))?;
    Ok(app)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use std::path::Path;

    use super::*;

    #[test]
    fn no_subcommand_parses() {
        let cli = Cli::try_parse_from(["sfg"]).expect("parse");
        assert!(cli.command.is_none());
        assert!(!cli.json_logs);
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from(["sfg", "plan", "--app-id", "Orders", "-o", "out"])
            .expect("parse");
        assert!(matches!(cli.command, Some(Command::Plan(_))));
        assert_eq!(cli.app_id.as_deref(), Some("Orders"));
        assert_eq!(cli.output.as_deref(), Some(Path::new("out")));
    }

    #[test]
    fn overrides_win_over_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stackforge.yaml");
        std::fs::write(&path, "app_id: FromFile\nbranch: release\n").expect("write");

        let cli = Cli::try_parse_from([
            "sfg",
            "--config",
            path.to_str().expect("utf-8 path"),
            "--app-id",
            "FromFlag",
        ])
        .expect("parse");
        let config = cli.load_config().expect("config");
        assert_eq!(config.app_id, "FromFlag");
        assert_eq!(config.branch, "release");
    }

    #[test]
    fn defaults_without_file() {
        let cli = Cli {
            command: None,
            config: None,
            app_id: None,
            assets_dir: None,
            output: None,
            json_logs: false,
        };
        let config = cli.load_config().expect("config");
        assert_eq!(config.app_id, "CICDPipelineAWSBatch");
        assert_eq!(config.output_dir, Path::new("cdk.out"));
    }

    #[test]
    fn empty_app_id_is_rejected() {
        let cli = Cli::try_parse_from(["sfg", "--app-id", " "]).expect("parse");
        assert!(cli.load_config().is_err());
    }
}
