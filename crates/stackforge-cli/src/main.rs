//! # sfg: stackforge CLI
//!
//! Synthesizes the CI/CD application (repository, build, pipeline, batch)
//! into CloudFormation templates and a cloud assembly manifest.
//! Running `sfg` with no subcommand is the same as `sfg synth`.

#![allow(clippy::print_stdout)]

mod commands;
mod output;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::from_default_env();
    if cli.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    commands::execute(cli)
}
