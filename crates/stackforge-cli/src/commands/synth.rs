//! `sfg synth`: Write templates and the manifest to the output directory.

use anyhow::Context;
use clap::Args;

use stackforge_common::config::AppConfig;

use crate::output;

/// Arguments for the `synth` command.
#[derive(Args, Debug, Default)]
pub struct SynthArgs {
    /// Only print the output directory.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Executes the `synth` command.
///
/// Composes the four stacks, validates the graph, and writes one template
/// per stack plus `manifest.json`.
///
/// # Errors
///
/// Returns an error if composition, validation, or writing fails.
pub fn execute(args: &SynthArgs, config: &AppConfig) -> anyhow::Result<()> {
    tracing::info!(app_id = %config.app_id, output = %config.output_dir.display(), "synthesizing");
    let assembly = stackforge_stacks::synthesize(config)
        .with_context(|| format!("failed to synthesize {}", config.app_id))?;
    let written = assembly.write_to(&config.output_dir)?;

    if args.quiet {
        println!("{}", config.output_dir.display());
        return Ok(());
    }

    println!("{}", output::heading(&format!("Synthesized {}", config.app_id)));
    for path in &written {
        let bytes = std::fs::metadata(path)
            .with_context(|| format!("failed to stat {}", path.display()))?
            .len();
        println!("  {}  {}", path.display(), output::template_size(bytes));
    }
    println!();
    println!("  {} stack(s) written.", assembly.manifest().stacks.len());
    Ok(())
}
