//! `sfg list`: List stack names in deployment order.

use clap::Args;

use stackforge_common::config::AppConfig;

/// Arguments for the `list` command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Also print each stack's direct dependencies.
    #[arg(short, long)]
    pub long: bool,
}

/// Executes the `list` command.
///
/// # Errors
///
/// Returns an error if composition fails or the graph has a cycle.
pub fn execute(args: &ListArgs, config: &AppConfig) -> anyhow::Result<()> {
    let app = super::compose(config)?;
    for name in app.deployment_order()? {
        if !args.long {
            println!("{name}");
            continue;
        }
        let dependencies: Vec<String> = app
            .dependency_edges()
            .into_iter()
            .filter(|(dependent, _)| *dependent == name)
            .map(|(_, dependency)| dependency.to_string())
            .collect();
        if dependencies.is_empty() {
            println!("{name}");
        } else {
            println!("{name}\t<- {}", dependencies.join(", "));
        }
    }
    Ok(())
}
