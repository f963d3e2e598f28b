//! Top-level composition of the four stack units.

use stackforge_common::config::AppConfig;
use stackforge_common::error::Result;
use stackforge_synth::{App, CloudAssembly};

use crate::units::Unit;
use crate::units::batch::{self, BatchHandle};
use crate::units::build::{self, BuildHandle};
use crate::units::pipeline::{self, PipelineHandle};
use crate::units::repository::{self, RepositoryHandle};

/// Handles to the four stacks of one CI/CD application.
#[derive(Debug, Clone)]
pub struct CicdSoftwarePipeline {
    /// Source repository stack, `{id}-code`.
    pub code: RepositoryHandle,
    /// Build project stack, `{id}-build`.
    pub build: BuildHandle,
    /// Pipeline stack, `{id}-pipeline`.
    pub pipeline: PipelineHandle,
    /// Batch compute stack, `{id}-batch`.
    pub batch: BatchHandle,
}

impl CicdSoftwarePipeline {
    /// Composes every unit into `app` and records the dependency edges
    /// build→code, pipeline→build, and batch→build.
    ///
    /// The application id doubles as the parameter namespace. Composing twice
    /// with the same configuration into one `App` is a no-op the second time.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a unit; stacks registered before the
    /// failure stay in `app`.
    pub fn compose(app: &mut App, config: &AppConfig) -> Result<Self> {
        let id = config.app_id.as_str();
        tracing::info!(app_id = id, "composing CI/CD application");

        let code = repository::compose(
            app,
            &format!("{id}-code"),
            id,
            &config.assets_directory,
            &config.branch,
        )?;
        let build = build::compose(app, &format!("{id}-build"), id, &config.build)?;
        build.add_dependency(app, &code)?;

        let pipeline = pipeline::compose(
            app,
            &format!("{id}-pipeline"),
            id,
            &code,
            &build,
            &config.branch,
        )?;
        pipeline.add_dependency(app, &build)?;

        let batch = batch::compose(app, &format!("{id}-batch"), id, &config.batch)?;
        batch.add_dependency(app, &build)?;

        Ok(Self {
            code,
            build,
            pipeline,
            batch,
        })
    }
}

/// Composes and synthesizes the application described by `config`.
///
/// # Errors
///
/// Returns any configuration, composition, or validation error.
pub fn synthesize(config: &AppConfig) -> Result<CloudAssembly> {
    config.validate()?;
    let mut app = App::with_tags(config.tags.clone());
    let _ = CicdSoftwarePipeline::compose(&mut app, config)?;
    app.synth()
}
