//! # stackforge-stacks
//!
//! The CI/CD application: four stack units and the orchestrator that wires
//! them together.
//!
//! - [`repository`](units::repository): CodeCommit repository seeded from an assets directory.
//! - [`build`](units::build): CodeBuild project, image registry, and artifact bucket.
//! - [`pipeline`](units::pipeline): Two-stage CodePipeline (Source, Build).
//! - [`batch`](units::batch): Managed AWS Batch compute environment.
//!
//! # Example
//!
//! ```rust,no_run
//! use stackforge_common::config::AppConfig;
//! use stackforge_synth::App;
//! use stackforge_stacks::CicdSoftwarePipeline;
//!
//! let config = AppConfig::default();
//! let mut app = App::with_tags(config.tags.clone());
//! let _pipeline = CicdSoftwarePipeline::compose(&mut app, &config)?;
//! let assembly = app.synth()?;
//! let _ = assembly.write_to(&config.output_dir)?;
//! # Ok::<(), stackforge_common::error::StackforgeError>(())
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod orchestrator;
pub mod units;

pub use orchestrator::{CicdSoftwarePipeline, synthesize};
pub use units::Unit;
