//! Stack units.
//!
//! Each unit builds one stack, registers it with the [`App`], and returns a
//! typed handle. Dependents take those handles as arguments instead of
//! looking names up.

pub mod batch;
pub mod build;
pub mod pipeline;
pub mod repository;

use stackforge_common::error::Result;
use stackforge_synth::{App, StackId};

/// A registered stack unit.
pub trait Unit {
    /// Handle of the unit's stack in its [`App`].
    fn stack_id(&self) -> StackId;

    /// Records that this unit deploys after `dependency`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if either unit belongs to another `App`.
    fn add_dependency(&self, app: &mut App, dependency: &impl Unit) -> Result<()> {
        app.add_dependency(self.stack_id(), dependency.stack_id())
    }
}
