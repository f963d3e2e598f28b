//! # stackforge-synth
//!
//! Declaration and synthesis engine for CloudFormation stacks.
//!
//! Handles:
//! - **Template**: Resources, parameters, and outputs of one stack.
//! - **Stack**: A named template plus the parameters it publishes and reads.
//! - **Graph**: Stack dependency graph and topological resolution.
//! - **Pipeline**: Stage/action declarations with artifact chain checks.
//! - **App**: The shared application context that owns every stack.
//! - **Assembly**: The synthesized templates and manifest written to disk.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod app;
pub mod assembly;
pub mod asset;
pub mod graph;
pub mod iam;
pub mod intrinsics;
pub mod parameters;
pub mod pipeline;
pub mod stack;
pub mod template;
pub mod validator;

pub use app::{App, StackId};
pub use assembly::CloudAssembly;
pub use stack::Stack;
