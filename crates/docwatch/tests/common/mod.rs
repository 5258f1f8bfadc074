//! Shared test utilities for docwatch integration tests.
//!
//! - `TestHarness` for isolated runs with temp watch/output directories
//! - `MockExtractionService` standing in for the remote extraction stages
//! - `ConfigBuilder` for config JSON without boilerplate

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{MockExtractionService, TestHarness};
