//! Engine registration and lifecycle coordination for container test runs.
//!
//! A test-run driver obtains a [`Configuration`](registry::Configuration),
//! builds an [`EngineList`](engine_list::EngineList) bound to a runner
//! handle, and drives the four lifecycle phases on it. The
//! [`TestRun`](harness::TestRun) driver does this around a runner.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod engine;
pub mod engine_list;
pub mod engines;
pub mod harness;
pub mod registry;
pub mod runner;

pub use engine::{Engine, EngineFactory, FromRunner, Phase, PhaseArgs};
pub use engine_list::EngineList;
pub use harness::TestRun;
pub use registry::{Configuration, ConfigurationRegistry};
pub use runner::{Runner, RunnerClass};
