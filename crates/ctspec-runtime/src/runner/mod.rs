//! Container and compose runners.
//!
//! Starting containers is delegated to the `docker` CLI; the core only
//! needs a [`Runner`] to expose a handle, start, and finalize.

mod command;
pub mod compose;
pub mod docker;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use ctspec_common::config::{RunConfig, RunOptions};
use ctspec_common::error::Result;
use ctspec_common::types::{ContainerId, RunnerHandle};

pub use self::compose::ComposeRunner;
pub use self::docker::DockerRunner;

/// Starts and tears down what a test run targets.
pub trait Runner {
    /// Returns the handle engines are built from. It is unbound until
    /// [`start`](Self::start) succeeds.
    fn handle(&self) -> &RunnerHandle;

    /// Starts the target and binds its container to the handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be started.
    fn start(&mut self) -> Result<ContainerId>;

    /// Stops and removes whatever [`start`](Self::start) created.
    ///
    /// Calling this without a successful start is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if cleanup fails.
    fn finalize(&mut self) -> Result<()>;
}

type BuildFn = dyn Fn(&RunConfig, &RunOptions) -> Result<Box<dyn Runner>> + Send + Sync;

/// Named constructor for a kind of runner.
///
/// Classes compare by name.
#[derive(Clone)]
pub struct RunnerClass {
    name: Cow<'static, str>,
    build: Arc<BuildFn>,
}

impl RunnerClass {
    /// Creates a runner class from a constructor.
    #[must_use]
    pub fn new<F>(name: impl Into<Cow<'static, str>>, build: F) -> Self
    where
        F: Fn(&RunConfig, &RunOptions) -> Result<Box<dyn Runner>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            build: Arc::new(build),
        }
    }

    /// The built-in single-container runner.
    #[must_use]
    pub fn docker() -> Self {
        Self::new(ctspec_common::constants::DOCKER_RUNNER, |config, options| {
            Ok(Box::new(DockerRunner::new(config, options)?))
        })
    }

    /// The built-in compose runner.
    #[must_use]
    pub fn compose() -> Self {
        Self::new(ctspec_common::constants::COMPOSE_RUNNER, |config, options| {
            Ok(Box::new(ComposeRunner::new(config, options)?))
        })
    }

    /// Returns the class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builds a runner for `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are invalid for this runner.
    pub fn build(&self, config: &RunConfig, options: &RunOptions) -> Result<Box<dyn Runner>> {
        (self.build)(config, options)
    }
}

impl PartialEq for RunnerClass {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for RunnerClass {}

impl fmt::Debug for RunnerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerClass")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
