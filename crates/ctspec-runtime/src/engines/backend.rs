//! Engine that points the ambient backend at the container under test.
//!
//! Before the run it snapshots whatever backend is in effect (for example
//! a host backend used by the surrounding suite) and empties the slot so
//! the run starts clean. Once the container is
//! ready it installs a backend instance bound to that container, and on
//! teardown it puts the snapshot back so nothing leaks into outer scopes.

use std::collections::BTreeMap;

use ctspec_backend::{BackendIdentifier, BackendInstance, BackendStateGuard};
use ctspec_common::config::RunConfig;
use ctspec_common::constants::CONTAINER_PROPERTY;
use ctspec_common::types::RunnerHandle;

use crate::engine::{Engine, EngineFactory, FromRunner, PhaseArgs};

/// Swaps the ambient backend to the running container for one run.
#[derive(Debug)]
pub struct BackendEngine {
    runner: RunnerHandle,
    guard: BackendStateGuard,
    container_backend: Option<BackendInstance>,
}

impl BackendEngine {
    /// Creates an engine managing the backend named by `backend`.
    #[must_use]
    pub fn new(runner: &RunnerHandle, backend: impl Into<BackendIdentifier>) -> Self {
        Self::with_guard(runner, BackendStateGuard::new(backend))
    }

    /// Creates an engine around an existing guard.
    #[must_use]
    pub fn with_guard(runner: &RunnerHandle, guard: BackendStateGuard) -> Self {
        Self {
            runner: runner.clone(),
            guard,
            container_backend: None,
        }
    }

    /// Factory pinned to `backend`, overriding [`RunConfig::backend`].
    ///
    /// Factories for the same backend name compare equal, so registering
    /// one repeatedly keeps a single entry.
    #[must_use]
    pub fn for_backend(backend: impl Into<String>) -> EngineFactory {
        let backend = backend.into();
        EngineFactory::keyed(backend.clone(), move |runner, _config| {
            Self::new(runner, backend.as_str())
        })
    }

    /// Returns the instance installed for the container, once ready.
    #[must_use]
    pub const fn container_backend(&self) -> Option<&BackendInstance> {
        self.container_backend.as_ref()
    }
}

impl FromRunner for BackendEngine {
    fn from_runner(runner: &RunnerHandle, config: &RunConfig) -> Self {
        Self::new(runner, config.backend.as_str())
    }
}

impl Engine for BackendEngine {
    fn before_running(&mut self, _args: &PhaseArgs) -> anyhow::Result<()> {
        self.guard.save()?;
        self.guard.reset()?;
        Ok(())
    }

    fn when_container_ready(&mut self, _args: &PhaseArgs) -> anyhow::Result<()> {
        let id = self.runner.require_container()?;
        let class = self.guard.backend_class()?;

        let mut properties = BTreeMap::new();
        let _ = properties.insert(
            CONTAINER_PROPERTY.to_string(),
            serde_json::Value::String(id.to_string()),
        );
        let instance = BackendInstance::with_properties(class, properties);

        self.guard.install(instance.clone())?;
        tracing::debug!(backend = class.name(), container = %id, "backend bound to container");
        self.container_backend = Some(instance);
        Ok(())
    }

    fn when_running(&mut self, _args: &PhaseArgs) -> anyhow::Result<()> {
        let Some(instance) = &self.container_backend else {
            anyhow::bail!(
                "backend for `{}` used before the container was ready",
                self.runner.target()
            );
        };
        self.guard.install(instance.clone())?;
        Ok(())
    }

    fn restore(&mut self, _args: &PhaseArgs) -> anyhow::Result<()> {
        self.container_backend = None;
        self.guard.restore()?;
        Ok(())
    }
}
