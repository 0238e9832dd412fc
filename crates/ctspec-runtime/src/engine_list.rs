//! The set of engines taking part in one run.

use std::fmt;

use ctspec_common::error::{CtspecError, Result};
use ctspec_common::types::RunnerHandle;

use crate::engine::{Engine, Phase, PhaseArgs};
use crate::registry::{Configuration, ConfigurationRegistry};

struct Entry {
    name: String,
    engine: Box<dyn Engine>,
}

/// Engines instantiated for one runner, dispatched in registration order.
///
/// The list is fixed at construction. Phases are forwarded to every engine
/// in turn; the first error stops the dispatch and is returned unchanged.
/// Phase ordering is the driver's responsibility and is not checked here.
pub struct EngineList {
    engines: Vec<Entry>,
}

impl EngineList {
    /// Instantiates every engine registered in `config` for `runner`.
    ///
    /// # Errors
    ///
    /// Returns [`CtspecError::Engine`] if no engine is registered.
    pub fn new(config: &Configuration, runner: &RunnerHandle) -> Result<Self> {
        let engines: Vec<Entry> = config
            .engines()
            .iter()
            .map(|factory| Entry {
                name: factory.name().to_string(),
                engine: factory.build(runner, config.run_config()),
            })
            .collect();

        if engines.is_empty() {
            return Err(CtspecError::Engine {
                guidance: ctspec_common::constants::NO_ENGINES_MESSAGE,
            });
        }
        tracing::info!(count = engines.len(), target = runner.target(), "engine list built");
        Ok(Self { engines })
    }

    /// Instantiates the engines of the process-wide registry.
    ///
    /// # Errors
    ///
    /// Returns [`CtspecError::Engine`] if no engine is registered.
    pub fn from_registry(runner: &RunnerHandle) -> Result<Self> {
        Self::new(&ConfigurationRegistry::snapshot(), runner)
    }

    /// Prepares all engines before the container starts.
    ///
    /// # Errors
    ///
    /// Returns the first engine error unchanged.
    pub fn before_running(&mut self, args: &PhaseArgs) -> anyhow::Result<()> {
        self.dispatch(Phase::BeforeRunning, args)
    }

    /// Notifies all engines that the container is started and addressable.
    ///
    /// # Errors
    ///
    /// Returns the first engine error unchanged.
    pub fn when_container_ready(&mut self, args: &PhaseArgs) -> anyhow::Result<()> {
        self.dispatch(Phase::WhenContainerReady, args)
    }

    /// Notifies all engines that the container is running.
    ///
    /// # Errors
    ///
    /// Returns the first engine error unchanged.
    pub fn when_running(&mut self, args: &PhaseArgs) -> anyhow::Result<()> {
        self.dispatch(Phase::WhenRunning, args)
    }

    /// Restores all engines during teardown.
    ///
    /// # Errors
    ///
    /// Returns the first engine error unchanged.
    pub fn restore(&mut self, args: &PhaseArgs) -> anyhow::Result<()> {
        self.dispatch(Phase::Restore, args)
    }

    /// Restores every engine in order, even after failures.
    ///
    /// Unlike [`restore`](Self::restore) this does not stop at the first
    /// error, so one broken engine cannot keep later engines from putting
    /// shared state back. The first error is returned; later ones are
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns the first engine error unchanged.
    pub fn restore_all(&mut self, args: &PhaseArgs) -> anyhow::Result<()> {
        let mut first = None;
        for entry in &mut self.engines {
            tracing::debug!(engine = %entry.name, phase = %Phase::Restore, "dispatching");
            if let Err(e) = entry.engine.restore(args) {
                if first.is_none() {
                    first = Some(e);
                } else {
                    tracing::warn!(engine = %entry.name, error = %e, "restore failed");
                }
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Forwards `phase` to every engine in order.
    ///
    /// # Errors
    ///
    /// Returns the first engine error unchanged.
    pub fn dispatch(&mut self, phase: Phase, args: &PhaseArgs) -> anyhow::Result<()> {
        for entry in &mut self.engines {
            tracing::debug!(engine = %entry.name, %phase, args = args.len(), "dispatching");
            let engine = entry.engine.as_mut();
            match phase {
                Phase::BeforeRunning => engine.before_running(args)?,
                Phase::WhenContainerReady => engine.when_container_ready(args)?,
                Phase::WhenRunning => engine.when_running(args)?,
                Phase::Restore => engine.restore(args)?,
            }
        }
        Ok(())
    }

    /// Returns the number of engines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.engines.len()
    }

    /// Always `false`: construction rejects empty lists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Returns the engine names in dispatch order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.engines.iter().map(|entry| entry.name.as_str())
    }
}

impl fmt::Debug for EngineList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineList")
            .field("engines", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
