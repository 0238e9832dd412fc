//! Test-run driver sequencing runners and engine phases.

use ctspec_common::config::RunOptions;
use ctspec_common::types::{RunnerHandle, RunnerKind};

use crate::engine::PhaseArgs;
use crate::engine_list::EngineList;
use crate::registry::{Configuration, ConfigurationRegistry};
use crate::runner::Runner;

/// One container run with its engines.
///
/// [`execute`](Self::execute) runs:
///
/// 1. `before_running` on every engine,
/// 2. the runner's `start`,
/// 3. `when_container_ready`, then `when_running`,
/// 4. the caller's assertion body,
/// 5. `restore` on every engine and the runner's `finalize`, even if an
///    earlier step or another engine's `restore` failed.
///
/// The first error is returned; later cleanup errors are logged.
#[derive(Debug, Clone)]
pub struct TestRun {
    config: Configuration,
    kind: RunnerKind,
    options: RunOptions,
}

impl TestRun {
    /// A run of a single container with the configuration's container
    /// runner.
    #[must_use]
    pub const fn container(config: Configuration, options: RunOptions) -> Self {
        Self {
            config,
            kind: RunnerKind::Container,
            options,
        }
    }

    /// A run of a compose stack with the configuration's compose runner.
    #[must_use]
    pub const fn compose(config: Configuration, options: RunOptions) -> Self {
        Self {
            config,
            kind: RunnerKind::Compose,
            options,
        }
    }

    /// A run using a snapshot of the process-wide registry.
    #[must_use]
    pub fn from_registry(kind: RunnerKind, options: RunOptions) -> Self {
        Self {
            config: ConfigurationRegistry::snapshot(),
            kind,
            options,
        }
    }

    /// Returns the configuration this run uses.
    #[must_use]
    pub const fn config(&self) -> &Configuration {
        &self.config
    }

    /// Runs the container, the engines, and `body`.
    ///
    /// # Errors
    ///
    /// Returns an error if the runner cannot be built, no engine is
    /// registered, or any phase, the body, or cleanup fails.
    pub fn execute<F>(&self, args: &PhaseArgs, body: F) -> anyhow::Result<()>
    where
        F: FnOnce(&RunnerHandle) -> anyhow::Result<()>,
    {
        let class = match self.kind {
            RunnerKind::Container => self.config.container_runner(),
            RunnerKind::Compose => self.config.compose_runner(),
        };
        let mut runner = class.build(self.config.run_config(), &self.options)?;
        let mut engines = EngineList::new(&self.config, runner.handle())?;
        tracing::info!(runner = class.name(), target = runner.handle().target(), "test run starting");

        let outcome = drive(&mut engines, runner.as_mut(), args, body);
        let restored = engines.restore_all(args);
        let finalized = runner.finalize().map_err(anyhow::Error::from);

        let mut first = None;
        for (step, result) in [("run", outcome), ("restore", restored), ("finalize", finalized)] {
            if let Err(e) = result {
                if first.is_none() {
                    first = Some(e);
                } else {
                    tracing::warn!(step, error = %e, "additional failure during teardown");
                }
            }
        }
        first.map_or(Ok(()), Err)
    }
}

fn drive<F>(
    engines: &mut EngineList,
    runner: &mut dyn Runner,
    args: &PhaseArgs,
    body: F,
) -> anyhow::Result<()>
where
    F: FnOnce(&RunnerHandle) -> anyhow::Result<()>,
{
    engines.before_running(args)?;
    let id = runner.start()?;
    tracing::debug!(container = %id, "container ready");
    engines.when_container_ready(args)?;
    engines.when_running(args)?;
    body(runner.handle())
}
