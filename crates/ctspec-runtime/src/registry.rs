//! Engine and runner registration.
//!
//! [`Configuration`] is the registry as a plain value: tests and drivers
//! can build one and pass it around explicitly. [`ConfigurationRegistry`]
//! is the process-wide instance extensions register themselves into. It is
//! created lazily with defaults on first access and discarded by
//! [`ConfigurationRegistry::reset`].
//!
//! Access is serialized by a mutex, but nothing coordinates a sequence of
//! calls: suites running tests in parallel must serialize runs that touch
//! the registry themselves.

use std::sync::{Mutex, PoisonError};

use ctspec_common::config::RunConfig;

use crate::engine::EngineFactory;
use crate::runner::RunnerClass;

/// Registered engines and runner classes.
#[derive(Debug, Clone)]
pub struct Configuration {
    engines: Vec<EngineFactory>,
    container_runner: RunnerClass,
    compose_runner: RunnerClass,
    run_config: RunConfig,
}

impl Configuration {
    /// Creates a configuration with no engines and the built-in runners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            engines: Vec::new(),
            container_runner: RunnerClass::docker(),
            compose_runner: RunnerClass::compose(),
            run_config: RunConfig::default(),
        }
    }

    /// Registers an engine factory. Registering the same factory again has
    /// no effect; registration order is kept.
    pub fn add_engine(&mut self, factory: EngineFactory) {
        if self.engines.contains(&factory) {
            tracing::debug!(engine = factory.name(), "engine already registered");
            return;
        }
        tracing::debug!(engine = factory.name(), "registering engine");
        self.engines.push(factory);
    }

    /// Returns the registered engine factories in registration order.
    #[must_use]
    pub fn engines(&self) -> &[EngineFactory] {
        &self.engines
    }

    /// Returns the live engine list for direct manipulation.
    pub const fn engines_mut(&mut self) -> &mut Vec<EngineFactory> {
        &mut self.engines
    }

    /// Returns the class used to run single containers.
    #[must_use]
    pub const fn container_runner(&self) -> &RunnerClass {
        &self.container_runner
    }

    /// Replaces the class used to run single containers.
    pub fn set_container_runner(&mut self, runner: RunnerClass) {
        tracing::debug!(runner = runner.name(), "container runner set");
        self.container_runner = runner;
    }

    /// Returns the class used to run compose stacks.
    #[must_use]
    pub const fn compose_runner(&self) -> &RunnerClass {
        &self.compose_runner
    }

    /// Replaces the class used to run compose stacks.
    pub fn set_compose_runner(&mut self, runner: RunnerClass) {
        tracing::debug!(runner = runner.name(), "compose runner set");
        self.compose_runner = runner;
    }

    /// Returns the settings handed to runners.
    #[must_use]
    pub const fn run_config(&self) -> &RunConfig {
        &self.run_config
    }

    /// Replaces the settings handed to runners.
    pub fn set_run_config(&mut self, config: RunConfig) {
        self.run_config = config;
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: Mutex<Option<Configuration>> = Mutex::new(None);

/// The process-wide [`Configuration`].
///
/// Closures passed to the `with_*` functions run while the registry is
/// locked and must not call back into it.
#[derive(Debug)]
pub struct ConfigurationRegistry;

impl ConfigurationRegistry {
    fn with<R>(f: impl FnOnce(&mut Configuration) -> R) -> R {
        let mut global = GLOBAL.lock().unwrap_or_else(PoisonError::into_inner);
        f(global.get_or_insert_with(|| {
            tracing::debug!("creating process-wide configuration");
            Configuration::new()
        }))
    }

    /// Registers an engine factory, ignoring duplicates.
    pub fn add_engine(factory: EngineFactory) {
        Self::with(|config| config.add_engine(factory));
    }

    /// Returns a copy of the registered engine factories.
    #[must_use]
    pub fn engines() -> Vec<EngineFactory> {
        Self::with(|config| config.engines().to_vec())
    }

    /// Runs `f` on the live engine list.
    pub fn with_engines<R>(f: impl FnOnce(&mut Vec<EngineFactory>) -> R) -> R {
        Self::with(|config| f(config.engines_mut()))
    }

    /// Swaps in `engines`, returning the previous list.
    pub fn replace_engines(engines: Vec<EngineFactory>) -> Vec<EngineFactory> {
        Self::with_engines(|current| std::mem::replace(current, engines))
    }

    /// Returns the class used to run single containers.
    #[must_use]
    pub fn container_runner() -> RunnerClass {
        Self::with(|config| config.container_runner().clone())
    }

    /// Replaces the class used to run single containers.
    pub fn set_container_runner(runner: RunnerClass) {
        Self::with(|config| config.set_container_runner(runner));
    }

    /// Returns the class used to run compose stacks.
    #[must_use]
    pub fn compose_runner() -> RunnerClass {
        Self::with(|config| config.compose_runner().clone())
    }

    /// Replaces the class used to run compose stacks.
    pub fn set_compose_runner(runner: RunnerClass) {
        Self::with(|config| config.set_compose_runner(runner));
    }

    /// Returns the settings handed to runners.
    #[must_use]
    pub fn run_config() -> RunConfig {
        Self::with(|config| config.run_config().clone())
    }

    /// Replaces the settings handed to runners.
    pub fn set_run_config(run_config: RunConfig) {
        Self::with(|config| config.set_run_config(run_config));
    }

    /// Returns a copy of the whole configuration.
    #[must_use]
    pub fn snapshot() -> Configuration {
        Self::with(|config| config.clone())
    }

    /// Returns whether the configuration currently exists.
    #[must_use]
    pub fn is_initialized() -> bool {
        GLOBAL.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Discards the configuration; the next access recreates defaults.
    ///
    /// Meant for isolating test scenarios.
    pub fn reset() {
        tracing::debug!("resetting process-wide configuration");
        *GLOBAL.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Mutex, MutexGuard, PoisonError};

    use super::*;
    use crate::engine::{Engine, PhaseArgs};

    static SERIAL: Mutex<()> = Mutex::new(());

    /// Serializes tests touching the process-wide registry and resets it.
    pub(crate) fn isolated() -> MutexGuard<'static, ()> {
        let guard = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        ConfigurationRegistry::reset();
        guard
    }

    struct Inert;

    impl Engine for Inert {
        fn before_running(&mut self, _args: &PhaseArgs) -> anyhow::Result<()> {
            Ok(())
        }
        fn when_container_ready(&mut self, _args: &PhaseArgs) -> anyhow::Result<()> {
            Ok(())
        }
        fn when_running(&mut self, _args: &PhaseArgs) -> anyhow::Result<()> {
            Ok(())
        }
        fn restore(&mut self, _args: &PhaseArgs) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn inert(name: &'static str) -> EngineFactory {
        EngineFactory::from_fn(name, |_, _| Box::new(Inert))
    }

    #[test]
    fn add_engine_is_idempotent() {
        let mut config = Configuration::new();
        let factory = inert("a");
        config.add_engine(factory.clone());
        config.add_engine(factory.clone());
        assert_eq!(config.engines(), [factory]);
    }

    #[test]
    fn add_engine_keeps_registration_order() {
        let mut config = Configuration::new();
        let (a, b, c) = (inert("a"), inert("b"), inert("c"));
        config.add_engine(a.clone());
        config.add_engine(b.clone());
        config.add_engine(a.clone());
        config.add_engine(c.clone());
        let names: Vec<&str> = config.engines().iter().map(EngineFactory::name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn new_configuration_has_defaults() {
        let config = Configuration::default();
        assert!(config.engines().is_empty());
        assert_eq!(config.container_runner().name(), "docker");
        assert_eq!(config.compose_runner().name(), "compose");
        assert_eq!(config.run_config(), &RunConfig::default());
    }

    #[test]
    fn global_registry_is_lazy() {
        let _serial = isolated();
        assert!(!ConfigurationRegistry::is_initialized());
        assert!(ConfigurationRegistry::engines().is_empty());
        assert!(ConfigurationRegistry::is_initialized());
    }

    #[test]
    fn global_add_engine_is_idempotent() {
        let _serial = isolated();
        let factory = inert("once");
        ConfigurationRegistry::add_engine(factory.clone());
        ConfigurationRegistry::add_engine(factory.clone());
        assert_eq!(ConfigurationRegistry::engines(), vec![factory]);
    }

    #[test]
    fn reset_restores_defaults() {
        let _serial = isolated();
        ConfigurationRegistry::add_engine(inert("x"));
        ConfigurationRegistry::set_container_runner(RunnerClass::compose());
        ConfigurationRegistry::set_compose_runner(RunnerClass::docker());
        ConfigurationRegistry::set_run_config(RunConfig {
            backend: "ssh".into(),
            ..RunConfig::default()
        });

        ConfigurationRegistry::reset();
        assert!(!ConfigurationRegistry::is_initialized());
        assert!(ConfigurationRegistry::engines().is_empty());
        assert_eq!(ConfigurationRegistry::container_runner(), RunnerClass::docker());
        assert_eq!(ConfigurationRegistry::compose_runner(), RunnerClass::compose());
        assert_eq!(ConfigurationRegistry::run_config(), RunConfig::default());
    }

    #[test]
    fn engines_can_be_swapped_out_and_back() {
        let _serial = isolated();
        let kept = inert("kept");
        ConfigurationRegistry::add_engine(kept.clone());

        let saved = ConfigurationRegistry::replace_engines(Vec::new());
        assert!(ConfigurationRegistry::engines().is_empty());
        let _ = ConfigurationRegistry::replace_engines(saved);
        assert_eq!(ConfigurationRegistry::engines(), vec![kept]);
    }

    #[test]
    fn live_engine_list_is_mutable() {
        let _serial = isolated();
        ConfigurationRegistry::add_engine(inert("a"));
        ConfigurationRegistry::add_engine(inert("b"));
        ConfigurationRegistry::with_engines(|list| list.retain(|f| f.name() != "a"));
        let names: Vec<String> = ConfigurationRegistry::engines()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn snapshot_is_detached_from_registry() {
        let _serial = isolated();
        let snapshot = ConfigurationRegistry::snapshot();
        ConfigurationRegistry::add_engine(inert("late"));
        assert!(snapshot.engines().is_empty());
        assert_eq!(ConfigurationRegistry::engines().len(), 1);
    }
}
