//! The engine capability contract and engine factories.

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ctspec_common::config::RunConfig;
use ctspec_common::types::RunnerHandle;

/// Lifecycle phases dispatched to every engine, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before the container is started.
    BeforeRunning,
    /// The container is started and addressable.
    WhenContainerReady,
    /// The container is running and ready for assertions.
    WhenRunning,
    /// Teardown, whether or not the assertions passed.
    Restore,
}

impl Phase {
    /// All phases in the order a run invokes them.
    pub const ALL: [Self; 4] = [
        Self::BeforeRunning,
        Self::WhenContainerReady,
        Self::WhenRunning,
        Self::Restore,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeforeRunning => write!(f, "before_running"),
            Self::WhenContainerReady => write!(f, "when_container_ready"),
            Self::WhenRunning => write!(f, "when_running"),
            Self::Restore => write!(f, "restore"),
        }
    }
}

/// Arguments forwarded verbatim to every engine in a phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseArgs(Vec<serde_json::Value>);

impl PhaseArgs {
    /// Creates an empty argument list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an argument.
    #[must_use]
    pub fn with(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.0.push(value.into());
        self
    }

    /// Returns the argument at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&serde_json::Value> {
        self.0.get(index)
    }

    /// Returns the number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the arguments in order.
    pub fn iter(&self) -> impl Iterator<Item = &serde_json::Value> {
        self.0.iter()
    }
}

impl FromIterator<serde_json::Value> for PhaseArgs {
    fn from_iter<I: IntoIterator<Item = serde_json::Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A pluggable assertion backend driven through a container run.
///
/// Errors are returned as-is to whoever drives the phase; the engine list
/// does not wrap them.
pub trait Engine {
    /// Prepares expectations before the container starts.
    ///
    /// # Errors
    ///
    /// Any error aborts the remaining dispatch.
    fn before_running(&mut self, args: &PhaseArgs) -> anyhow::Result<()>;

    /// Called once the runner handle addresses a started container.
    ///
    /// # Errors
    ///
    /// Any error aborts the remaining dispatch.
    fn when_container_ready(&mut self, args: &PhaseArgs) -> anyhow::Result<()>;

    /// Called once the container is running and ready for assertions.
    ///
    /// # Errors
    ///
    /// Any error aborts the remaining dispatch.
    fn when_running(&mut self, args: &PhaseArgs) -> anyhow::Result<()>;

    /// Returns shared state to what it was before the run.
    ///
    /// # Errors
    ///
    /// Any error aborts the remaining dispatch.
    fn restore(&mut self, args: &PhaseArgs) -> anyhow::Result<()>;
}

/// Engines constructible from a runner handle and the run settings.
pub trait FromRunner {
    /// Builds the engine for the run `runner` addresses.
    fn from_runner(runner: &RunnerHandle, config: &RunConfig) -> Self;
}

type BuildFn = dyn Fn(&RunnerHandle, &RunConfig) -> Box<dyn Engine> + Send + Sync;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum FactoryId {
    Type(TypeId),
    Keyed(TypeId, String),
    Closure(u64),
}

/// Short name of `E`: the last path segment, without generic arguments.
fn short_type_name<E: ?Sized>() -> &'static str {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Constructor for one kind of engine.
///
/// Factories compare by identity: [`of`](Self::of) is keyed by the engine
/// type, so two calls for the same type are equal; [`keyed`](Self::keyed)
/// by engine type and key; each [`from_fn`](Self::from_fn) call yields a
/// new identity shared only by its clones.
#[derive(Clone)]
pub struct EngineFactory {
    id: FactoryId,
    name: Cow<'static, str>,
    build: Arc<BuildFn>,
}

impl EngineFactory {
    /// Factory building `E` through [`FromRunner`].
    #[must_use]
    pub fn of<E>() -> Self
    where
        E: Engine + FromRunner + 'static,
    {
        Self {
            id: FactoryId::Type(TypeId::of::<E>()),
            name: Cow::Borrowed(short_type_name::<E>()),
            build: Arc::new(|runner: &RunnerHandle, config: &RunConfig| -> Box<dyn Engine> {
                Box::new(E::from_runner(runner, config))
            }),
        }
    }

    /// Factory building `E` with a closure, identified by `E` and `key`.
    ///
    /// Two keyed factories for the same type and key are equal, so
    /// registering a parameterized engine twice dedupes.
    #[must_use]
    pub fn keyed<E, F>(key: impl Into<String>, build: F) -> Self
    where
        E: Engine + 'static,
        F: Fn(&RunnerHandle, &RunConfig) -> E + Send + Sync + 'static,
    {
        let key = key.into();
        Self {
            id: FactoryId::Keyed(TypeId::of::<E>(), key.clone()),
            name: Cow::Owned(format!("{}[{key}]", short_type_name::<E>())),
            build: Arc::new(move |runner: &RunnerHandle, config: &RunConfig| -> Box<dyn Engine> {
                Box::new(build(runner, config))
            }),
        }
    }

    /// Factory from a closure, with a fresh identity.
    #[must_use]
    pub fn from_fn<F>(name: impl Into<Cow<'static, str>>, build: F) -> Self
    where
        F: Fn(&RunnerHandle, &RunConfig) -> Box<dyn Engine> + Send + Sync + 'static,
    {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self {
            id: FactoryId::Closure(NEXT.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            build: Arc::new(build),
        }
    }

    /// Returns the engine name used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builds an engine bound to `runner` with the run settings.
    #[must_use]
    pub fn build(&self, runner: &RunnerHandle, config: &RunConfig) -> Box<dyn Engine> {
        (self.build)(runner, config)
    }
}

impl PartialEq for EngineFactory {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EngineFactory {}

impl fmt::Debug for EngineFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineFactory")
            .field("name", &self.name)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
