//! System-wide constants and defaults.

/// Guidance appended to the error raised when no engine is registered.
pub const NO_ENGINES_MESSAGE: &str = "

Remember to register the test engine you want to use.

For example, to use the built-in backend engine:

    ConfigurationRegistry::add_engine(EngineFactory::of::<BackendEngine>());

";

/// Name of the built-in single-container runner class.
pub const DOCKER_RUNNER: &str = "docker";

/// Name of the built-in compose runner class.
pub const COMPOSE_RUNNER: &str = "compose";

/// Default container CLI binary.
pub const DEFAULT_DOCKER_BINARY: &str = "docker";

/// Backend the built-in engine installs unless configured otherwise.
pub const DEFAULT_BACKEND: &str = "docker";

/// Backend property holding the target container id.
pub const CONTAINER_PROPERTY: &str = "docker_container";
