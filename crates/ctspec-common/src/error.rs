//! Unified error types for the ctspec workspace.
//!
//! Engine implementations report their own failures through `anyhow`;
//! everything the core itself can reject is listed here.

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CtspecError {
    /// An engine list was built while no engine was registered.
    #[error("no test engines registered{guidance}")]
    Engine {
        /// Instructions telling the caller how to register an engine.
        guidance: &'static str,
    },

    /// A backend name does not map to any known backend class.
    #[error("unknown backend `{name}`: no backend class named `{class_name}`")]
    BackendLookup {
        /// Name exactly as the caller supplied it.
        name: String,
        /// Class name derived from `name`.
        class_name: String,
    },

    /// A backend instance outlived the class that created it.
    #[error("backend instance of `{class_name}` is detached from its class")]
    BackendDetached {
        /// Name of the class the instance was created from.
        class_name: String,
    },

    /// A guard was asked to restore a value it never saved.
    #[error("backend guard for `{backend}` restored before any save")]
    GuardNotSaved {
        /// Backend identifier of the guard.
        backend: String,
    },

    /// A container or compose runner failed.
    #[error("runner error: {message}")]
    Runner {
        /// Description of the failure.
        message: String,
    },

    /// Spawning an external command failed.
    #[error("I/O error running {command}: {source}")]
    Io {
        /// Program that could not be run.
        command: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CtspecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_carries_guidance() {
        let err = CtspecError::Engine {
            guidance: crate::constants::NO_ENGINES_MESSAGE,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("no test engines registered"));
        assert!(msg.contains("add_engine"));
    }

    #[test]
    fn lookup_error_names_both_forms() {
        let err = CtspecError::BackendLookup {
            name: "docker_swarm".into(),
            class_name: "DockerSwarm".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("docker_swarm"));
        assert!(msg.contains("DockerSwarm"));
    }
}
