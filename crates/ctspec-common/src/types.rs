//! Domain primitive types used across the ctspec workspace.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::error::{CtspecError, Result};

/// Identifier of a started container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a new container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of runner that produced a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunnerKind {
    /// A single container started from an image.
    Container,
    /// A service container inside a compose stack.
    Compose,
}

impl fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Container => write!(f, "container"),
            Self::Compose => write!(f, "compose"),
        }
    }
}

#[derive(Debug)]
struct HandleInner {
    kind: RunnerKind,
    target: String,
    container: OnceLock<ContainerId>,
}

/// Shared reference to what a runner starts.
///
/// The handle exists before the container does: engines are built from it
/// prior to launch and read the container id once the runner binds it.
/// Clones share the same binding.
#[derive(Debug, Clone)]
pub struct RunnerHandle(Arc<HandleInner>);

impl RunnerHandle {
    /// Creates an unbound handle for `target` (an image or compose service).
    #[must_use]
    pub fn new(kind: RunnerKind, target: impl Into<String>) -> Self {
        Self(Arc::new(HandleInner {
            kind,
            target: target.into(),
            container: OnceLock::new(),
        }))
    }

    /// Returns the runner kind.
    #[must_use]
    pub fn kind(&self) -> RunnerKind {
        self.0.kind
    }

    /// Returns the image or service this handle targets.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.0.target
    }

    /// Returns the container id once the runner has started it.
    #[must_use]
    pub fn container_id(&self) -> Option<&ContainerId> {
        self.0.container.get()
    }

    /// Returns the container id, failing if the runner has not started yet.
    ///
    /// # Errors
    ///
    /// Returns an error if no container is bound to this handle.
    pub fn require_container(&self) -> Result<&ContainerId> {
        self.container_id().ok_or_else(|| CtspecError::Runner {
            message: format!("{} `{}` has no running container yet", self.kind(), self.target()),
        })
    }

    /// Binds the started container to this handle.
    ///
    /// # Errors
    ///
    /// Returns an error if a container was already bound.
    pub fn bind_container(&self, id: ContainerId) -> Result<()> {
        self.0.container.set(id).map_err(|id| CtspecError::Runner {
            message: format!("{} `{}` already bound, refusing {id}", self.kind(), self.target()),
        })
    }

    /// Returns whether two handles refer to the same run.
    #[must_use]
    pub fn same_run(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_starts_unbound() {
        let handle = RunnerHandle::new(RunnerKind::Container, "alpine:3");
        assert!(handle.container_id().is_none());
        assert!(handle.require_container().is_err());
        assert_eq!(handle.target(), "alpine:3");
    }

    #[test]
    fn clones_share_binding() {
        let handle = RunnerHandle::new(RunnerKind::Compose, "web");
        let clone = handle.clone();
        handle.bind_container(ContainerId::new("abc123")).unwrap();
        assert_eq!(clone.container_id().map(ContainerId::as_str), Some("abc123"));
        assert!(clone.same_run(&handle));
    }

    #[test]
    fn second_bind_is_rejected() {
        let handle = RunnerHandle::new(RunnerKind::Container, "alpine:3");
        handle.bind_container(ContainerId::new("first")).unwrap();
        let err = handle.bind_container(ContainerId::new("second")).unwrap_err();
        assert!(err.to_string().contains("already bound"));
        assert_eq!(handle.require_container().unwrap().as_str(), "first");
    }

    #[test]
    fn runner_kind_display() {
        assert_eq!(RunnerKind::Container.to_string(), "container");
        assert_eq!(RunnerKind::Compose.to_string(), "compose");
    }
}
