//! Resolution of backend identifiers to backend classes.

use std::fmt;
use std::sync::Arc;

use ctspec_common::error::Result;

use crate::catalog::BackendCatalog;
use crate::class::{BackendClassRef, BackendInstance};

/// The forms a caller may use to name a backend.
#[derive(Debug, Clone)]
pub enum BackendIdentifier {
    /// A backend name such as `docker` or `docker_compose`.
    Name(String),
    /// A backend class.
    Class(BackendClassRef),
    /// An existing backend instance; its class is used.
    Instance(BackendInstance),
}

impl From<&str> for BackendIdentifier {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for BackendIdentifier {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<BackendClassRef> for BackendIdentifier {
    fn from(class: BackendClassRef) -> Self {
        Self::Class(class)
    }
}

impl From<BackendInstance> for BackendIdentifier {
    fn from(instance: BackendInstance) -> Self {
        Self::Instance(instance)
    }
}

impl fmt::Display for BackendIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Class(class) => write!(f, "{}", class.name()),
            Self::Instance(instance) => write!(f, "{} instance", instance.class_name()),
        }
    }
}

/// Resolves identifiers against a catalog.
///
/// Resolution is not cached here; callers that need a stable class
/// memoize the result themselves.
#[derive(Debug, Clone)]
pub struct BackendResolver {
    catalog: Arc<BackendCatalog>,
}

impl BackendResolver {
    /// Creates a resolver over `catalog`.
    #[must_use]
    pub const fn new(catalog: Arc<BackendCatalog>) -> Self {
        Self { catalog }
    }

    /// Returns the catalog names are looked up in.
    #[must_use]
    pub fn catalog(&self) -> &BackendCatalog {
        &self.catalog
    }

    /// Resolves `identifier` to its backend class.
    ///
    /// # Errors
    ///
    /// Returns [`CtspecError::BackendLookup`](ctspec_common::error::CtspecError::BackendLookup)
    /// for unknown names and `BackendDetached` for instances whose class
    /// was dropped.
    pub fn resolve(&self, identifier: &BackendIdentifier) -> Result<BackendClassRef> {
        match identifier {
            BackendIdentifier::Class(class) => Ok(Arc::clone(class)),
            BackendIdentifier::Instance(instance) => instance.class(),
            BackendIdentifier::Name(name) => self.catalog.lookup(name),
        }
    }
}

impl Default for BackendResolver {
    fn default() -> Self {
        Self::new(Arc::clone(BackendCatalog::global()))
    }
}
