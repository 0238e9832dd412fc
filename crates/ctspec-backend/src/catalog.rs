//! Name → class mapping for backend lookup.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use ctspec_common::error::{CtspecError, Result};

use crate::class::{BackendClassRef, StandardBackend};

/// Class names registered by [`BackendCatalog::with_builtin`].
pub const BUILTIN_BACKENDS: [&str; 4] = ["Exec", "Docker", "DockerCompose", "Ssh"];

/// Explicit registry of backend classes keyed by class name.
#[derive(Debug, Clone, Default)]
pub struct BackendCatalog {
    classes: BTreeMap<String, BackendClassRef>,
}

impl BackendCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding the built-in backend classes.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut catalog = Self::new();
        for name in BUILTIN_BACKENDS {
            let _ = catalog.register(StandardBackend::new(name));
        }
        catalog
    }

    /// Returns the process-wide catalog.
    ///
    /// Backend slots are process-wide, so every guard that does not bring
    /// its own catalog resolves against this one.
    pub fn global() -> &'static Arc<Self> {
        static GLOBAL: OnceLock<Arc<BackendCatalog>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Self::with_builtin()))
    }

    /// Registers `class` under its own name, returning any class it replaced.
    pub fn register(&mut self, class: BackendClassRef) -> Option<BackendClassRef> {
        tracing::debug!(backend = class.name(), "registering backend class");
        self.classes.insert(class.name().to_string(), class)
    }

    /// Returns the class registered under an exact class name.
    #[must_use]
    pub fn get(&self, class_name: &str) -> Option<BackendClassRef> {
        self.classes.get(class_name).cloned()
    }

    /// Looks up a backend by its snake-case or class name.
    ///
    /// # Errors
    ///
    /// Returns [`CtspecError::BackendLookup`] if no class matches.
    pub fn lookup(&self, name: &str) -> Result<BackendClassRef> {
        let class_name = to_class_name(name);
        self.get(&class_name)
            .ok_or_else(|| CtspecError::BackendLookup {
                name: name.to_string(),
                class_name,
            })
    }

    /// Returns the registered class names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }
}

/// Converts a backend name into its class-name form.
///
/// `docker_compose` becomes `DockerCompose`; names already in class form
/// are returned unchanged.
#[must_use]
pub fn to_class_name(name: &str) -> String {
    name.split(['_', '-', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect()
}
