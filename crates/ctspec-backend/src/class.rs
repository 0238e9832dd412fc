//! Backend classes and the instances stored in their slots.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use ctspec_common::error::{CtspecError, Result};

/// A backend class exposing one process-wide "current instance" slot.
///
/// Assertion code reads the slot implicitly; guards checkpoint and
/// restore it around container runs.
pub trait BackendClass: Send + Sync + fmt::Debug {
    /// Conventional class name, e.g. `DockerCompose`.
    fn name(&self) -> &str;

    /// Returns the instance currently in effect, if any.
    fn instance(&self) -> Option<BackendInstance>;

    /// Replaces the instance in effect. `None` empties the slot.
    fn instance_set(&self, instance: Option<BackendInstance>);
}

/// Shared reference to a backend class.
pub type BackendClassRef = Arc<dyn BackendClass>;

struct InstanceInner {
    class: Weak<dyn BackendClass>,
    class_name: String,
    properties: BTreeMap<String, serde_json::Value>,
}

/// A configured backend, e.g. a docker backend bound to one container.
///
/// Equality is identity: two instances are equal only if they are clones
/// of the same value.
#[derive(Clone)]
pub struct BackendInstance(Arc<InstanceInner>);

impl BackendInstance {
    /// Creates an instance of `class` without properties.
    #[must_use]
    pub fn new(class: &BackendClassRef) -> Self {
        Self::with_properties(class, BTreeMap::new())
    }

    /// Creates an instance of `class` carrying `properties`.
    #[must_use]
    pub fn with_properties(
        class: &BackendClassRef,
        properties: BTreeMap<String, serde_json::Value>,
    ) -> Self {
        Self(Arc::new(InstanceInner {
            class: Arc::downgrade(class),
            class_name: class.name().to_string(),
            properties,
        }))
    }

    /// Returns the class this instance was created from.
    ///
    /// # Errors
    ///
    /// Returns an error if the class has been dropped.
    pub fn class(&self) -> Result<BackendClassRef> {
        self.0.class.upgrade().ok_or_else(|| CtspecError::BackendDetached {
            class_name: self.0.class_name.clone(),
        })
    }

    /// Returns the name of the class this instance was created from.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.0.class_name
    }

    /// Returns a property value.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.properties.get(key)
    }

    /// Returns whether both values are the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for BackendInstance {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for BackendInstance {}

impl fmt::Debug for BackendInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendInstance")
            .field("class", &self.0.class_name)
            .field("properties", &self.0.properties)
            .finish()
    }
}

/// Backend class with a plain lock-protected slot.
///
/// Used for the built-in backends and by tests needing throwaway classes.
#[derive(Debug)]
pub struct StandardBackend {
    name: String,
    slot: RwLock<Option<BackendInstance>>,
}

impl StandardBackend {
    /// Creates a class named `name` with an empty slot.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            slot: RwLock::new(None),
        })
    }
}

impl BackendClass for StandardBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn instance(&self) -> Option<BackendInstance> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn instance_set(&self, instance: Option<BackendInstance>) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = instance;
    }
}
