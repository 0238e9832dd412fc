//! Save/restore guard over a backend class's instance slot.
//!
//! The slot is owned by the backend class, not the guard. A guard only
//! checkpoints it: `save` snapshots the value in effect, `restore` writes
//! the snapshot back, `reset` empties the slot. One level of snapshot is
//! kept per guard; a second `save` overwrites the first.

use std::sync::OnceLock;

use ctspec_common::error::{CtspecError, Result};

use crate::class::{BackendClassRef, BackendInstance};
use crate::resolver::{BackendIdentifier, BackendResolver};

/// Checkpoints the current instance of one backend class.
#[derive(Debug)]
pub struct BackendStateGuard {
    identifier: BackendIdentifier,
    resolver: BackendResolver,
    class: OnceLock<BackendClassRef>,
    // Outer `None`: nothing saved yet. `Some(None)`: the slot was empty.
    saved: Option<Option<BackendInstance>>,
}

impl BackendStateGuard {
    /// Creates a guard resolving `identifier` against the global catalog.
    ///
    /// Resolution happens on first use.
    #[must_use]
    pub fn new(identifier: impl Into<BackendIdentifier>) -> Self {
        Self::with_resolver(identifier, BackendResolver::default())
    }

    /// Creates a guard resolving `identifier` with `resolver`.
    #[must_use]
    pub fn with_resolver(identifier: impl Into<BackendIdentifier>, resolver: BackendResolver) -> Self {
        Self {
            identifier: identifier.into(),
            resolver,
            class: OnceLock::new(),
            saved: None,
        }
    }

    /// Returns the identifier this guard was created with.
    #[must_use]
    pub const fn identifier(&self) -> &BackendIdentifier {
        &self.identifier
    }

    /// Returns the resolved backend class, resolving it on first call.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier cannot be resolved. A failed
    /// resolution is not memoized.
    pub fn backend_class(&self) -> Result<&BackendClassRef> {
        if let Some(class) = self.class.get() {
            return Ok(class);
        }
        let resolved = self.resolver.resolve(&self.identifier)?;
        tracing::debug!(backend = %self.identifier, class = resolved.name(), "backend class resolved");
        Ok(self.class.get_or_init(|| resolved))
    }

    /// Returns the instance currently in effect.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier cannot be resolved.
    pub fn current(&self) -> Result<Option<BackendInstance>> {
        Ok(self.backend_class()?.instance())
    }

    /// Makes `instance` the one in effect, leaving any snapshot untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier cannot be resolved.
    pub fn install(&self, instance: BackendInstance) -> Result<()> {
        let class = self.backend_class()?;
        tracing::debug!(backend = class.name(), "installing backend instance");
        class.instance_set(Some(instance));
        Ok(())
    }

    /// Snapshots the instance currently in effect, replacing any earlier
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier cannot be resolved.
    pub fn save(&mut self) -> Result<()> {
        let current = self.current()?;
        tracing::debug!(backend = %self.identifier, empty = current.is_none(), "saving backend");
        self.saved = Some(current);
        Ok(())
    }

    /// Writes the snapshot back into the slot.
    ///
    /// The snapshot is kept, so restoring twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`CtspecError::GuardNotSaved`] if [`save`](Self::save) was
    /// never called, leaving the slot untouched, or an error if the
    /// identifier cannot be resolved.
    pub fn restore(&self) -> Result<()> {
        let Some(saved) = &self.saved else {
            return Err(CtspecError::GuardNotSaved {
                backend: self.identifier.to_string(),
            });
        };
        let class = self.backend_class()?;
        tracing::debug!(backend = class.name(), empty = saved.is_none(), "restoring backend");
        class.instance_set(saved.clone());
        Ok(())
    }

    /// Empties the slot regardless of any snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier cannot be resolved.
    pub fn reset(&self) -> Result<()> {
        let class = self.backend_class()?;
        tracing::debug!(backend = class.name(), "resetting backend");
        class.instance_set(None);
        Ok(())
    }

    /// Returns whether a snapshot has been taken.
    #[must_use]
    pub const fn has_snapshot(&self) -> bool {
        self.saved.is_some()
    }

    /// Returns the snapshot: `None` if nothing was saved, `Some(None)` if
    /// the slot was empty when saved.
    #[must_use]
    pub fn snapshot(&self) -> Option<Option<&BackendInstance>> {
        self.saved.as_ref().map(Option::as_ref)
    }

    /// Saves now and restores when the returned value is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier cannot be resolved.
    pub fn checkpoint(&mut self) -> Result<Checkpoint<'_>> {
        self.save()?;
        Ok(Checkpoint { guard: self })
    }
}

/// Scope that restores its guard's snapshot on drop.
#[derive(Debug)]
pub struct Checkpoint<'a> {
    guard: &'a BackendStateGuard,
}

impl Checkpoint<'_> {
    /// Returns the guard this checkpoint belongs to.
    #[must_use]
    pub const fn guard(&self) -> &BackendStateGuard {
        self.guard
    }
}

impl Drop for Checkpoint<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.guard.restore() {
            tracing::warn!(backend = %self.guard.identifier, error = %e, "checkpoint restore failed");
        }
    }
}
