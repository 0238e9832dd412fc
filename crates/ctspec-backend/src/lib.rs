//! # ctspec-backend
//!
//! Management of the ambient "current backend" that assertion libraries
//! consult implicitly.
//!
//! - **Class**: the [`BackendClass`](class::BackendClass) capability owning
//!   one process-wide instance slot.
//! - **Catalog**: explicit name → class mapping populated at startup.
//! - **Resolver**: turns a name, class, or instance into its class.
//! - **Guard**: saves, restores, and resets a class's slot so nested runs
//!   cannot leak backends into each other.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod catalog;
pub mod class;
pub mod guard;
pub mod resolver;

pub use catalog::BackendCatalog;
pub use class::{BackendClass, BackendClassRef, BackendInstance, StandardBackend};
pub use guard::{BackendStateGuard, Checkpoint};
pub use resolver::{BackendIdentifier, BackendResolver};
