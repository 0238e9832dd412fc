//! Built-in test engines.

pub mod backend;

pub use self::backend::BackendEngine;
