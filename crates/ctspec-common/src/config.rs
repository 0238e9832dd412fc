//! Configuration models for a test run.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Settings shared by every run in a suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Container CLI binary, looked up on `PATH` when not absolute.
    pub docker_binary: String,
    /// Backend name the built-in engine installs for the container.
    pub backend: String,
    /// Whether runners remove what they started when finalizing.
    pub remove_on_finalize: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            docker_binary: crate::constants::DEFAULT_DOCKER_BINARY.to_string(),
            backend: crate::constants::DEFAULT_BACKEND.to_string(),
            remove_on_finalize: true,
        }
    }
}

impl RunConfig {
    /// Parses a configuration from JSON, filling omitted fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not valid JSON for this model.
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }
}

/// What a runner should start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Image reference for single-container runs.
    pub image: Option<String>,
    /// Command override.
    pub command: Vec<String>,
    /// Environment variables passed to the container.
    pub env: BTreeMap<String, String>,
    /// Compose file for compose runs.
    pub compose_file: Option<PathBuf>,
    /// Compose service whose container the engines target.
    pub service: Option<String>,
}

impl RunOptions {
    /// Options for running a single image.
    #[must_use]
    pub fn image(image: impl Into<String>) -> Self {
        Self {
            image: Some(image.into()),
            ..Self::default()
        }
    }

    /// Options for running a compose file and targeting one service.
    #[must_use]
    pub fn compose(file: impl Into<PathBuf>, service: impl Into<String>) -> Self {
        Self {
            compose_file: Some(file.into()),
            service: Some(service.into()),
            ..Self::default()
        }
    }
}
