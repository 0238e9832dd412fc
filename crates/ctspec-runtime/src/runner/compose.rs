//! Compose-stack runner backed by `docker compose`.

use std::path::PathBuf;

use ctspec_common::config::{RunConfig, RunOptions};
use ctspec_common::error::{CtspecError, Result};
use ctspec_common::types::{ContainerId, RunnerHandle, RunnerKind};

use super::{Runner, command};

/// Brings up a compose file and targets the container of one service.
#[derive(Debug)]
pub struct ComposeRunner {
    config: RunConfig,
    file: PathBuf,
    handle: RunnerHandle,
    up: bool,
}

impl ComposeRunner {
    /// Creates a runner for `options.compose_file` targeting
    /// `options.service`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or service is missing.
    pub fn new(config: &RunConfig, options: &RunOptions) -> Result<Self> {
        let file = options.compose_file.clone().ok_or_else(|| CtspecError::Config {
            message: "compose runner requires a compose file".into(),
        })?;
        if !file.is_file() {
            return Err(CtspecError::Config {
                message: format!("compose file not found: {}", file.display()),
            });
        }
        let service = options.service.as_deref().ok_or_else(|| CtspecError::Config {
            message: "compose runner requires a service to target".into(),
        })?;
        Ok(Self {
            config: config.clone(),
            file,
            handle: RunnerHandle::new(RunnerKind::Compose, service),
            up: false,
        })
    }

    fn compose_args(&self, rest: &[&str]) -> Vec<String> {
        let mut args = vec![
            "compose".to_string(),
            "--file".to_string(),
            self.file.to_string_lossy().into_owned(),
        ];
        args.extend(rest.iter().map(|s| (*s).to_string()));
        args
    }

    /// Arguments that bring the stack up.
    #[must_use]
    pub fn up_args(&self) -> Vec<String> {
        self.compose_args(&["up", "--detach"])
    }

    /// Arguments that print the targeted service's container id.
    #[must_use]
    pub fn ps_args(&self) -> Vec<String> {
        self.compose_args(&["ps", "--quiet", self.handle.target()])
    }

    /// Arguments that tear the stack down.
    #[must_use]
    pub fn down_args(&self) -> Vec<String> {
        self.compose_args(&["down"])
    }
}

impl Runner for ComposeRunner {
    fn handle(&self) -> &RunnerHandle {
        &self.handle
    }

    fn start(&mut self) -> Result<ContainerId> {
        if self.up {
            return Err(CtspecError::Runner {
                message: format!("compose stack {} already up", self.file.display()),
            });
        }
        let _ = command::run(&self.config.docker_binary, &self.up_args())?;
        self.up = true;

        let output = command::run(&self.config.docker_binary, &self.ps_args())?;
        let id = command::first_line(&output)
            .map(ContainerId::new)
            .ok_or_else(|| CtspecError::Runner {
                message: format!("service `{}` has no container", self.handle.target()),
            })?;
        self.handle.bind_container(id.clone())?;
        tracing::info!(id = %id, service = self.handle.target(), "compose service ready");
        Ok(id)
    }

    fn finalize(&mut self) -> Result<()> {
        if !std::mem::take(&mut self.up) {
            return Ok(());
        }
        if !self.config.remove_on_finalize {
            tracing::info!(file = %self.file.display(), "keeping compose stack");
            return Ok(());
        }
        let _ = command::run(&self.config.docker_binary, &self.down_args())?;
        tracing::info!(file = %self.file.display(), "compose stack removed");
        Ok(())
    }
}
