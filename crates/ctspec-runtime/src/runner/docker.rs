//! Single-container runner backed by `docker run`.

use ctspec_common::config::{RunConfig, RunOptions};
use ctspec_common::error::{CtspecError, Result};
use ctspec_common::types::{ContainerId, RunnerHandle, RunnerKind};

use super::{Runner, command};

/// Runs one detached container from an image.
#[derive(Debug)]
pub struct DockerRunner {
    config: RunConfig,
    options: RunOptions,
    handle: RunnerHandle,
    started: Option<ContainerId>,
}

impl DockerRunner {
    /// Creates a runner for `options.image`.
    ///
    /// # Errors
    ///
    /// Returns an error if no image is given.
    pub fn new(config: &RunConfig, options: &RunOptions) -> Result<Self> {
        let image = options.image.as_deref().ok_or_else(|| CtspecError::Config {
            message: "docker runner requires an image".into(),
        })?;
        Ok(Self {
            config: config.clone(),
            options: options.clone(),
            handle: RunnerHandle::new(RunnerKind::Container, image),
            started: None,
        })
    }

    /// Arguments passed to the container CLI to start the container.
    #[must_use]
    pub fn run_args(&self) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--detach".to_string()];
        for (key, value) in &self.options.env {
            args.push("--env".into());
            args.push(format!("{key}={value}"));
        }
        args.push(self.handle.target().to_string());
        args.extend(self.options.command.iter().cloned());
        args
    }
}

impl Runner for DockerRunner {
    fn handle(&self) -> &RunnerHandle {
        &self.handle
    }

    fn start(&mut self) -> Result<ContainerId> {
        if self.started.is_some() {
            return Err(CtspecError::Runner {
                message: format!("container for `{}` already started", self.handle.target()),
            });
        }
        let output = command::run(&self.config.docker_binary, &self.run_args())?;
        let id = command::first_line(&output)
            .map(ContainerId::new)
            .ok_or_else(|| CtspecError::Runner {
                message: format!("no container id reported for `{}`", self.handle.target()),
            })?;

        self.handle.bind_container(id.clone())?;
        self.started = Some(id.clone());
        tracing::info!(id = %id, image = self.handle.target(), "container started");
        Ok(id)
    }

    fn finalize(&mut self) -> Result<()> {
        let Some(id) = self.started.take() else {
            return Ok(());
        };
        if !self.config.remove_on_finalize {
            tracing::info!(id = %id, "keeping container");
            return Ok(());
        }
        let args = vec!["rm".to_string(), "--force".to_string(), id.to_string()];
        let _ = command::run(&self.config.docker_binary, &args)?;
        tracing::info!(id = %id, "container removed");
        Ok(())
    }
}
