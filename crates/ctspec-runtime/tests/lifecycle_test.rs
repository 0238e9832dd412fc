//! End-to-end tests for engine registration and backend isolation.
//!
//! These tests drive the public API the way a suite would:
//! 1. Register engines in the process-wide registry
//! 2. Build engine lists and dispatch lifecycle phases
//! 3. Run containers through `TestRun` with a stand-in runner
//! 4. Verify the ambient backend is restored around nested runs
//!
//! Every test touching process-wide state holds `SERIAL`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ctspec_backend::{BackendCatalog, BackendClassRef, BackendInstance, BackendStateGuard};
use ctspec_common::config::{RunConfig, RunOptions};
use ctspec_common::constants::CONTAINER_PROPERTY;
use ctspec_common::error::{CtspecError, Result};
use ctspec_common::types::{ContainerId, RunnerHandle, RunnerKind};
use ctspec_runtime::engines::BackendEngine;
use ctspec_runtime::{
    Configuration, ConfigurationRegistry, Engine, EngineFactory, EngineList, FromRunner, Phase,
    PhaseArgs, Runner, RunnerClass, TestRun,
};

static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let guard = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
    ConfigurationRegistry::reset();
    guard
}

fn docker_class() -> BackendClassRef {
    BackendCatalog::global().lookup("docker").expect("builtin docker backend")
}

// ── Stand-ins ────────────────────────────────────────────────────────

static CALLS: Mutex<Vec<String>> = Mutex::new(Vec::new());

fn calls() -> Vec<String> {
    CALLS.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

fn clear_calls() {
    CALLS.lock().unwrap_or_else(PoisonError::into_inner).clear();
}

macro_rules! recording_engine {
    ($name:ident) => {
        struct $name;

        impl $name {
            fn note(phase: Phase) -> anyhow::Result<()> {
                CALLS
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(format!("{}.{phase}", stringify!($name)));
                Ok(())
            }
        }

        impl FromRunner for $name {
            fn from_runner(_runner: &RunnerHandle, _config: &RunConfig) -> Self {
                Self
            }
        }

        impl Engine for $name {
            fn before_running(&mut self, _args: &PhaseArgs) -> anyhow::Result<()> {
                Self::note(Phase::BeforeRunning)
            }
            fn when_container_ready(&mut self, _args: &PhaseArgs) -> anyhow::Result<()> {
                Self::note(Phase::WhenContainerReady)
            }
            fn when_running(&mut self, _args: &PhaseArgs) -> anyhow::Result<()> {
                Self::note(Phase::WhenRunning)
            }
            fn restore(&mut self, _args: &PhaseArgs) -> anyhow::Result<()> {
                Self::note(Phase::Restore)
            }
        }
    };
}

recording_engine!(E1);
recording_engine!(E2);

struct StubRunner {
    handle: RunnerHandle,
    id: String,
}

impl Runner for StubRunner {
    fn handle(&self) -> &RunnerHandle {
        &self.handle
    }

    fn start(&mut self) -> Result<ContainerId> {
        let id = ContainerId::new(self.id.clone());
        self.handle.bind_container(id.clone())?;
        Ok(id)
    }

    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}

fn stub_runner_class() -> RunnerClass {
    RunnerClass::new("stub", |_config: &RunConfig, options: &RunOptions| {
        let image = options.image.clone().unwrap_or_default();
        Ok(Box::new(StubRunner {
            handle: RunnerHandle::new(RunnerKind::Container, image.clone()),
            id: format!("{image}-container"),
        }))
    })
}

// ── Registry ─────────────────────────────────────────────────────────

#[test]
fn registering_twice_keeps_one_entry() {
    let _serial = serial();
    ConfigurationRegistry::add_engine(EngineFactory::of::<E1>());
    ConfigurationRegistry::add_engine(EngineFactory::of::<E1>());
    assert_eq!(ConfigurationRegistry::engines(), vec![EngineFactory::of::<E1>()]);
}

#[test]
fn pinned_backend_engine_registers_once_per_backend() {
    let _serial = serial();
    ConfigurationRegistry::add_engine(BackendEngine::for_backend("ssh"));
    ConfigurationRegistry::add_engine(BackendEngine::for_backend("ssh"));
    ConfigurationRegistry::add_engine(BackendEngine::for_backend("docker"));

    let names: Vec<_> = ConfigurationRegistry::engines()
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    assert_eq!(names, vec!["BackendEngine[ssh]", "BackendEngine[docker]"]);
}

#[test]
fn reset_discards_customizations() {
    let _serial = serial();
    ConfigurationRegistry::add_engine(EngineFactory::of::<E1>());
    ConfigurationRegistry::set_container_runner(stub_runner_class());

    ConfigurationRegistry::reset();
    assert!(ConfigurationRegistry::engines().is_empty());
    assert_eq!(ConfigurationRegistry::container_runner().name(), "docker");
    assert_eq!(ConfigurationRegistry::compose_runner().name(), "compose");
}

// ── Engine list ──────────────────────────────────────────────────────

#[test]
fn container_ready_reaches_both_engines_once_in_order() {
    let _serial = serial();
    clear_calls();
    ConfigurationRegistry::add_engine(EngineFactory::of::<E1>());
    ConfigurationRegistry::add_engine(EngineFactory::of::<E2>());

    let runner = RunnerHandle::new(RunnerKind::Container, "alpine:3");
    let mut list = EngineList::from_registry(&runner).expect("engines registered");
    list.when_container_ready(&PhaseArgs::new()).expect("dispatch");

    assert_eq!(
        calls(),
        vec!["E1.when_container_ready", "E2.when_container_ready"]
    );
}

#[test]
fn empty_registry_explains_how_to_register() {
    let _serial = serial();
    let runner = RunnerHandle::new(RunnerKind::Compose, "web");
    let err = EngineList::from_registry(&runner).unwrap_err();

    assert!(matches!(err, CtspecError::Engine { .. }));
    let msg = err.to_string();
    assert!(msg.contains("ConfigurationRegistry::add_engine"));
    assert!(msg.contains("BackendEngine"));
}

// ── Backend isolation ────────────────────────────────────────────────

#[test]
fn container_run_does_not_leak_backend_into_outer_scope() {
    let _serial = serial();
    let docker = docker_class();
    let host = BackendInstance::new(&docker);
    docker.instance_set(Some(host.clone()));

    ConfigurationRegistry::set_container_runner(stub_runner_class());
    ConfigurationRegistry::add_engine(EngineFactory::of::<BackendEngine>());

    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    TestRun::from_registry(RunnerKind::Container, RunOptions::image("nginx"))
        .execute(&PhaseArgs::new(), move |_| {
            *sink.lock().unwrap() = docker_class().instance();
            Ok(())
        })
        .expect("run succeeds");

    let inner = seen.lock().unwrap().clone().expect("backend installed during run");
    assert_eq!(
        inner.property(CONTAINER_PROPERTY),
        Some(&serde_json::json!("nginx-container"))
    );
    assert_eq!(docker.instance(), Some(host));
    docker.instance_set(None);
}

#[test]
fn configured_backend_selects_the_swapped_slot() {
    let _serial = serial();
    let docker = docker_class();
    let ssh = BackendCatalog::global().lookup("ssh").expect("builtin ssh backend");
    let docker_host = BackendInstance::new(&docker);
    let ssh_host = BackendInstance::new(&ssh);
    docker.instance_set(Some(docker_host.clone()));
    ssh.instance_set(Some(ssh_host.clone()));

    ConfigurationRegistry::set_run_config(RunConfig {
        backend: "ssh".into(),
        ..RunConfig::default()
    });
    ConfigurationRegistry::set_container_runner(stub_runner_class());
    ConfigurationRegistry::add_engine(EngineFactory::of::<BackendEngine>());

    let seen = Arc::new(Mutex::new((None, None)));
    let sink = Arc::clone(&seen);
    let (body_docker, body_ssh) = (Arc::clone(&docker), Arc::clone(&ssh));
    TestRun::from_registry(RunnerKind::Container, RunOptions::image("bastion"))
        .execute(&PhaseArgs::new(), move |_| {
            *sink.lock().unwrap() = (body_docker.instance(), body_ssh.instance());
            Ok(())
        })
        .expect("run succeeds");

    let (docker_during, ssh_during) = seen.lock().unwrap().clone();
    assert_eq!(docker_during, Some(docker_host.clone()));
    let inner = ssh_during.expect("ssh backend installed during run");
    assert_ne!(inner, ssh_host);
    assert_eq!(
        inner.property(CONTAINER_PROPERTY),
        Some(&serde_json::json!("bastion-container"))
    );

    assert_eq!(docker.instance(), Some(docker_host));
    assert_eq!(ssh.instance(), Some(ssh_host));
    docker.instance_set(None);
    ssh.instance_set(None);
}

#[test]
fn nested_runs_restore_each_level() {
    let _serial = serial();
    let docker = docker_class();
    docker.instance_set(None);

    let mut config = Configuration::new();
    config.set_container_runner(stub_runner_class());
    config.add_engine(EngineFactory::of::<BackendEngine>());

    let inner_config = config.clone();
    TestRun::container(config, RunOptions::image("outer"))
        .execute(&PhaseArgs::new(), |_| {
            let outer = docker_class().instance().expect("outer backend");
            TestRun::container(inner_config, RunOptions::image("inner")).execute(
                &PhaseArgs::new(),
                |_| {
                    let inner = docker_class().instance().expect("inner backend");
                    assert_eq!(
                        inner.property(CONTAINER_PROPERTY),
                        Some(&serde_json::json!("inner-container"))
                    );
                    Ok(())
                },
            )?;
            assert_eq!(docker_class().instance(), Some(outer));
            Ok(())
        })
        .expect("nested runs succeed");

    assert!(docker.instance().is_none());
}

#[test]
fn guard_round_trip_on_global_slot() {
    let _serial = serial();
    let docker = docker_class();
    let original = BackendInstance::new(&docker);
    docker.instance_set(Some(original.clone()));

    let mut guard = BackendStateGuard::new("docker");
    guard.save().expect("save");
    docker.instance_set(Some(BackendInstance::new(&docker)));
    guard.restore().expect("restore");
    assert_eq!(docker.instance(), Some(original));

    guard.reset().expect("reset");
    assert!(docker.instance().is_none());
}
