//! Worker-task orchestration above one [`RuntimeContext`].
//!
//! Each source and destination runs as its own named `tokio` task. A
//! `Supervisor` is the thing that spawns those tasks, notices when one of
//! them exits with a fatal error, and drives a cooperative shutdown of
//! every other task when that happens — so one misbehaving destination
//! can't take the rest of the pipeline down ungracefully, and a clean
//! shutdown request stops every task in the same way a fatal error would.

use crate::error::{FlowError, RuntimePhase};
use crate::runtime::RuntimeContext;
use logging::{log_surfaced_error, SurfacedError};
use std::future::Future;
use tokio::task::JoinSet;

/// Why [`Supervisor::run_to_completion`] returned.
#[derive(Debug)]
pub enum SupervisorOutcome {
    /// Every task exited on its own, none of them fatally.
    AllExited,
    /// Shutdown was requested from outside (e.g. a signal handler) and
    /// every task drained and exited in response.
    ShutdownRequested,
    /// A worker returned a fatal error; every other task was asked to
    /// shut down and has exited. Carries the error that triggered it.
    Fatal(FlowError),
}

/// Owns the set of running worker tasks for one [`RuntimeContext`].
pub struct Supervisor {
    tasks: JoinSet<(String, Result<(), FlowError>)>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    #[must_use]
    pub fn new() -> Self {
        Self { tasks: JoinSet::new() }
    }

    /// Registers a worker. `name` identifies it in logs; `task` is the
    /// future driving one source or destination's `run` loop to
    /// completion.
    pub fn spawn<F>(&mut self, name: impl Into<String>, task: F)
    where
        F: Future<Output = Result<(), FlowError>> + Send + 'static,
    {
        let name = name.into();
        self.tasks.spawn(async move { (name, task.await) });
    }

    /// How many tasks are still registered (running or finished but not
    /// yet joined). Exposed for diagnostics and tests.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Runs every spawned task to completion, requesting shutdown on
    /// `ctx` as soon as one exits with a fatal error (per
    /// [`FlowError::is_fatal`] at [`RuntimePhase::Running`]) and then
    /// draining the rest.
    pub async fn run_to_completion(mut self, ctx: &RuntimeContext) -> SupervisorOutcome {
        let mut outcome = SupervisorOutcome::AllExited;
        while let Some(joined) = self.tasks.join_next().await {
            let (name, result) = match joined {
                Ok(pair) => pair,
                Err(join_error) => {
                    log_surfaced_error(&SurfacedError {
                        source: "supervisor",
                        error_kind: "WorkerPanicked",
                        detail: &join_error.to_string(),
                        fd: None,
                        bytes_processed: None,
                    });
                    continue;
                }
            };
            if let Err(error) = result {
                log_surfaced_error(&SurfacedError {
                    source: &name,
                    error_kind: error.error_kind(),
                    detail: &error.to_string(),
                    fd: None,
                    bytes_processed: None,
                });
                if error.is_fatal(RuntimePhase::Running) && !ctx.shutdown_requested() {
                    ctx.request_shutdown();
                    outcome = SupervisorOutcome::Fatal(error);
                }
            }
        }
        if matches!(outcome, SupervisorOutcome::AllExited) && ctx.shutdown_requested() {
            outcome = SupervisorOutcome::ShutdownRequested;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persist::PersistStore;
    use std::time::Duration;

    fn runtime() -> (tempfile::TempDir, RuntimeContext) {
        let dir = tempfile::tempdir().unwrap();
        let store = PersistStore::create(&dir.path().join("state.persist")).unwrap();
        let ctx = RuntimeContext::new(store, dnscache::DnsCacheOptions::default());
        (dir, ctx)
    }

    #[tokio::test]
    async fn all_workers_exiting_cleanly_reports_all_exited() {
        let (_dir, ctx) = runtime();
        let mut supervisor = Supervisor::new();
        supervisor.spawn("a", async { Ok(()) });
        supervisor.spawn("b", async { Ok(()) });

        let outcome = supervisor.run_to_completion(&ctx).await;
        assert!(matches!(outcome, SupervisorOutcome::AllExited));
    }

    #[tokio::test]
    async fn a_fatal_worker_error_requests_shutdown_and_is_reported() {
        let (_dir, ctx) = runtime();
        let mut supervisor = Supervisor::new();
        supervisor.spawn("bad-config", async {
            Err(FlowError::Config { detail: "missing bind address".into() })
        });
        supervisor.spawn("long-runner", async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(())
        });

        let outcome = supervisor.run_to_completion(&ctx).await;
        assert!(ctx.shutdown_requested());
        match outcome {
            SupervisorOutcome::Fatal(FlowError::Config { .. }) => {}
            other => panic!("expected Fatal(Config), got {other:?}"),
        }
    }

    #[tokio::test]
    async fn a_non_fatal_worker_error_does_not_request_shutdown() {
        let (_dir, ctx) = runtime();
        let mut supervisor = Supervisor::new();
        supervisor.spawn("flaky-source", async { Err(FlowError::QueueFull) });

        let outcome = supervisor.run_to_completion(&ctx).await;
        assert!(!ctx.shutdown_requested());
        assert!(matches!(outcome, SupervisorOutcome::AllExited));
    }
}
