// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process Supervisor (C1): one task per worker executable. Spawns, waits,
//! restarts on abnormal exit with capped exponential backoff, and signals
//! graceful/forceful shutdown via `nix`.

use std::path::PathBuf;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use ygg_core::{Clock, Handler, ProcessState};

use crate::backoff::Backoff;
use crate::error::SupervisorError;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Posted to C5 on every worker death (`spec.md` §4.1), expected or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerDied {
    pub handler: Handler,
    pub pid: u32,
}

/// What to launch and how, for one supervised worker.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    pub handler: Handler,
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

/// A running supervisor task. Drop or call [`SupervisorHandle::stop`] to
/// tear it down.
pub struct SupervisorHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: tokio::task::JoinHandle<()>,
}

impl SupervisorHandle {
    /// Request shutdown and wait for the supervisor task to finish
    /// (SIGTERM, then SIGKILL after the 5s grace period).
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.join.await;
    }
}

/// Start supervising `spec`. Deaths are reported on `dead_tx`; the clock
/// drives the 30s stability-reset check.
pub fn spawn<C: Clock>(spec: SpawnSpec, clock: C, dead_tx: mpsc::UnboundedSender<WorkerDied>) -> SupervisorHandle {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = tokio::spawn(run(spec, clock, dead_tx, shutdown_rx));
    SupervisorHandle { shutdown: Some(shutdown_tx), join }
}

async fn run<C: Clock>(
    spec: SpawnSpec,
    clock: C,
    dead_tx: mpsc::UnboundedSender<WorkerDied>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut backoff = Backoff::new();

    loop {
        let mut child = match spawn_child(&spec) {
            Ok(child) => child,
            Err(e) => {
                warn!(handler = %spec.handler, error = %e, "failed to spawn worker, backing off");
                let delay = backoff.next_delay();
                if tokio::time::timeout(delay, &mut shutdown_rx).await.is_ok() {
                    return;
                }
                continue;
            }
        };

        let pid = match child.id() {
            Some(pid) => pid,
            None => {
                warn!(handler = %spec.handler, "child exited before pid was observable");
                continue;
            }
        };
        info!(handler = %spec.handler, pid, "worker started");
        let started_at = clock.now_ms();

        tokio::select! {
            status = child.wait() => {
                let exit_code = status.ok().and_then(|s| s.code());
                let _ = dead_tx.send(WorkerDied { handler: spec.handler.clone(), pid });

                if exit_code == Some(0) {
                    info!(handler = %spec.handler, pid, "worker exited cleanly, not restarting");
                    return;
                }

                warn!(handler = %spec.handler, pid, ?exit_code, "worker died, scheduling restart");
                let uptime_ms = clock.elapsed_since(started_at).as_millis() as u64;
                if Backoff::is_stable_run(Duration::from_millis(uptime_ms)) {
                    backoff.reset();
                }
                let delay = backoff.next_delay();
                if tokio::time::timeout(delay, &mut shutdown_rx).await.is_ok() {
                    return;
                }
            }
            _ = &mut shutdown_rx => {
                shutdown_child(&mut child, pid, &spec.handler).await;
                let _ = dead_tx.send(WorkerDied { handler: spec.handler.clone(), pid });
                return;
            }
        }
    }
}

fn spawn_child(spec: &SpawnSpec) -> Result<Child, SupervisorError> {
    let mut cmd = Command::new(&spec.executable);
    cmd.args(&spec.args);
    for (key, value) in &spec.envs {
        cmd.env(key, value);
    }
    cmd.kill_on_drop(true);
    cmd.spawn().map_err(|source| SupervisorError::Spawn { path: spec.executable.clone(), source })
}

async fn shutdown_child(child: &mut Child, pid: u32, handler: &Handler) {
    if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        warn!(handler = %handler, pid, error = %e, "SIGTERM failed, worker may already be gone");
    }

    if tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await.is_ok() {
        info!(handler = %handler, pid, "worker exited after SIGTERM");
        return;
    }

    warn!(handler = %handler, pid, "worker did not exit within grace period, sending SIGKILL");
    if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        warn!(handler = %handler, pid, error = %e, "SIGKILL failed");
    }
    let _ = child.wait().await;
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
