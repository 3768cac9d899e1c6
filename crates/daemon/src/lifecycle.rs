// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle Orchestrator (C9): wires every component together in the
//! startup order from `spec.md` §4.9 and tears them down in reverse on
//! shutdown.
//!
//! Startup: load config & TLS material -> derive client ID -> kill orphan
//! workers from a previous run -> start C4 -> construct the transport ->
//! start C5's channels -> start C6, C7, C8 -> scan the worker directory
//! and launch one C1 per `*worker` file -> start C2.
//!
//! Shutdown (SIGINT/SIGTERM): stop accepting new inbound data, broadcast
//! `Disconnect` to workers, stop all C1 supervisors (SIGTERM -> SIGKILL
//! after 5s), close the RPC server, return.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use ygg_core::{Handler, SystemClock, UuidIdGen};
use ygg_rpc::{Serving, SocketSpec};
use ygg_transport::{broker::BrokerTransport, http_longpoll::HttpLongPollTransport, InboundChannels, Transport};
use ygg_workers::{self as workers, DirectoryEvent, SpawnSpec, SupervisorHandle, TagsWatcher, WorkerDied, WorkerDirectoryWatcher};

use crate::env::{Config, TransportKind};
use crate::error::DaemonError;
use crate::registry::Registry;
use crate::tls::TlsMaterial;
use crate::{advertisement, control, dispatcher, rpc_server};

const DISCONNECT_GRACE: Duration = Duration::from_millis(500);

/// A fully wired, running daemon. Dropping this without calling
/// [`Daemon::shutdown`] leaves background tasks running; always shut
/// down explicitly.
pub struct Daemon {
    pub config: Config,
    pub registry: Registry,
    pub dispatcher: dispatcher::DispatcherHandle,
    pub transport: Arc<dyn Transport>,
    pub socket_addr: SocketSpec,
    client_id: String,
    rpc_serving: Serving,
    advertiser: JoinHandle<()>,
    control_loop: JoinHandle<()>,
    tags_loop: JoinHandle<()>,
    dir_watch_loop: JoinHandle<()>,
    supervisors: Arc<tokio::sync::Mutex<HashMap<Handler, SupervisorHandle>>>,
}

impl Daemon {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Tear everything down in the order `spec.md` §4.9 specifies.
    pub async fn shutdown(self) {
        info!("shutting down");

        self.dir_watch_loop.abort();
        self.tags_loop.abort();

        self.transport.disconnect(DISCONNECT_GRACE).await;

        dispatcher::disconnect_all_workers(&self.registry).await;

        self.control_loop.abort();
        self.advertiser.abort();

        let mut supervisors = self.supervisors.lock().await;
        for (_, handle) in supervisors.drain() {
            handle.stop().await;
        }
        drop(supervisors);

        self.rpc_serving.stop().await;
        self.socket_addr.remove();

        info!("shutdown complete");
    }
}

/// Start the daemon: wire C1 through C9 per `spec.md` §4.9.
pub async fn startup(config: Config) -> Result<Daemon, DaemonError> {
    let tls = TlsMaterial::load(&config)?;
    let client_id = crate::tls::resolve_client_id(&config, &tls)?;
    info!(client_id = %client_id, "resolved client id");

    reap_orphans(&config.worker_dir);

    let (dispatchers_tx, dispatchers_rx) = mpsc::channel(1);
    let registry = Registry::spawn(dispatchers_tx.clone());

    let (send_tx, send_rx) = mpsc::channel(1024);
    let (control_tx, control_rx) = mpsc::channel(64);
    let (recv_tx, recv_rx) = mpsc::channel(1024);

    // Start C4 before constructing the transport and starting C5's
    // channels (`spec.md` §4.9): the local RPC surface must be up so a
    // worker racing to register right after launch always finds it.
    let (rpc_addr, rpc_serving) = rpc_server::spawn(&config, registry.clone(), recv_tx.clone(), UuidIdGen)?;

    let inbound = InboundChannels { control: control_tx, data: send_tx };
    let transport: Arc<dyn Transport> = build_transport(&config, inbound);
    if let Err(e) = transport.start().await {
        warn!(error = %e, "failed to start transport at startup, will rely on later reconnect");
    }

    let dispatcher = dispatcher::spawn(registry.clone(), transport.clone(), send_rx, recv_tx, recv_rx);

    let advertiser = tokio::spawn(advertisement::run(dispatchers_rx, registry.clone(), transport.clone(), config.tags_path.clone()));
    let control_loop = tokio::spawn(control::run(control_rx, registry.clone(), transport.clone()));

    let tags_loop = spawn_tags_watch(&config, dispatchers_tx);

    let supervisors: Arc<tokio::sync::Mutex<HashMap<Handler, SupervisorHandle>>> = Arc::new(tokio::sync::Mutex::new(HashMap::new()));
    launch_initial_workers(&config, &client_id, &rpc_addr, dispatcher.dead_tx.clone(), &supervisors).await;
    let dir_watch_loop =
        spawn_directory_watch(config.clone(), client_id.clone(), rpc_addr.clone(), dispatcher.dead_tx.clone(), supervisors.clone());

    Ok(Daemon {
        config,
        registry,
        dispatcher,
        transport,
        socket_addr: rpc_addr,
        client_id,
        rpc_serving,
        advertiser,
        control_loop,
        tags_loop,
        dir_watch_loop,
        supervisors,
    })
}

fn build_transport(config: &Config, inbound: InboundChannels) -> Arc<dyn Transport> {
    match config.transport {
        TransportKind::Broker => {
            let url = config.broker_url.clone().unwrap_or_default();
            Arc::new(BrokerTransport::new(url, config.topic_prefix.clone(), inbound))
        }
        TransportKind::HttpLongPoll => {
            let control_url = config.control_url.clone().unwrap_or_default();
            let data_url = config.data_url.clone().unwrap_or_default();
            Arc::new(HttpLongPollTransport::new(control_url, data_url, inbound))
        }
    }
}

/// Nudge C6 to re-check and re-advertise whenever the tags file changes
/// (`spec.md` §4.8: "On either event, trigger a single `dispatchers`
/// token so C6 re-advertises"). The tags file itself is folded into each
/// worker's feature map at registration time; this loop only has to
/// signal that *something* changed, not recompute anything.
fn spawn_tags_watch(config: &Config, dispatchers: mpsc::Sender<()>) -> JoinHandle<()> {
    let tags_path = config.tags_path.clone();
    tokio::spawn(async move {
        let mut watcher = match TagsWatcher::watch(&tags_path) {
            Ok(w) => w,
            Err(e) => {
                warn!(error = %e, "failed to start tags watcher, tag changes will not trigger re-advertisement");
                return;
            }
        };
        while watcher.recv().await.is_some() {
            match dispatchers.try_send(()) {
                Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
                Err(mpsc::error::TrySendError::Closed(())) => break,
            }
        }
    })
}

fn spawn_directory_watch(
    config: Config,
    client_id: String,
    rpc_addr: SocketSpec,
    dead_tx: mpsc::UnboundedSender<WorkerDied>,
    supervisors: Arc<tokio::sync::Mutex<HashMap<Handler, SupervisorHandle>>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut watcher = match WorkerDirectoryWatcher::watch(&config.worker_dir) {
            Ok(w) => w,
            Err(e) => {
                warn!(error = %e, "failed to start worker directory watcher");
                return;
            }
        };
        while let Some(event) = watcher.recv().await {
            match event {
                DirectoryEvent::WorkerExecutableAdded(path) => {
                    let label = label_for(&path);
                    let spec = spawn_spec(&path, &label, &rpc_addr, &config, &client_id);
                    let handle = workers::spawn(spec, SystemClock::new(), dead_tx.clone());
                    supervisors.lock().await.insert(label, handle);
                }
                DirectoryEvent::WorkerExecutableRemoved(path) => {
                    let label = label_for(&path);
                    if let Some(handle) = supervisors.lock().await.remove(&label) {
                        handle.stop().await;
                    }
                }
            }
        }
    })
}

async fn launch_initial_workers(
    config: &Config,
    client_id: &str,
    rpc_addr: &SocketSpec,
    dead_tx: mpsc::UnboundedSender<WorkerDied>,
    supervisors: &Arc<tokio::sync::Mutex<HashMap<Handler, SupervisorHandle>>>,
) {
    let found = match WorkerDirectoryWatcher::scan(&config.worker_dir) {
        Ok(found) => found,
        Err(e) => {
            warn!(error = %e, dir = %config.worker_dir.display(), "failed to scan worker directory");
            return;
        }
    };

    let mut guard = supervisors.lock().await;
    for path in found {
        let label = label_for(&path);
        let spec = spawn_spec(&path, &label, rpc_addr, config, client_id);
        let handle = workers::spawn(spec, SystemClock::new(), dead_tx.clone());
        guard.insert(label, handle);
    }
}

fn label_for(path: &Path) -> Handler {
    Handler::new(path.file_stem().and_then(|s| s.to_str()).unwrap_or("worker").to_string())
}

/// Build the environment a worker is launched with (`spec.md` §6): socket
/// address, base config dir, log level, device ID, and a sanitised `PATH`
/// that excludes anything not under a handful of standard system
/// directories, regardless of what the daemon's own `PATH` carries.
fn spawn_spec(path: &Path, label: &Handler, rpc_addr: &SocketSpec, config: &Config, client_id: &str) -> SpawnSpec {
    SpawnSpec {
        handler: label.clone(),
        executable: path.to_path_buf(),
        args: Vec::new(),
        envs: vec![
            ("YGG_SOCKET_ADDR".to_string(), rpc_addr.env_value()),
            ("BASE_CONFIG_DIR".to_string(), config.sysconf_dir.display().to_string()),
            ("LOG_LEVEL".to_string(), config.log_level.clone()),
            ("DEVICE_ID".to_string(), client_id.to_string()),
            ("PATH".to_string(), sanitised_path()),
        ],
    }
}

/// A minimal, predictable `PATH` for worker subprocesses rather than
/// whatever the daemon happened to inherit.
fn sanitised_path() -> String {
    "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin".to_string()
}

/// Send SIGTERM to every process whose executable path resides under
/// `worker_dir`, best-effort (`spec.md` §4.9). Only implemented on Linux,
/// where `/proc/<pid>/exe` gives a reliable answer without extra
/// dependencies; a no-op elsewhere.
#[cfg(target_os = "linux")]
fn reap_orphans(worker_dir: &Path) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let Ok(worker_dir) = worker_dir.canonicalize() else { return };

    let Ok(entries) = std::fs::read_dir("/proc") else { return };
    for entry in entries.flatten() {
        let Some(pid_str) = entry.file_name().to_str().map(str::to_string) else { continue };
        let Ok(pid) = pid_str.parse::<i32>() else { continue };

        let exe_path = entry.path().join("exe");
        let Ok(exe) = std::fs::read_link(&exe_path) else { continue };
        if !exe.starts_with(&worker_dir) {
            continue;
        }

        warn!(pid, exe = %exe.display(), "killing orphaned worker from a previous run");
        if let Err(e) = signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
            warn!(pid, error = %e, "failed to signal orphaned worker");
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn reap_orphans(_worker_dir: &Path) {}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
