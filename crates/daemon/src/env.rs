// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized configuration for the daemon: `YGG_*` environment
//! variables, with fallback to an optional `config.toml` under the state
//! directory, with built-in defaults beneath both (`SPEC_FULL.md` §4
//! "Supplemented: configuration surface").

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::DaemonError;

const APP_NAME: &str = "ygg";

/// Which [`ygg_transport::Transport`] backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Broker,
    HttpLongPoll,
}

impl TransportKind {
    fn parse(s: &str) -> Result<Self, DaemonError> {
        match s {
            "broker" => Ok(TransportKind::Broker),
            "http-longpoll" => Ok(TransportKind::HttpLongPoll),
            other => Err(DaemonError::UnknownTransport(other.to_string())),
        }
    }
}

/// Source for deriving this host's client ID (`spec.md` §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientIdSource {
    CertCn,
    MachineId,
}

impl ClientIdSource {
    fn parse(s: &str) -> Self {
        match s {
            "cert-cn" => ClientIdSource::CertCn,
            _ => ClientIdSource::MachineId,
        }
    }
}

/// Optional on-disk overrides, layered beneath environment variables and
/// above built-in defaults. Every field is optional so an absent or
/// partial `config.toml` is valid.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    socket_path: Option<PathBuf>,
    worker_dir: Option<PathBuf>,
    log_level: Option<String>,
    ca_roots: Option<PathBuf>,
    cert_file: Option<PathBuf>,
    key_file: Option<PathBuf>,
    transport: Option<String>,
    broker_url: Option<String>,
    topic_prefix: Option<String>,
    control_url: Option<String>,
    data_url: Option<String>,
    client_id_source: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `<localstate>/<name>`: runtime state that doesn't belong in backups
    /// or config management — the client-id cache, the daemon log, the
    /// default RPC socket location.
    pub state_dir: PathBuf,
    /// `<sysconf>/<name>`: configuration a worker is launched with
    /// (`BASE_CONFIG_DIR`), plus `config.toml`, `tags.toml`, and the
    /// default worker directory (`spec.md` §6).
    pub sysconf_dir: PathBuf,
    pub socket_path: Option<PathBuf>,
    pub worker_dir: PathBuf,
    pub log_level: String,
    pub log_path: PathBuf,
    pub ca_roots: Option<PathBuf>,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub transport: TransportKind,
    pub broker_url: Option<String>,
    pub topic_prefix: String,
    pub control_url: Option<String>,
    pub data_url: Option<String>,
    pub client_id_source: ClientIdSource,
    pub tags_path: PathBuf,
    pub client_id_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self, DaemonError> {
        let state_dir = state_dir()?;
        let sysconf_dir = sysconf_dir()?;
        let file = load_file_config(&sysconf_dir.join("config.toml"))?;

        let socket_path = env_path("YGG_SOCKET_PATH").or(file.socket_path);
        let worker_dir = env_path("YGG_WORKER_DIR")
            .or(file.worker_dir)
            .unwrap_or_else(|| sysconf_dir.join("workers"));
        let log_level = std::env::var("YGG_LOG_LEVEL")
            .ok()
            .or(file.log_level)
            .unwrap_or_else(|| "info".to_string());
        let ca_roots = env_path("YGG_CA_ROOTS").or(file.ca_roots);
        let cert_file = env_path("YGG_CERT_FILE").or(file.cert_file);
        let key_file = env_path("YGG_KEY_FILE").or(file.key_file);
        let transport = TransportKind::parse(
            &std::env::var("YGG_TRANSPORT")
                .ok()
                .or(file.transport)
                .unwrap_or_else(|| "broker".to_string()),
        )?;
        let broker_url = std::env::var("YGG_BROKER_URL").ok().or(file.broker_url);
        let topic_prefix = std::env::var("YGG_TOPIC_PREFIX")
            .ok()
            .or(file.topic_prefix)
            .unwrap_or_else(|| APP_NAME.to_string());
        let control_url = std::env::var("YGG_CONTROL_URL").ok().or(file.control_url);
        let data_url = std::env::var("YGG_DATA_URL").ok().or(file.data_url);
        let client_id_source = ClientIdSource::parse(
            &std::env::var("YGG_CLIENT_ID_SOURCE")
                .ok()
                .or(file.client_id_source)
                .unwrap_or_else(|| "machine-id".to_string()),
        );

        Ok(Self {
            log_path: state_dir.join("daemon.log"),
            tags_path: sysconf_dir.join("tags.toml"),
            client_id_path: state_dir.join("client-id"),
            socket_path,
            worker_dir,
            log_level,
            ca_roots,
            cert_file,
            key_file,
            transport,
            broker_url,
            topic_prefix,
            control_url,
            data_url,
            client_id_source,
            state_dir,
            sysconf_dir,
        })
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var).map(PathBuf::from)
}

fn load_file_config(path: &std::path::Path) -> Result<FileConfig, DaemonError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            toml::from_str(&contents).map_err(|source| DaemonError::ConfigParse { path: path.to_path_buf(), source })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(source) => Err(DaemonError::ConfigRead { path: path.to_path_buf(), source }),
    }
}

/// Resolve state directory: `YGG_STATE_DIR` > `XDG_STATE_HOME/ygg` > `~/.local/state/ygg`.
pub fn state_dir() -> Result<PathBuf, DaemonError> {
    if let Ok(dir) = std::env::var("YGG_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join(APP_NAME));
    }
    let home = std::env::var("HOME").map_err(|_| DaemonError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state").join(APP_NAME))
}

/// Resolve sysconf directory: `YGG_SYSCONF_DIR` > `XDG_CONFIG_HOME/ygg` > `~/.config/ygg`.
pub fn sysconf_dir() -> Result<PathBuf, DaemonError> {
    if let Ok(dir) = std::env::var("YGG_SYSCONF_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join(APP_NAME));
    }
    let home = std::env::var("HOME").map_err(|_| DaemonError::NoSysconfDir)?;
    Ok(PathBuf::from(home).join(".config").join(APP_NAME))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
