// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TLS material loading and client-identity derivation (`spec.md` §6).
//!
//! Client ID sources: `cert-cn` (the X.509 subject CN of the configured
//! client certificate) or `machine-id` (`/etc/machine-id`, falling back to
//! `/var/lib/dbus/machine-id`). The resolved ID is persisted to
//! `<state_dir>/client-id` and re-used across restarts when the
//! certificate is unchanged.
//!
//! Open question (a) from `spec.md` §9: whether the client-id file should
//! be read even when it's known to be absent. Resolved here as specified —
//! a missing file yields an empty cached ID rather than an error, and that
//! empty value is simply treated as "no cached ID" by the caller.

use std::path::{Path, PathBuf};

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use sha2::{Digest, Sha256};

use crate::env::{ClientIdSource, Config};
use crate::error::DaemonError;

/// TLS material loaded from the paths configured in `YGG_CA_ROOTS` /
/// `YGG_CERT_FILE` / `YGG_KEY_FILE`. All fields are optional: a daemon
/// that only speaks to an already-trusted broker may configure none of
/// them.
#[derive(Default)]
pub struct TlsMaterial {
    pub ca_roots: Option<Vec<CertificateDer<'static>>>,
    pub cert_chain: Option<Vec<CertificateDer<'static>>>,
    pub key: Option<PrivateKeyDer<'static>>,
}

impl TlsMaterial {
    pub fn load(config: &Config) -> Result<Self, DaemonError> {
        let ca_roots = config
            .ca_roots
            .as_deref()
            .map(read_certs)
            .transpose()?;
        let cert_chain = config
            .cert_file
            .as_deref()
            .map(read_certs)
            .transpose()?;
        let key = config
            .key_file
            .as_deref()
            .map(read_key)
            .transpose()?
            .flatten();
        Ok(Self { ca_roots, cert_chain, key })
    }
}

fn read_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, DaemonError> {
    let bytes = std::fs::read(path).map_err(|e| DaemonError::Tls(format!("{}: {e}", path.display())))?;
    let mut reader = std::io::Cursor::new(bytes);
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DaemonError::Tls(format!("{}: {e}", path.display())))
}

fn read_key(path: &Path) -> Result<Option<PrivateKeyDer<'static>>, DaemonError> {
    let bytes = std::fs::read(path).map_err(|e| DaemonError::Tls(format!("{}: {e}", path.display())))?;
    let mut reader = std::io::Cursor::new(bytes);
    rustls_pemfile::private_key(&mut reader).map_err(|e| DaemonError::Tls(format!("{}: {e}", path.display())))
}

/// Resolve this host's client ID per `config.client_id_source`, persisting
/// it (and, for `cert-cn`, a fingerprint of the certificate it was derived
/// from) so the next startup can reuse it without re-deriving.
pub fn resolve_client_id(config: &Config, tls: &TlsMaterial) -> Result<String, DaemonError> {
    match config.client_id_source {
        ClientIdSource::MachineId => {
            let id = read_machine_id()?;
            persist(&config.client_id_path, &id);
            Ok(id)
        }
        ClientIdSource::CertCn => resolve_cert_cn(config, tls),
    }
}

fn resolve_cert_cn(config: &Config, tls: &TlsMaterial) -> Result<String, DaemonError> {
    let cert = tls
        .cert_chain
        .as_ref()
        .and_then(|chain| chain.first())
        .ok_or_else(|| DaemonError::ClientId("cert-cn source selected but no client certificate configured".to_string()))?;

    let fingerprint = hex_digest(cert.as_ref());
    let fingerprint_path = fingerprint_path(&config.client_id_path);

    let cached_id = load_cached(&config.client_id_path);
    let cached_fingerprint = load_cached(&fingerprint_path);
    if !cached_id.is_empty() && cached_fingerprint == fingerprint {
        return Ok(cached_id);
    }

    let id = extract_common_name(cert)?;
    persist(&config.client_id_path, &id);
    persist(&fingerprint_path, &fingerprint);
    Ok(id)
}

fn extract_common_name(cert: &CertificateDer<'_>) -> Result<String, DaemonError> {
    let (_, parsed) = x509_parser::parse_x509_certificate(cert.as_ref())
        .map_err(|e| DaemonError::ClientId(format!("failed to parse client certificate: {e}")))?;
    parsed
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(|s| s.to_string())
        .ok_or_else(|| DaemonError::ClientId("client certificate has no subject CN".to_string()))
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn fingerprint_path(client_id_path: &Path) -> PathBuf {
    let mut path = client_id_path.as_os_str().to_owned();
    path.push(".fingerprint");
    PathBuf::from(path)
}

/// Read a previously-persisted value. Per open question (a), an absent
/// file resolves to an empty string rather than an error.
fn load_cached(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

fn persist(path: &Path, value: &str) {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(path, value);
}

fn read_machine_id() -> Result<String, DaemonError> {
    read_machine_id_from(&[Path::new("/etc/machine-id"), Path::new("/var/lib/dbus/machine-id")])
}

fn read_machine_id_from(candidates: &[&Path]) -> Result<String, DaemonError> {
    for candidate in candidates {
        if let Ok(contents) = std::fs::read_to_string(candidate) {
            return Ok(contents.trim().to_string());
        }
    }
    Err(DaemonError::ClientId("no machine-id found at /etc/machine-id or /var/lib/dbus/machine-id".to_string()))
}

#[cfg(test)]
#[path = "tls_tests.rs"]
mod tests;
