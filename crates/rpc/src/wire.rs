// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire format for the local RPC surface (`spec.md` §6): a 4-byte
//! big-endian length prefix followed by a `serde_json` payload. Identical
//! in both directions (daemon-as-server and daemon-as-client) and across
//! daemon/worker builds, per `spec.md` §6's "must be identical" clause.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::RpcError;

/// Maximum message size (16 MB) — generous for the small structured
/// payloads this protocol carries, while still bounding a malicious or
/// corrupt length prefix.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, RpcError> {
    let json = serde_json::to_vec(value)?;
    if json.len() > MAX_MESSAGE_SIZE {
        return Err(RpcError::MessageTooLarge { size: json.len(), max: MAX_MESSAGE_SIZE });
    }
    Ok(json)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, RpcError> {
    Ok(serde_json::from_slice(bytes)?)
}

pub async fn read_message<R: tokio::io::AsyncReadExt + Unpin>(reader: &mut R) -> Result<Vec<u8>, RpcError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(RpcError::ConnectionClosed),
        Err(e) => return Err(RpcError::Io(e)),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(RpcError::MessageTooLarge { size: len, max: MAX_MESSAGE_SIZE });
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

pub async fn write_message<W: tokio::io::AsyncWriteExt + Unpin>(writer: &mut W, data: &[u8]) -> Result<(), RpcError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(RpcError::MessageTooLarge { size: data.len(), max: MAX_MESSAGE_SIZE });
    }
    writer.write_all(&(data.len() as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_value<T: DeserializeOwned, R: tokio::io::AsyncReadExt + Unpin>(reader: &mut R) -> Result<T, RpcError> {
    let bytes = read_message(reader).await?;
    decode(&bytes)
}

pub async fn write_value<T: Serialize, W: tokio::io::AsyncWriteExt + Unpin>(writer: &mut W, value: &T) -> Result<(), RpcError> {
    let bytes = encode(value)?;
    write_message(writer, &bytes).await
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
