// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reachability probes.

use tokio::net::TcpStream;

use crate::transport::BoxFuture;

/// Error type for probe operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("probe timed out")]
    Timeout,
}

/// One lightweight check that the remote side is actually reachable.
///
/// The monitor measures round-trip time around the call and applies its own
/// timeout, so implementations only report success or failure.
pub trait Probe: Send + Sync {
    fn probe(&self) -> BoxFuture<'_, Result<(), ProbeError>>;
}

/// Probes by opening (and immediately dropping) a TCP connection.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
}

impl TcpProbe {
    /// `addr` is anything `TcpStream::connect` accepts, e.g. `"api.example.com:443"`.
    pub fn new(addr: impl Into<String>) -> Self {
        TcpProbe { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl Probe for TcpProbe {
    fn probe(&self) -> BoxFuture<'_, Result<(), ProbeError>> {
        Box::pin(async move {
            TcpStream::connect(self.addr.as_str())
                .await
                .map(drop)
                .map_err(|e| ProbeError::Unreachable(format!("{}: {}", self.addr, e)))
        })
    }
}

/// A probe that always succeeds, for hosts whose connectivity flag is
/// authoritative.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl Probe for NoProbe {
    fn probe(&self) -> BoxFuture<'_, Result<(), ProbeError>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
