// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors reported by `ofsctl`.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] ofs_core::Error),

    #[error("store not found: {0}\n  hint: pass --store with the path of an existing store")]
    StoreNotFound(String),

    #[error("invalid payload: {0}\n  hint: the payload must be a JSON object")]
    InvalidPayload(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for CLI commands.
pub type Result<T> = std::result::Result<T, Error>;
