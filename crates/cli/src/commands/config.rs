// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::cli::GlobalArgs;
use crate::error::Result;

use super::load_config;

/// Print the effective configuration: the `--config` file with defaults
/// filled in, or the defaults alone.
pub fn show(global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    print!("{}", config.to_toml()?);
    Ok(())
}
