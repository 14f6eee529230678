// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tracing initialization.
//!
//! Standard output carries the wire protocol, so the subscriber always
//! writes to standard error. `RUST_LOG` takes precedence over the default
//! level.

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber for a skill process.
///
/// Call once at startup, before [`crate::SkillServer::start`]. Safe to call
/// from tests; a second initialization is ignored.
pub fn init(default_level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init(Level::INFO);
        init(Level::DEBUG);
    }
}
