// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tracing subscriber initialization for bolt processes.
//!
//! Standard output carries the wire protocol, so every log line goes to
//! stderr. Filtering follows `RUST_LOG` (default: info).
//!
//! # Usage
//!
//! ```rust,ignore
//! boltkit_sdk::telemetry::init_subscriber()?;
//! ```

use tracing_subscriber::layer::SubscriberExt;

use crate::error::{BoltError, Result};

/// Install a global subscriber writing to stderr.
///
/// Fails if a global subscriber is already set.
pub fn init_subscriber() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);

    let subscriber = tracing_subscriber::Registry::default()
        .with(fmt)
        .with(filter);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| BoltError::Config(format!("failed to set global subscriber: {}", e)))
}
