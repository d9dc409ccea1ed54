// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wiring crate for the `foremand` binary: configuration, logging, startup
//! integrity gate, and component assembly.

mod config;
mod error;
mod lifecycle;
mod logging;

pub use config::{Config, EngineMode};
pub use error::DaemonError;
pub use lifecycle::{startup, Daemon, EngineOrchestrator};
pub use logging::setup_logging;
