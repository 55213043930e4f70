//! Terminal dashboard for OpenCode usage statistics.
//!
//! The binary wires four modules together: `config` (CLI + TOML settings),
//! `state` (shared UI state), `monitor` (background refresher feeding the
//! incremental cache) and `ui` (ratatui components and the main loop). The
//! parsing and aggregation logic lives in the `ocstats-core` crate.

pub mod config;
pub mod monitor;
pub mod state;
pub mod ui;
