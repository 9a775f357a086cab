//! CLI command implementations.
//!
//! - [`config`] - Configuration management (show, init, path)
//! - [`demo`] - Runs coalesced, cached and cancelled agents and prints stats

pub mod config;
pub mod demo;
