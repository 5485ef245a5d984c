//! CLI command implementations.
//!
//! - [`config`] - Configuration management (get, set, list, path)
//! - [`simulate`] - Drive a governor and the registry against a synthetic provider

pub mod config;
pub mod simulate;
