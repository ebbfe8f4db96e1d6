//! Configuration management for embedgen
//!
//! Hierarchical configuration with discovery and precedence
//! CLI > env > file > defaults, loaded from `.embedgen/config.toml`.

mod config;

pub use config::*;
pub use embedgen_utils::error::ConfigError;
