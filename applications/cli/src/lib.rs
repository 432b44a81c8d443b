//! Onyx Player command-line front end
//!
//! Configuration loading and interactive command parsing for the
//! `onyx-player` binary.

pub mod commands;
pub mod config;

pub use commands::{parse as parse_command, Command, CommandError};
pub use config::{ConfigError, PlayerConfig};
