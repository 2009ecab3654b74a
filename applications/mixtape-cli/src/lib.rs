//! Mixtape command-line front end
//!
//! Configuration loading and the command implementations behind the
//! `mixtape` binary.

pub mod commands;
pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::CliError;
