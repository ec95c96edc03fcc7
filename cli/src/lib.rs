//! # Theme Porter
//!
//! Command-line front end of the theme converter. It loads configuration,
//! installs the logger and drives [`converter::Converter`] and the
//! marketplace client on behalf of the `theme-porter` binary.
//!
//! - [`args`] - Command-line definitions
//! - [`commands`] - `convert` and `search` implementations
//! - [`config`] - `theme-porter.toml` and environment configuration
//! - [`error`] - Application errors shown to the user
//! - [`logger`] - `fern` logger setup

pub mod args;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
