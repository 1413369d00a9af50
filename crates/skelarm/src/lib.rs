//! Configuration loading for the `skelarm` command-line tool.

pub mod config;

pub use config::Config;
