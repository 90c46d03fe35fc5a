//! Command implementations for the Fantasai CLI.

pub mod config;
pub mod generate;
pub mod models;

pub use config::ConfigCommand;
