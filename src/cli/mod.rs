//! CLI command handlers

pub mod commands;

pub use commands::{evaluate, export, validate};
