//! Core types: errors, configuration, file layout.

pub mod config;
pub mod errors;
pub mod paths;
