//! Process, environment and file helpers.

pub mod command;
pub mod env;
pub mod files;
