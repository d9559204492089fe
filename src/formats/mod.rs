//! Readers for on-disk configuration formats.

pub mod ini;
