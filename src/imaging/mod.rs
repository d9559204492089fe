//! Image color statistics.

pub mod stats;
