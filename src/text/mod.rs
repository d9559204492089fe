//! Text utilities: delimiter balancing and formatting helpers.

pub mod balance;
pub mod format;
