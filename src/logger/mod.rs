//! Leveled plain-text logging with a general and a database sink, plus error
//! reporting layered on top.

pub mod level;
pub mod leveled;
pub mod reporter;
pub mod sink;
