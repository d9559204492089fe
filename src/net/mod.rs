//! URL helpers and the blocking HTTP fetcher.

pub mod fetch;
pub mod url;
