//! URL assembly helpers.

use crate::core::errors::{DgmError, Result};

/// Collapse duplicated slashes and default the scheme to `http`.
///
/// The URL is split on `/`, empty segments are dropped, `http:` is prepended
/// when the first segment does not mention `http`, and the pieces are joined
/// back with `://` after the scheme.
///
/// ```
/// use dgm_utils::net::url::normalize_url;
/// assert_eq!(normalize_url("example.com//api/").unwrap(), "http://example.com/api");
/// ```
pub fn normalize_url(url: &str) -> Result<String> {
    let mut segments: Vec<&str> = url.split('/').filter(|s| !s.is_empty()).collect();
    let Some(first) = segments.first() else {
        return Err(DgmError::InvalidUrl {
            url: url.to_string(),
        });
    };
    if !first.contains("http") {
        segments.insert(0, "http:");
    }

    let (scheme, rest) = segments.split_at(1);
    Ok(format!("{}//{}", scheme[0], rest.join("/")))
}

/// Build `protocol://host[:port]/resource`.
///
/// With a port, the protocol defaults to `https` for ports 443 and 8443 and to
/// `http` otherwise. Without a port it defaults to `https`.
#[must_use]
pub fn build_url(host: &str, port: Option<&str>, resource: &str, protocol: Option<&str>) -> String {
    match port.filter(|p| !p.is_empty()) {
        Some(port) => {
            let protocol = protocol.unwrap_or(if matches!(port, "443" | "8443") {
                "https"
            } else {
                "http"
            });
            format!("{protocol}://{host}:{port}/{resource}")
        }
        None => format!("{}://{host}/{resource}", protocol.unwrap_or("https")),
    }
}
