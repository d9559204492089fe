//! Blocking HTTP requests with a hard deadline and tri-state status mapping.
//!
//! Callers get a transport status code on success, [`STATUS_TIMEOUT`] when
//! the deadline expired and [`STATUS_TRANSPORT_ERROR`] for anything else.
//! Errors never propagate out of [`HttpFetcher::fetch`].

#![allow(missing_docs)]

use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder};

use crate::core::config::HttpConfig;
use crate::core::errors::Result;
use crate::logger::leveled::Logger;
use crate::logger::level::Severity;
use crate::logger::reporter::ErrorReport;
use crate::net::url::normalize_url;

/// Status returned when the request deadline expired.
pub const STATUS_TIMEOUT: i32 = -1;

/// Status returned for every other transport failure.
pub const STATUS_TRANSPORT_ERROR: i32 = -2;

const STANDARD_METHODS: [&str; 9] = [
    "GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH", "TRACE", "CONNECT",
];

/// One request. Only `url` is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub params: Vec<(String, String)>,
    /// Overrides the fetcher-wide timeout for this request.
    pub timeout: Option<Duration>,
    pub method: String,
    pub basic_auth: Option<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: Vec::new(),
            timeout: None,
            method: "GET".to_string(),
            basic_auth: None,
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((user.into(), password.into()));
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Response captured after a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Result of [`HttpFetcher::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Transport status, [`STATUS_TIMEOUT`] or [`STATUS_TRANSPORT_ERROR`].
    pub status: i32,
    pub response: Option<FetchedResponse>,
}

impl FetchOutcome {
    const fn failed(status: i32) -> Self {
        Self {
            status,
            response: None,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.response.is_some()
    }
}

/// HTTP client built once and reused for every request.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Build the client from settings. Warns once when certificate
    /// verification is disabled.
    pub fn new(config: &HttpConfig, logger: &Logger) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        if config.accept_invalid_certs {
            logger.log(
                Severity::Warning,
                0,
                "TLS certificate verification is disabled for HTTP requests",
            );
        }

        Ok(Self { client, timeout })
    }

    /// Default per-request deadline.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Perform `request`. Failures are logged and mapped to a negative status.
    pub fn fetch(&self, logger: &Logger, request: &FetchRequest) -> FetchOutcome {
        let builder = match self.prepare(request) {
            Ok(builder) => builder,
            Err(reason) => {
                logger.report(&ErrorReport::new("HTTP request not sent").cause(reason));
                return FetchOutcome::failed(STATUS_TRANSPORT_ERROR);
            }
        };

        let response = match builder.send() {
            Ok(response) => response,
            Err(e) => return Self::transport_failure(logger, &request.url, &e),
        };

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        match response.text() {
            Ok(body) => FetchOutcome {
                status: i32::from(status),
                response: Some(FetchedResponse {
                    status,
                    url,
                    headers,
                    body,
                }),
            },
            Err(e) => Self::transport_failure(logger, &request.url, &e),
        }
    }

    fn prepare(&self, request: &FetchRequest) -> std::result::Result<RequestBuilder, String> {
        let url = normalize_url(&request.url).map_err(|e| e.to_string())?;
        let method = parse_method(&request.method)
            .ok_or_else(|| format!("unsupported HTTP method {:?}", request.method))?;

        let mut builder = self.client.request(method, url);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some((user, password)) = &request.basic_auth {
            builder = builder.basic_auth(user, Some(password));
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        Ok(builder)
    }

    fn transport_failure(logger: &Logger, url: &str, error: &reqwest::Error) -> FetchOutcome {
        if error.is_timeout() {
            logger.log(
                Severity::Warning,
                0,
                &format!("request to {url} timed out"),
            );
            return FetchOutcome::failed(STATUS_TIMEOUT);
        }
        logger.report(&ErrorReport::new(&format!("request to {url} failed")).cause(error));
        FetchOutcome::failed(STATUS_TRANSPORT_ERROR)
    }
}

fn parse_method(name: &str) -> Option<Method> {
    let upper = name.trim().to_ascii_uppercase();
    if !STANDARD_METHODS.contains(&upper.as_str()) {
        return None;
    }
    Method::from_bytes(upper.as_bytes()).ok()
}
