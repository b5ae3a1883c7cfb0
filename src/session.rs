//! Console session plumbing.
//!
//! Authentication against the AWS console is not handled here; it is
//! delegated to an [`Authenticator`] collaborator that knows how to produce a
//! region and an HTTP session carrying valid console credentials (cookies or
//! bearer headers). The library itself only ever POSTs envelopes through the
//! session it is handed.

use std::time::Duration;

use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{Result, SsoError};
use crate::payload::ApiPayload;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// An authenticated console HTTP session.
///
/// Wraps a blocking [`reqwest`] client whose default headers and cookie jar
/// carry the console authentication state. Read-only after construction and
/// safe to reuse sequentially.
#[derive(Debug)]
pub struct Session {
    http: HttpClient,
}

impl Session {
    /// Wraps a preconfigured HTTP client.
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// POSTs a request envelope as JSON and returns the raw response.
    pub(crate) fn post(&self, url: &str, payload: &ApiPayload) -> Result<Response> {
        Ok(self.http.post(url).json(payload).send()?)
    }
}

/// Supplies the console region and an authenticated [`Session`].
pub trait Authenticator {
    /// Region the console session is bound to.
    fn region(&self) -> Result<String>;

    /// Produces a session carrying the console authentication state.
    fn authenticated_session(&self) -> Result<Session>;
}

/// Authenticator backed by explicitly supplied values.
///
/// Useful when the caller already holds a valid console session (for example
/// a cookie obtained out of band) and in tests. Headers set here become
/// default headers on every request the session makes.
#[derive(Debug, Clone)]
pub struct StaticAuthenticator {
    region: String,
    headers: HeaderMap,
    timeout: Duration,
}

impl StaticAuthenticator {
    /// Creates an authenticator for the given console region.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            headers: HeaderMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Adds a default header to the session, e.g. `Cookie` or `Authorization`.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| SsoError::Auth(format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| SsoError::Auth(format!("invalid header value for '{name:?}': {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Sets the HTTP request timeout for sessions produced by this authenticator.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Authenticator for StaticAuthenticator {
    fn region(&self) -> Result<String> {
        Ok(self.region.clone())
    }

    fn authenticated_session(&self) -> Result<Session> {
        let http = HttpClient::builder()
            .default_headers(self.headers.clone())
            .cookie_store(true)
            .timeout(self.timeout)
            .build()
            .map_err(|e| SsoError::Auth(format!("failed to build HTTP client: {e}")))?;
        Ok(Session::new(http))
    }
}
