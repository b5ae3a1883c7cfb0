/// Region used for request envelopes when no other region is supplied.
pub(crate) const DEFAULT_AWS_REGION: &str = "eu-west-1";

/// Content type carried inside the envelope headers for control-plane calls.
pub(crate) const API_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Content encoding carried inside the envelope headers.
pub(crate) const API_CONTENT_ENCODING: &str = "amz-1.0";

/// Relay state applied to newly created permission sets unless overridden.
pub const DEFAULT_RELAY_STATE: &str =
    "https://eu-west-1.console.aws.amazon.com/console/home?region=eu-west-1#";

/// Session duration applied to newly created permission sets unless overridden.
pub const DEFAULT_SESSION_DURATION: &str = "PT2H";

/// Configuration for the SSO client.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Overrides the console base URL derived from the session region.
    ///
    /// Mostly useful for pointing the client at a test double.
    pub console_url: Option<String>,
}

impl ClientConfig {
    /// Creates a configuration with a custom console base URL.
    pub fn with_console_url(mut self, url: impl Into<String>) -> Self {
        self.console_url = Some(url.into());
        self
    }
}
