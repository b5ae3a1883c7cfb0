//! URL table for the regional console API endpoints.

/// The per-region console API endpoints the library talks to.
///
/// All four endpoints hang off the same `singlesignon/api` base; only the
/// trailing segment differs.
#[derive(Debug, Clone)]
pub(crate) struct ApiUrls {
    api: String,
}

impl ApiUrls {
    /// Builds the endpoint table for a console region.
    pub(crate) fn for_region(region: &str) -> Self {
        Self {
            api: format!("https://{region}.console.aws.amazon.com/singlesignon/api"),
        }
    }

    /// Builds the endpoint table on top of an explicit base URL.
    pub(crate) fn with_base(base: &str) -> Self {
        Self {
            api: format!("{}/api", base.trim_end_matches('/')),
        }
    }

    /// Combined control-plane endpoint.
    pub(crate) fn peregrine(&self) -> String {
        format!("{}/peregrine", self.api)
    }

    /// Account listing endpoint.
    pub(crate) fn organizations(&self) -> String {
        format!("{}/organizations", self.api)
    }

    /// User search endpoint.
    pub(crate) fn identitystore(&self) -> String {
        format!("{}/identitystore", self.api)
    }

    /// Group and user-pool endpoint.
    pub(crate) fn userpool(&self) -> String {
        format!("{}/userpool", self.api)
    }
}
