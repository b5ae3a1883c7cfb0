//! Request envelope construction for the SSO control-plane API.
//!
//! Every call to the console API is a POST of a JSON envelope naming the
//! operation, a serialized content body, and routing metadata. The operation
//! name must come from a fixed allow-list; the mapping between operation,
//! `X-Amz-Target` header, and path is part of the wire contract with the
//! remote service and must not be altered.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{API_CONTENT_ENCODING, API_CONTENT_TYPE, DEFAULT_AWS_REGION};
use crate::error::{Result, SsoError};

/// Operation names accepted by the control-plane endpoints.
pub(crate) const SUPPORTED_TARGETS: &[&str] = &[
    "GetUserPoolInfo",
    "SearchGroups",
    "ProvisionApplicationInstanceForAWSAccount",
    "ListPermissionSets",
    "GetApplicationInstanceForAWSAccount",
    "ProvisionApplicationProfileForAWSAccountInstance",
    "AssociateProfile",
    "ListAWSAccountProfiles",
    "DisassociateProfile",
    "SearchUsers",
    "ListMembersInGroup",
    "ListGroupsForUser",
    "CreatePermissionSet",
    "PutPermissionsPolicy",
    "GetPermissionsPolicy",
    "ListAccountsWithProvisionedPermissionSet",
    "UpdatePermissionSet",
];

/// Service prefix for the switchboard control-plane targets.
pub(crate) const SWB_SERVICE: &str = "com.amazon.switchboard.service.SWBService";

/// Service prefix for the user-pool targets.
pub(crate) const SWBUP_SERVICE: &str = "com.amazonaws.swbup.service.SWBUPService";

/// Service prefix for the identity-store targets.
pub(crate) const IDENTITY_STORE_SERVICE: &str =
    "com.amazonaws.identitystore.AWSIdentityStoreService";

/// Headers carried inside the request envelope.
///
/// These are envelope fields, not HTTP headers; the console forwards them to
/// the backing service.
#[derive(Debug, Clone, Serialize)]
pub struct PayloadHeaders {
    #[serde(rename = "Content-Type")]
    pub(crate) content_type: String,
    #[serde(rename = "Content-Encoding")]
    pub(crate) content_encoding: String,
    #[serde(rename = "X-Amz-Target")]
    pub(crate) x_amz_target: String,
    #[serde(rename = "X-Amz-User-Agent", skip_serializing_if = "Option::is_none")]
    pub(crate) x_amz_user_agent: Option<String>,
}

/// The JSON request envelope sent to the console API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPayload {
    pub(crate) content_string: String,
    pub(crate) headers: PayloadHeaders,
    pub(crate) method: String,
    pub(crate) operation: String,
    pub(crate) params: Map<String, Value>,
    pub(crate) path: String,
    pub(crate) region: String,
}

impl ApiPayload {
    /// Starts building an envelope for the given operation name.
    ///
    /// The name is validated against the supported target list when
    /// [`PayloadBuilder::build`] is called.
    pub fn builder(target: impl Into<String>) -> PayloadBuilder {
        PayloadBuilder {
            target: target.into(),
            content: Value::Object(Map::new()),
            method: "POST".to_string(),
            params: Map::new(),
            path: "/".to_string(),
            content_type: API_CONTENT_TYPE.to_string(),
            content_encoding: API_CONTENT_ENCODING.to_string(),
            x_amz_target: String::new(),
            region: DEFAULT_AWS_REGION.to_string(),
        }
    }

    /// Operation name carried by this envelope.
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

/// Builder for [`ApiPayload`].
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    target: String,
    content: Value,
    method: String,
    params: Map<String, Value>,
    path: String,
    content_type: String,
    content_encoding: String,
    x_amz_target: String,
    region: String,
}

impl PayloadBuilder {
    /// Sets the content body; it is serialized into `contentString` at build
    /// time, so the envelope never aliases the caller's value.
    pub fn content(mut self, content: Value) -> Self {
        self.content = content;
        self
    }

    /// Sets the HTTP method recorded in the envelope.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Sets the query parameters recorded in the envelope.
    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    /// Sets the path segment the console routes the call to.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Overrides the content type recorded in the envelope headers.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Overrides the content encoding recorded in the envelope headers.
    pub fn content_encoding(mut self, content_encoding: impl Into<String>) -> Self {
        self.content_encoding = content_encoding.into();
        self
    }

    /// Sets the fully qualified `X-Amz-Target` value for the operation.
    pub fn x_amz_target(mut self, x_amz_target: impl Into<String>) -> Self {
        self.x_amz_target = x_amz_target.into();
        self
    }

    /// Sets the region recorded in the envelope.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Validates the target and assembles the envelope.
    ///
    /// # Errors
    ///
    /// Returns [`SsoError::UnsupportedTarget`] when the operation name is not
    /// in the supported target list. No request is made in that case.
    pub fn build(self) -> Result<ApiPayload> {
        if !SUPPORTED_TARGETS.contains(&self.target.as_str()) {
            return Err(SsoError::UnsupportedTarget(self.target));
        }
        Ok(ApiPayload {
            content_string: serde_json::to_string(&self.content)?,
            headers: PayloadHeaders {
                content_type: self.content_type,
                content_encoding: self.content_encoding,
                x_amz_target: self.x_amz_target,
                x_amz_user_agent: None,
            },
            method: self.method,
            operation: self.target,
            params: self.params,
            path: self.path,
            region: self.region,
        })
    }
}
