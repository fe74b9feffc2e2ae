//! Identity protocol client.
//!
//! Public API: no status code knowledge. All status mapping in status.rs.

use std::fmt;

use tracing::debug;

use crate::attributes::AttributeMap;
use crate::config::SsoConfig;
use crate::endpoint::Endpoint;
use crate::error::{SsoError, SsoResult};
use crate::redirect::{self, urlencode};
use crate::transport::{Method, SocketTransport, Transport};
use crate::trust::TrustPolicy;

mod status;

use status::TokenOutcome;

/// Token validity service.
pub const SERVICE_IS_TOKEN_VALID: &str = "isTokenValid";
/// Attribute dump service.
pub const SERVICE_ATTRIBUTES: &str = "attributes";
/// Cookie name discovery service.
pub const SERVICE_COOKIE_NAME: &str = "getCookieNameForToken";

/// Client for the identity web services.
pub struct IdentityClient {
    transport: Box<dyn Transport>,
    config: SsoConfig,
}

impl fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityClient")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl IdentityClient {
    /// Create a client over the socket transport.
    ///
    /// Fails when the base URL is unusable, the trust material is missing or
    /// the timeout is zero.
    pub fn new(config: SsoConfig) -> SsoResult<Self> {
        config.validate()?;
        let endpoint = Endpoint::parse(&config.base_url)?;
        let trust = TrustPolicy::from_config(&config.trust)?;

        let mut transport = SocketTransport::new(endpoint, trust, &config.client_version)?;
        if let Some(timeout) = config.timeout() {
            transport = transport.with_timeout(timeout);
        }

        Ok(Self::with_transport(config, transport))
    }

    /// Create a client over a caller-supplied transport.
    pub fn with_transport(config: SsoConfig, transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            config,
        }
    }

    pub fn from_env() -> SsoResult<Self> {
        Self::new(SsoConfig::from_env())
    }

    /// Ask whether a token identifies a live session.
    ///
    /// `Ok(false)` covers both a 401 and a body without `true`; a 403 is
    /// returned as `SsoError::Forbidden`.
    pub async fn validate_token(&self, token: &str) -> SsoResult<bool> {
        debug!("validating session token");
        let query = format!("tokenid={}", urlencode(token));
        let response = self
            .transport
            .send(Method::Get, SERVICE_IS_TOKEN_VALID, Some(&query))
            .await?;

        Ok(status::token_outcome(response)? == TokenOutcome::Valid)
    }

    /// Fetch and decode the attributes of the subject behind `token`.
    pub async fn fetch_attributes(&self, token: &str) -> SsoResult<AttributeMap> {
        if token.is_empty() {
            return Err(SsoError::EmptyToken);
        }

        let query = format!("subjectid={}", urlencode(token));
        let response = self
            .transport
            .send(Method::Get, SERVICE_ATTRIBUTES, Some(&query))
            .await?;
        let body = status::expect_ok(response)?;

        let attributes = AttributeMap::decode(&body);
        debug!(count = attributes.len(), "decoded subject attributes");
        Ok(attributes)
    }

    /// Ask the service which cookie carries the session token.
    pub async fn discover_cookie_name(&self) -> SsoResult<String> {
        let response = self
            .transport
            .send(Method::Post, SERVICE_COOKIE_NAME, None)
            .await?;
        let body = status::expect_ok(response)?;

        let name = status::cookie_name(&body);
        debug!(cookie_name = %name, "discovered session cookie name");
        Ok(name)
    }

    /// Login page URL returning the user to `goto`.
    pub fn login_url(&self, goto: &str) -> String {
        redirect::with_goto(&self.config.login_url, goto)
    }

    /// Logout page URL returning the user to `goto`.
    pub fn logout_url(&self, goto: &str) -> String {
        redirect::with_goto(&self.config.logout_url, goto)
    }

    pub fn config(&self) -> &SsoConfig {
        &self.config
    }
}
