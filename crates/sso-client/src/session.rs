//! Session facade.
//!
//! Ties the token carried by one incoming request to the identity client and
//! keeps the attributes decoded by the last successful validation.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::attributes::{AttributeMap, AttributeValue};
use crate::client::IdentityClient;
use crate::context::{RequestContext, SetCookie};
use crate::error::{SsoError, SsoResult};

/// Outcome of one validation attempt.
#[derive(Debug)]
pub enum Verdict {
    /// Token is live; attributes were decoded.
    Valid,
    /// No token, 401, or a body without the success marker.
    Invalid,
    /// The identity service refused the query (403).
    Forbidden,
    /// Connection, certificate or protocol failure.
    TransportError(SsoError),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// `Ok(true)` for Valid, `Ok(false)` for Invalid, an error otherwise.
    pub fn into_result(self) -> SsoResult<bool> {
        match self {
            Self::Valid => Ok(true),
            Self::Invalid => Ok(false),
            Self::Forbidden => Err(SsoError::Forbidden),
            Self::TransportError(e) => Err(e),
        }
    }
}

/// Where a session is in its validation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoToken,
    Checking,
    Valid,
    Invalid,
    Forbidden,
    Failed,
}

/// Decision of [`Session::enforce`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// Send the user to this login URL.
    LoginRedirect(String),
}

/// Logout redirect plus the cookie to expire, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logout {
    pub location: String,
    pub expire_cookie: Option<SetCookie>,
}

/// Validation state for a single incoming token.
#[derive(Debug)]
pub struct Session<'a> {
    client: &'a IdentityClient,
    token: String,
    cookie_name: String,
    cookie_directive: Option<SetCookie>,
    current_url: Option<String>,
    explorer_probe: bool,
    attributes: AttributeMap,
    state: SessionState,
}

impl<'a> Session<'a> {
    /// Session for an already extracted token. An empty token means no session.
    pub fn new(client: &'a IdentityClient, token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            state: initial_state(&token),
            cookie_name: client.config().cookie_name.clone(),
            client,
            token,
            cookie_directive: None,
            current_url: None,
            explorer_probe: false,
            attributes: AttributeMap::default(),
        }
    }

    /// Session for the token carried by `ctx`.
    ///
    /// Asks the service for the cookie name first when configured to.
    pub async fn from_context(client: &'a IdentityClient, ctx: &RequestContext) -> SsoResult<Self> {
        let cookie_name = if client.config().fetch_cookie_name {
            client.discover_cookie_name().await?
        } else {
            client.config().cookie_name.clone()
        };

        let extracted = ctx.extract_token(&cookie_name);
        if extracted.set_cookie.is_some() {
            debug!(cookie = %cookie_name, "token taken from query string");
        }

        Ok(Self {
            state: initial_state(&extracted.token),
            client,
            token: extracted.token,
            cookie_name,
            cookie_directive: extracted.set_cookie,
            current_url: ctx.current_url(),
            explorer_probe: ctx.has_explorer_probe(),
            attributes: AttributeMap::default(),
        })
    }

    /// Validate the token and, when it is live, decode its attributes.
    ///
    /// Each call starts over and replaces the attribute set. The token is
    /// cleared on every outcome other than `Valid`.
    pub async fn validate(&mut self) -> Verdict {
        self.attributes = AttributeMap::default();

        if self.token.is_empty() {
            debug!("no session token");
            self.state = SessionState::Invalid;
            return Verdict::Invalid;
        }

        self.state = SessionState::Checking;
        let verdict = match self.check().await {
            Ok(Some(attributes)) => {
                self.attributes = attributes;
                Verdict::Valid
            }
            Ok(None) | Err(SsoError::Unauthorized) => Verdict::Invalid,
            Err(SsoError::Forbidden) => Verdict::Forbidden,
            Err(e) => Verdict::TransportError(e),
        };

        self.state = match &verdict {
            Verdict::Valid => SessionState::Valid,
            Verdict::Invalid => SessionState::Invalid,
            Verdict::Forbidden => SessionState::Forbidden,
            Verdict::TransportError(_) => SessionState::Failed,
        };

        match &verdict {
            Verdict::Valid => debug!(attributes = self.attributes.len(), "session valid"),
            Verdict::Invalid => debug!("session invalid"),
            Verdict::Forbidden => warn!("identity service refused the validation query"),
            Verdict::TransportError(e) => warn!(error = %e, "session validation failed"),
        }

        if !verdict.is_valid() {
            self.token.clear();
        }

        verdict
    }

    async fn check(&self) -> SsoResult<Option<AttributeMap>> {
        if !self.client.validate_token(&self.token).await? {
            return Ok(None);
        }
        self.client.fetch_attributes(&self.token).await.map(Some)
    }

    /// Validate and decide whether the request may proceed.
    ///
    /// An invalid session yields a login redirect back to `goto` (or the
    /// current request URL). Forbidden and transport failures are errors,
    /// never a redirect.
    pub async fn enforce(&mut self, goto: Option<&str>) -> SsoResult<Access> {
        if self.validate().await.into_result()? {
            return Ok(Access::Granted);
        }

        let goto = self.return_address(goto);
        Ok(Access::LoginRedirect(self.client.login_url(&goto)))
    }

    /// `goto` unless it is missing or empty, then the current request URL.
    fn return_address(&self, goto: Option<&str>) -> String {
        goto.filter(|goto| !goto.is_empty())
            .map(str::to_string)
            .or_else(|| self.current_url.clone())
            .unwrap_or_default()
    }

    /// End the local session and build the logout redirect.
    ///
    /// An empty `goto` returns the user to the current request URL. The
    /// session cookie is expired locally unless the browser holds the
    /// SSO-domain probe cookie.
    pub fn logout(&mut self, goto: &str) -> Logout {
        self.token.clear();
        self.attributes = AttributeMap::default();
        self.state = SessionState::NoToken;

        let goto = self.return_address(Some(goto));
        Logout {
            location: self.client.logout_url(&goto),
            expire_cookie: (!self.explorer_probe)
                .then(|| SetCookie::expired(self.cookie_name.clone())),
        }
    }

    /// One attribute from the last successful validation.
    pub fn attribute(&self, name: &str, force_array: bool) -> SsoResult<AttributeValue> {
        self.attributes.attribute(name, force_array)
    }

    /// Every attribute from the last successful validation.
    pub fn all_attributes(&self, force_array: bool) -> BTreeMap<String, AttributeValue> {
        self.attributes.all(force_array)
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Cookie the application must set on its response, if any.
    pub fn cookie_directive(&self) -> Option<&SetCookie> {
        self.cookie_directive.as_ref()
    }
}

fn initial_state(token: &str) -> SessionState {
    if token.is_empty() {
        SessionState::NoToken
    } else {
        SessionState::Checking
    }
}
