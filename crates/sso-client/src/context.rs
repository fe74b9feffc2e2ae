//! Request context and token normalization.
//!
//! The surrounding web application fills a [`RequestContext`] from the
//! incoming request; nothing here reads process-wide state.

use std::collections::HashMap;
use std::fmt;

/// Cookie the identity service sets when the browser stores cookies for the
/// SSO domain. Its absence means the session cookie lives on the local host.
pub const EXPLORER_PROBE_COOKIE: &str = "testExplorerBug";

/// What the application knows about the incoming request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub cookies: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub https: bool,
    /// `Host` header value.
    pub host: Option<String>,
    pub server_name: Option<String>,
    pub server_port: Option<u16>,
    /// Path and query as requested (e.g. `/app/page?x=1`).
    pub request_uri: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_https(mut self, https: bool) -> Self {
        self.https = https;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_server(
        mut self,
        name: impl Into<String>,
        port: u16,
        request_uri: impl Into<String>,
    ) -> Self {
        self.server_name = Some(name.into());
        self.server_port = Some(port);
        self.request_uri = Some(request_uri.into());
        self
    }

    /// URL of the current request, when the server fields are known.
    pub fn current_url(&self) -> Option<String> {
        let name = self.server_name.as_deref()?;
        let port = self.server_port?;
        let scheme = if self.https { "https" } else { "http" };
        Some(format!(
            "{}://{}:{}{}",
            scheme,
            name,
            port,
            self.request_uri.as_deref().unwrap_or("/")
        ))
    }

    /// Whether the browser stored cookies for the SSO domain.
    pub fn has_explorer_probe(&self) -> bool {
        self.cookies.contains_key(EXPLORER_PROBE_COOKIE)
    }

    /// Pull the session token out of the request.
    ///
    /// Some browsers hand the token over in the query string instead of the
    /// cookie. When the query carries it and the cookie is absent or differs,
    /// the query value is taken (over HTTPS only) and the cookie is re-issued.
    /// Otherwise the cookie value is used with spaces restored to `+`.
    pub fn extract_token(&self, cookie_name: &str) -> ExtractedToken {
        let from_query = self.query.get(cookie_name);
        let from_cookie = self.cookies.get(cookie_name);

        match (from_query, from_cookie) {
            (Some(query), None) => self.token_from_query(cookie_name, query),
            (Some(query), Some(cookie)) if query != cookie => {
                self.token_from_query(cookie_name, query)
            }
            (_, Some(cookie)) => ExtractedToken {
                token: cookie.replace(' ', "+"),
                set_cookie: None,
            },
            (None, None) => ExtractedToken::default(),
        }
    }

    /// The query value is only trusted over HTTPS; the cookie is re-issued either way.
    fn token_from_query(&self, cookie_name: &str, query: &str) -> ExtractedToken {
        let token = if self.https {
            query.to_string()
        } else {
            String::new()
        };
        ExtractedToken {
            set_cookie: Some(SetCookie {
                name: cookie_name.to_string(),
                value: token.clone(),
                path: "/".to_string(),
                domain: self.host.clone(),
                secure: true,
                expire: false,
            }),
            token,
        }
    }
}

/// Token taken from a request, plus any cookie the response must carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedToken {
    /// Empty when the request carries no session.
    pub token: String,
    pub set_cookie: Option<SetCookie>,
}

/// A cookie the application must send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    /// Expire the cookie instead of setting it.
    pub expire: bool,
}

impl SetCookie {
    /// Expiring cookie for `name` on path `/`.
    pub fn expired(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            path: "/".to_string(),
            domain: None,
            secure: false,
            expire: true,
        }
    }
}

impl fmt::Display for SetCookie {
    /// `Set-Cookie` header value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; Path={}", self.name, self.value, self.path)?;
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={}", domain)?;
        }
        if self.expire {
            f.write_str("; Max-Age=0")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        Ok(())
    }
}
