//! Identity service endpoint parsing.

use std::fmt;
use std::time::Duration;

use crate::error::{SsoError, SsoResult};

/// Transport mode selected by the URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Plain TCP.
    Http,
    /// TLS over TCP.
    Https,
}

impl Scheme {
    fn parse(scheme: &str) -> SsoResult<Self> {
        match scheme {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(SsoError::UnsupportedScheme {
                scheme: other.to_string(),
            }),
        }
    }

    /// Default round-trip bound; the TLS handshake gets extra headroom.
    pub fn default_timeout(self) -> Duration {
        match self {
            Self::Http => Duration::from_secs(15),
            Self::Https => Duration::from_secs(20),
        }
    }

    pub fn is_tls(self) -> bool {
        matches!(self, Self::Https)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => f.write_str("http"),
            Self::Https => f.write_str("https"),
        }
    }
}

/// Where the identity web services live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    /// Path prefix the service names are appended to (always starts with `/`).
    pub base_path: String,
}

impl Endpoint {
    /// Parse the configured base URL.
    ///
    /// Unsupported schemes are rejected here, before any socket exists.
    pub fn parse(base_url: &str) -> SsoResult<Self> {
        let url = url::Url::parse(base_url.trim())
            .map_err(|e| SsoError::config(format!("invalid base URL {:?}: {}", base_url, e)))?;

        let scheme = Scheme::parse(url.scheme())?;

        let host = match url.host() {
            Some(url::Host::Ipv6(addr)) => addr.to_string(),
            Some(host) => host.to_string(),
            None => {
                return Err(SsoError::config(format!(
                    "base URL {:?} has no host",
                    base_url
                )))
            }
        };

        let port = url.port_or_known_default().unwrap_or(match scheme {
            Scheme::Http => 80,
            Scheme::Https => 443,
        });

        Ok(Self {
            scheme,
            host,
            port,
            base_path: url.path().to_string(),
        })
    }

    /// Host as it appears in a URL or `Host` header; IPv6 literals get brackets.
    pub fn host_header(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }

    /// Request path for a named identity service (e.g. `isTokenValid`).
    pub fn service_path(&self, service: &str) -> String {
        if self.base_path.ends_with('/') {
            format!("{}{}", self.base_path, service)
        } else {
            format!("{}/{}", self.base_path, service)
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}{}", self.scheme, self.host_header(), self.port, self.base_path)
    }
}
