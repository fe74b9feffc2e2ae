//! Client configuration.
//!
//! Configuration comes either from environment variables or from a YAML
//! metadata file holding several named environments:
//!
//! ```yaml
//! environments:
//!   prodV1:
//!     base_url: https://sso.example.org/identity/
//!     login_url: https://sso.example.org/UI/Login
//!     logout_url: https://sso.example.org/UI/Logout
//!     trust:
//!       cert_serial: "66051"
//!   devel:
//!     base_url: https://sso-dev.example.org/identity/
//!     trust:
//!       self_signed: true
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{SsoError, SsoResult};

/// Cookie name used by the identity service unless configured otherwise.
pub const DEFAULT_COOKIE_NAME: &str = "iPlanetDirectoryPro";

/// Trust settings for the TLS transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// PEM file with the CA certificate(s) the service chain must verify against.
    pub ca_file: Option<PathBuf>,

    /// Skip chain verification entirely (trust downgrade).
    pub self_signed: bool,

    /// Expected serial number of the service certificate.
    pub cert_serial: Option<String>,
}

/// SSO client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsoConfig {
    /// Base URL of the identity web services (e.g. `https://sso.example.org/identity/`).
    #[serde(default)]
    pub base_url: String,

    /// Login page; users without a valid session are sent here.
    #[serde(default)]
    pub login_url: String,

    /// Logout page.
    #[serde(default)]
    pub logout_url: String,

    /// Certificate trust settings.
    #[serde(default)]
    pub trust: TrustConfig,

    /// Session cookie name.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Ask the service for the cookie name at session start.
    #[serde(default)]
    pub fetch_cookie_name: bool,

    /// Version reported in the User-Agent header.
    #[serde(default = "default_client_version")]
    pub client_version: String,

    /// Round-trip timeout override in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.to_string()
}

fn default_client_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for SsoConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            login_url: String::new(),
            logout_url: String::new(),
            trust: TrustConfig::default(),
            cookie_name: default_cookie_name(),
            fetch_cookie_name: false,
            client_version: default_client_version(),
            timeout_secs: None,
        }
    }
}

/// Metadata file with one configuration per environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub environments: BTreeMap<String, SsoConfig>,
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Positive whole seconds; anything else is ignored with a warning.
fn parse_timeout(raw: &str) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(0) => {
            warn!("ignoring SSO_TIMEOUT=0, the default timeout applies");
            None
        }
        Ok(secs) => Some(secs),
        Err(e) => {
            warn!(value = %raw, error = %e, "ignoring unparseable SSO_TIMEOUT");
            None
        }
    }
}

impl SsoConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `SSO_BASE_URL` | Identity web-service base URL |
    /// | `SSO_LOGIN_URL` | Login redirect target |
    /// | `SSO_LOGOUT_URL` | Logout redirect target |
    /// | `SSO_CA_FILE` | PEM CA file for the pinned trust policy |
    /// | `SSO_SELF_SIGNED` | Accept any server certificate (dev only) |
    /// | `SSO_CERT_SERIAL` | Expected server certificate serial |
    /// | `SSO_COOKIE_NAME` | Session cookie name |
    /// | `SSO_FETCH_COOKIE_NAME` | Ask the service for the cookie name |
    /// | `SSO_TIMEOUT` | Round-trip timeout in seconds |
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("SSO_BASE_URL").unwrap_or_default(),
            login_url: std::env::var("SSO_LOGIN_URL").unwrap_or_default(),
            logout_url: std::env::var("SSO_LOGOUT_URL").unwrap_or_default(),
            trust: TrustConfig {
                ca_file: env_non_empty("SSO_CA_FILE").map(PathBuf::from),
                self_signed: env_flag("SSO_SELF_SIGNED"),
                cert_serial: env_non_empty("SSO_CERT_SERIAL"),
            },
            cookie_name: env_non_empty("SSO_COOKIE_NAME").unwrap_or_else(default_cookie_name),
            fetch_cookie_name: env_flag("SSO_FETCH_COOKIE_NAME"),
            client_version: default_client_version(),
            timeout_secs: env_non_empty("SSO_TIMEOUT").and_then(|v| parse_timeout(&v)),
        }
    }

    /// Load one environment from a YAML metadata file.
    ///
    /// A relative `ca_file` resolves against the metadata file's directory.
    /// Without a `ca_file` (and without `self_signed`), the CA is expected at
    /// `crt/<environment>/ca.crt` next to the metadata file.
    pub fn load(path: &Path, environment: &str) -> SsoResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SsoError::config(format!("failed to read metadata {}: {}", path.display(), e))
        })?;
        let metadata: Metadata = serde_yaml::from_str(&raw).map_err(|e| {
            SsoError::config(format!("failed to parse metadata {}: {}", path.display(), e))
        })?;

        let mut config = metadata
            .environments
            .get(environment)
            .cloned()
            .ok_or_else(|| SsoError::config(format!("metadata for {} not found", environment)))?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        config.trust.ca_file = match config.trust.ca_file.take() {
            Some(ca) if ca.is_relative() => Some(base_dir.join(ca)),
            Some(ca) => Some(ca),
            None if !config.trust.self_signed => {
                Some(base_dir.join("crt").join(environment).join("ca.crt"))
            }
            None => None,
        };

        Ok(config)
    }

    /// Round-trip timeout, if overridden.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Reject settings no client could work with.
    pub fn validate(&self) -> SsoResult<()> {
        if self.timeout_secs == Some(0) {
            return Err(SsoError::config("timeout_secs must be at least 1"));
        }
        Ok(())
    }

    /// Set the identity web-service base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the login redirect target.
    pub fn with_login_url(mut self, url: impl Into<String>) -> Self {
        self.login_url = url.into();
        self
    }

    /// Set the logout redirect target.
    pub fn with_logout_url(mut self, url: impl Into<String>) -> Self {
        self.logout_url = url.into();
        self
    }

    /// Pin the service chain to a CA file.
    pub fn with_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.trust.ca_file = Some(path.into());
        self
    }

    /// Accept self-signed (unverified) server certificates.
    pub fn with_self_signed(mut self, allow: bool) -> Self {
        self.trust.self_signed = allow;
        self
    }

    /// Require a specific server certificate serial.
    pub fn with_cert_serial(mut self, serial: impl Into<String>) -> Self {
        self.trust.cert_serial = Some(serial.into());
        self
    }

    /// Set the session cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Ask the service for the cookie name at session start.
    pub fn with_fetch_cookie_name(mut self, fetch: bool) -> Self {
        self.fetch_cookie_name = fetch;
        self
    }

    /// Override the round-trip timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "SSO_BASE_URL",
            "SSO_LOGIN_URL",
            "SSO_LOGOUT_URL",
            "SSO_CA_FILE",
            "SSO_SELF_SIGNED",
            "SSO_CERT_SERIAL",
            "SSO_COOKIE_NAME",
            "SSO_FETCH_COOKIE_NAME",
            "SSO_TIMEOUT",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        clear_env();

        let config = SsoConfig::from_env();
        assert!(config.base_url.is_empty());
        assert_eq!(config.cookie_name, DEFAULT_COOKIE_NAME);
        assert!(!config.trust.self_signed);
        assert!(config.trust.ca_file.is_none());
        assert!(config.timeout().is_none());
    }

    #[test]
    #[serial]
    fn test_config_from_env_values() {
        clear_env();
        std::env::set_var("SSO_BASE_URL", "https://sso.example.org/identity/");
        std::env::set_var("SSO_SELF_SIGNED", "true");
        std::env::set_var("SSO_CERT_SERIAL", "1234");
        std::env::set_var("SSO_COOKIE_NAME", "");
        std::env::set_var("SSO_TIMEOUT", "7");

        let config = SsoConfig::from_env();
        clear_env();

        assert_eq!(config.base_url, "https://sso.example.org/identity/");
        assert!(config.trust.self_signed);
        assert_eq!(config.trust.cert_serial.as_deref(), Some("1234"));
        assert_eq!(config.cookie_name, DEFAULT_COOKIE_NAME);
        assert_eq!(config.timeout(), Some(Duration::from_secs(7)));
    }

    #[test]
    #[serial]
    fn test_config_from_env_ignores_bad_timeout() {
        for raw in ["0", "ten", "-5", "1.5"] {
            clear_env();
            std::env::set_var("SSO_TIMEOUT", raw);
            let config = SsoConfig::from_env();
            clear_env();
            assert!(config.timeout().is_none(), "SSO_TIMEOUT={}", raw);
        }
    }

    #[test]
    fn test_zero_timeout_is_config_error() {
        let err = SsoConfig::default().with_timeout_secs(0).validate().unwrap_err();
        assert!(matches!(err, SsoError::Config { .. }));
        assert!(SsoConfig::default().with_timeout_secs(1).validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = SsoConfig::default()
            .with_base_url("http://127.0.0.1:8080/identity/")
            .with_login_url("https://sso.example.org/UI/Login")
            .with_self_signed(true)
            .with_cookie_name("ssoToken")
            .with_timeout_secs(3);

        assert_eq!(config.base_url, "http://127.0.0.1:8080/identity/");
        assert_eq!(config.login_url, "https://sso.example.org/UI/Login");
        assert!(config.trust.self_signed);
        assert_eq!(config.cookie_name, "ssoToken");
        assert_eq!(config.timeout_secs, Some(3));
    }

    #[test]
    fn test_load_environment_resolves_default_ca_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.yaml");
        std::fs::write(
            &path,
            "environments:\n  prodV1:\n    base_url: https://sso.example.org/identity/\n    trust:\n      cert_serial: \"42\"\n",
        )
        .unwrap();

        let config = SsoConfig::load(&path, "prodV1").unwrap();
        assert_eq!(config.base_url, "https://sso.example.org/identity/");
        assert_eq!(
            config.trust.ca_file,
            Some(dir.path().join("crt").join("prodV1").join("ca.crt"))
        );
        assert_eq!(config.trust.cert_serial.as_deref(), Some("42"));
        assert_eq!(config.cookie_name, DEFAULT_COOKIE_NAME);
    }

    #[test]
    fn test_load_environment_relative_ca_and_self_signed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.yaml");
        std::fs::write(
            &path,
            "environments:\n  pinned:\n    base_url: https://a/\n    trust:\n      ca_file: certs/ca.pem\n  devel:\n    base_url: https://b/\n    trust:\n      self_signed: true\n",
        )
        .unwrap();

        let pinned = SsoConfig::load(&path, "pinned").unwrap();
        assert_eq!(pinned.trust.ca_file, Some(dir.path().join("certs/ca.pem")));

        let devel = SsoConfig::load(&path, "devel").unwrap();
        assert!(devel.trust.self_signed);
        assert!(devel.trust.ca_file.is_none());
    }

    #[test]
    fn test_load_unknown_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.yaml");
        std::fs::write(&path, "environments:\n  prodV1:\n    base_url: https://a/\n").unwrap();

        let err = SsoConfig::load(&path, "staging").unwrap_err();
        assert!(matches!(err, SsoError::Config { .. }));
        assert!(err.to_string().contains("metadata for staging not found"));
    }
}
