//! Client for web single-sign-on identity services.
//!
//! This crate validates the session token carried by an incoming request
//! against the identity service's web-service interface, providing:
//!
//! - Hand-built HTTP/1.0 transport over TCP or TLS with CA and serial pinning
//! - Token validation, attribute fetch and cookie-name discovery
//! - Attribute dump decoding with case-insensitive lookup
//! - A per-request session facade with a four-way verdict
//! - Login/logout redirect targets
//!
//! # Quick Start
//!
//! ```no_run
//! use sso_client::{IdentityClient, RequestContext, Session, SsoConfig};
//!
//! # async fn example() -> sso_client::SsoResult<()> {
//! let client = IdentityClient::new(SsoConfig::from_env())?;
//!
//! let ctx = RequestContext::new().with_cookie("iPlanetDirectoryPro", "AQIC5w...");
//! let mut session = Session::from_context(&client, &ctx).await?;
//!
//! if session.validate().await.into_result()? {
//!     println!("hello {:?}", session.attribute("cn", false)?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `SSO_BASE_URL` | Identity web-service base URL |
//! | `SSO_LOGIN_URL` | Login page URL |
//! | `SSO_LOGOUT_URL` | Logout page URL |
//! | `SSO_CA_FILE` | PEM file with the pinned CA certificate(s) |
//! | `SSO_SELF_SIGNED` | Accept any certificate chain (dev only) |
//! | `SSO_CERT_SERIAL` | Expected server certificate serial (decimal or hex) |
//! | `SSO_COOKIE_NAME` | Session cookie name (default: `iPlanetDirectoryPro`) |
//! | `SSO_FETCH_COOKIE_NAME` | Ask the service for the cookie name |
//! | `SSO_TIMEOUT` | Round-trip timeout in seconds (default: 15 plain, 20 TLS) |

pub mod attributes;
pub mod client;
pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod redirect;
pub mod response;
pub mod session;
pub mod transport;
pub mod trust;

// Re-export main types
pub use attributes::{AttributeMap, AttributeValue};
pub use client::{IdentityClient, SERVICE_ATTRIBUTES, SERVICE_COOKIE_NAME, SERVICE_IS_TOKEN_VALID};
pub use config::{Metadata, SsoConfig, TrustConfig, DEFAULT_COOKIE_NAME};
pub use context::{ExtractedToken, RequestContext, SetCookie, EXPLORER_PROBE_COOKIE};
pub use endpoint::{Endpoint, Scheme};
pub use error::{SsoError, SsoResult};
pub use response::HttpResponse;
pub use session::{Access, Logout, Session, SessionState, Verdict};
pub use transport::{Method, SocketTransport, Transport, MAX_RESPONSE_BYTES, USER_AGENT_PRODUCT};
pub use trust::TrustPolicy;
