//! Raw request/response transport.
//!
//! One round-trip per call: connect, optionally handshake and check the peer
//! certificate, write a hand-built HTTP/1.0 request, read until the server
//! closes, then drop the socket. No keep-alive, no request body, no
//! chunked decoding.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::endpoint::{Endpoint, Scheme};
use crate::error::{SsoError, SsoResult};
use crate::response::{self, HttpResponse};
use crate::trust::TrustPolicy;

/// Product name reported in the User-Agent header.
pub const USER_AGENT_PRODUCT: &str = "sso-client";

/// Responses larger than this are rejected.
pub const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

const READ_CHUNK: usize = 1024;

/// Request method. Only the two the identity service uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single query/response exchange with the identity service.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `method` to the named service with an optional query string.
    async fn send(
        &self,
        method: Method,
        service: &str,
        query: Option<&str>,
    ) -> SsoResult<HttpResponse>;
}

/// Build the request buffer.
pub fn build_request(
    method: Method,
    path: &str,
    query: Option<&str>,
    host: &str,
    user_agent: &str,
) -> String {
    let target = match query {
        Some(query) if !query.is_empty() => format!("{}?{}", path, query),
        _ => path.to_string(),
    };

    format!(
        "{} {} HTTP/1.0\r\nHost: {}\r\nUser-Agent: {}\r\n\r\n",
        method, target, host, user_agent
    )
}

struct TlsMode {
    connector: TlsConnector,
    server_name: ServerName<'static>,
}

/// Transport over a plain or TLS socket, per the endpoint scheme.
pub struct SocketTransport {
    endpoint: Endpoint,
    trust: TrustPolicy,
    tls: Option<TlsMode>,
    user_agent: String,
    timeout: Duration,
}

impl fmt::Debug for SocketTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketTransport")
            .field("endpoint", &self.endpoint)
            .field("trust", &self.trust)
            .field("tls", &self.tls.is_some())
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SocketTransport {
    /// Create a transport. TLS material is prepared here, not per request.
    pub fn new(endpoint: Endpoint, trust: TrustPolicy, client_version: &str) -> SsoResult<Self> {
        let tls = match endpoint.scheme {
            Scheme::Http => None,
            Scheme::Https => {
                let server_name = ServerName::try_from(endpoint.host.clone()).map_err(|e| {
                    SsoError::config(format!("invalid TLS server name {}: {}", endpoint.host, e))
                })?;
                Some(TlsMode {
                    connector: TlsConnector::from(trust.client_config()?),
                    server_name,
                })
            }
        };

        Ok(Self {
            timeout: endpoint.scheme.default_timeout(),
            endpoint,
            trust,
            tls,
            user_agent: format!("{} {}", USER_AGENT_PRODUCT, client_version),
        })
    }

    /// Override the per-round-trip timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    async fn exchange(&self, request: &[u8]) -> SsoResult<Vec<u8>> {
        let addr = (self.endpoint.host.as_str(), self.endpoint.port);
        let tcp = TcpStream::connect(addr).await.map_err(|e| {
            SsoError::connection(
                &e,
                &format!("connect to {}:{}", self.endpoint.host, self.endpoint.port),
            )
        })?;

        match &self.tls {
            None => {
                let mut stream = tcp;
                let result = round_trip(&mut stream, request).await;
                let _ = stream.shutdown().await;
                result
            }
            Some(tls) => {
                let mut stream = tls
                    .connector
                    .connect(tls.server_name.clone(), tcp)
                    .await
                    .map_err(|e| SsoError::ConnectionFailed {
                        errno: None,
                        message: format!(
                            "SSL verification failed or connection failed [{}]",
                            e
                        ),
                    })?;

                let (_, session) = stream.get_ref();
                let peer = session.peer_certificates().and_then(|certs| certs.first());
                if let Err(e) = self.trust.verify_peer(peer) {
                    let _ = stream.shutdown().await;
                    return Err(e);
                }

                let result = round_trip(&mut stream, request).await;
                let _ = stream.shutdown().await;
                result
            }
        }
    }
}

#[async_trait]
impl Transport for SocketTransport {
    async fn send(
        &self,
        method: Method,
        service: &str,
        query: Option<&str>,
    ) -> SsoResult<HttpResponse> {
        let path = self.endpoint.service_path(service);
        let request = build_request(
            method,
            &path,
            query,
            &self.endpoint.host_header(),
            &self.user_agent,
        );

        debug!(
            host = %self.endpoint.host,
            port = self.endpoint.port,
            scheme = %self.endpoint.scheme,
            method = %method,
            service = %service,
            "identity service request"
        );

        let raw = tokio::time::timeout(self.timeout, self.exchange(request.as_bytes()))
            .await
            .map_err(|_| SsoError::ConnectionFailed {
                errno: None,
                message: format!(
                    "no response from {}:{} within {}s",
                    self.endpoint.host,
                    self.endpoint.port,
                    self.timeout.as_secs()
                ),
            })??;

        debug!(bytes = raw.len(), service = %service, "identity service response");

        response::parse(&raw)
    }
}

/// Write the request, then read until end-of-stream.
async fn round_trip<S>(stream: &mut S, request: &[u8]) -> SsoResult<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(request)
        .await
        .map_err(|e| SsoError::connection(&e, "write request"))?;
    stream
        .flush()
        .await
        .map_err(|e| SsoError::connection(&e, "write request"))?;

    let mut response = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                if response.len() + n > MAX_RESPONSE_BYTES {
                    return Err(SsoError::malformed(format!(
                        "response exceeds {} bytes",
                        MAX_RESPONSE_BYTES
                    )));
                }
                response.extend_from_slice(&chunk[..n]);
            }
            // Peers that close without a TLS close_notify still delivered the full HTTP/1.0 body.
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(SsoError::connection(&e, "read response")),
        }
    }

    Ok(response)
}
