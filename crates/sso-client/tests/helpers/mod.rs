//! Test fixtures: canned-response identity servers over TCP and TLS.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use rcgen::{
    BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose, SerialNumber,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::ServerConfig;
use sso_client::SsoConfig;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

/// Serial of the generated leaf certificate (decimal 66051, hex 01:02:03).
pub const LEAF_SERIAL: [u8; 3] = [1, 2, 3];

/// A server answering one canned response per accepted connection.
pub struct CannedServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl CannedServer {
    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn base_url(&self, scheme: &str, host: &str) -> String {
        format!("{}://{}:{}/identity/", scheme, host, self.addr.port())
    }
}

/// Plain TCP server; connection `n` gets `responses[n]`, then the socket closes.
pub async fn canned_server<R>(responses: Vec<R>) -> CannedServer
where
    R: AsRef<[u8]> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();

    tokio::spawn(async move {
        for response in responses {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let request = read_request(&mut stream).await;
            recorded.lock().unwrap().push(request);
            let _ = stream.write_all(response.as_ref()).await;
            let _ = stream.shutdown().await;
        }
    });

    CannedServer { addr, requests }
}

/// TLS server presenting `pki.leaf`; same canned-response behaviour.
pub async fn canned_tls_server<R>(pki: &TestPki, responses: Vec<R>) -> CannedServer
where
    R: AsRef<[u8]> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();
    let acceptor = TlsAcceptor::from(pki.server_config());

    tokio::spawn(async move {
        for response in responses {
            let Ok((tcp, _)) = listener.accept().await else {
                return;
            };
            // Handshakes the client aborts are expected in rejection tests.
            let Ok(mut stream) = acceptor.accept(tcp).await else {
                continue;
            };
            let request = read_request(&mut stream).await;
            recorded.lock().unwrap().push(request);
            let _ = stream.write_all(response.as_ref()).await;
            let _ = stream.shutdown().await;
        }
    });

    CannedServer { addr, requests }
}

/// A listener that accepts and never answers.
pub async fn silent_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    addr
}

/// A local port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

async fn read_request<S: AsyncRead + Unpin>(stream: &mut S) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 512];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// Config for a plain-HTTP server with no CA material.
pub fn plain_config(server: &CannedServer) -> SsoConfig {
    SsoConfig::default()
        .with_base_url(server.base_url("http", "127.0.0.1"))
        .with_login_url("https://sso.example.org/UI/Login")
        .with_logout_url("https://sso.example.org/UI/Logout")
        .with_self_signed(true)
}

/// A test CA and a `localhost` leaf it signed.
pub struct TestPki {
    pub ca_pem: String,
    pub leaf: CertificateDer<'static>,
    pub ca: CertificateDer<'static>,
    leaf_key: Vec<u8>,
}

impl TestPki {
    pub fn generate() -> Self {
        let ca_key = KeyPair::generate().unwrap();
        let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        ca_params
            .distinguished_name
            .push(DnType::CommonName, "SSO Test CA");
        ca_params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let ca_cert = ca_params.self_signed(&ca_key).unwrap();

        let leaf_key = KeyPair::generate().unwrap();
        let mut leaf_params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        leaf_params
            .distinguished_name
            .push(DnType::CommonName, "localhost");
        leaf_params.serial_number = Some(SerialNumber::from_slice(&LEAF_SERIAL));
        leaf_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
        let leaf_cert = leaf_params
            .signed_by(&leaf_key, &ca_cert, &ca_key)
            .unwrap();

        Self {
            ca_pem: ca_cert.pem(),
            leaf: leaf_cert.der().clone(),
            ca: ca_cert.der().clone(),
            leaf_key: leaf_key.serialize_der(),
        }
    }

    fn server_config(&self) -> Arc<ServerConfig> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.leaf_key.clone()));
        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![self.leaf.clone(), self.ca.clone()], key)
            .unwrap();
        Arc::new(config)
    }
}
