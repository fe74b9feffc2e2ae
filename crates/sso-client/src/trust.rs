//! Certificate trust policy for the TLS transport.
//!
//! Two policies exist:
//! - **Pinned**: the handshake verifies the service chain against the
//!   configured CA material (nothing from the system store is trusted).
//! - **Self-signed allowed**: chain verification is skipped. Handshake
//!   signatures are still checked, so the peer must own the key it presents.
//!
//! Either policy may additionally require an exact certificate serial.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, WebPkiSupportedAlgorithms};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tracing::warn;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

use crate::config::TrustConfig;
use crate::error::{SsoError, SsoResult};

/// Active trust policy of a client. Fixed at construction.
#[derive(Debug, Clone)]
pub enum TrustPolicy {
    /// Verify the chain against these CA certificates.
    Pinned {
        ca_certs: Vec<CertificateDer<'static>>,
        serial: Option<String>,
    },

    /// Accept any chain (trust downgrade the caller opted into).
    SelfSignedAllowed { serial: Option<String> },
}

impl TrustPolicy {
    /// Resolve the policy from configuration.
    ///
    /// A pinned policy needs a readable CA file with at least one certificate.
    pub fn from_config(trust: &TrustConfig) -> SsoResult<Self> {
        let serial = trust.cert_serial.clone().filter(|s| !s.trim().is_empty());

        if trust.self_signed {
            warn!("certificate chain verification disabled (self-signed allowed)");
            return Ok(Self::SelfSignedAllowed { serial });
        }

        let ca_file = trust
            .ca_file
            .as_deref()
            .ok_or_else(|| SsoError::config("no CA certificate file configured"))?;

        Ok(Self::Pinned {
            ca_certs: load_ca_file(ca_file)?,
            serial,
        })
    }

    /// Pinned policy from in-memory PEM material.
    pub fn pinned_pem(pem: &[u8], serial: Option<String>) -> SsoResult<Self> {
        Ok(Self::Pinned {
            ca_certs: parse_pem_certs(pem, "CA material")?,
            serial,
        })
    }

    /// Expected certificate serial, if one is pinned.
    pub fn expected_serial(&self) -> Option<&str> {
        match self {
            Self::Pinned { serial, .. } | Self::SelfSignedAllowed { serial } => serial.as_deref(),
        }
    }

    /// Build the rustls client configuration for this policy.
    pub(crate) fn client_config(&self) -> SsoResult<Arc<ClientConfig>> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| SsoError::config(format!("failed to configure TLS: {}", e)))?;

        let config = match self {
            Self::Pinned { ca_certs, .. } => {
                let mut roots = RootCertStore::empty();
                for cert in ca_certs {
                    roots.add(cert.clone()).map_err(|e| {
                        SsoError::config(format!("invalid CA certificate: {}", e))
                    })?;
                }
                builder.with_root_certificates(roots).with_no_client_auth()
            }
            Self::SelfSignedAllowed { .. } => builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyChain::new(&provider)))
                .with_no_client_auth(),
        };

        Ok(Arc::new(config))
    }

    /// Check the captured peer certificate against the pinned serial.
    pub fn verify_peer(&self, peer: Option<&CertificateDer<'_>>) -> SsoResult<()> {
        let Some(expected) = self.expected_serial() else {
            return Ok(());
        };

        let peer = peer.ok_or_else(|| SsoError::CertificateMismatch {
            expected: expected.to_string(),
            actual: "no peer certificate".to_string(),
        })?;

        let (_, cert) =
            X509Certificate::from_der(peer.as_ref()).map_err(|e| SsoError::CertificateMismatch {
                expected: expected.to_string(),
                actual: format!("unparseable certificate: {}", e),
            })?;

        let decimal = cert.tbs_certificate.serial.to_string();
        let hex = cert.tbs_certificate.raw_serial_as_string();

        if serial_matches(expected, &decimal, &hex) {
            Ok(())
        } else {
            warn!(expected = %expected, actual = %decimal, "certificate serial mismatch");
            Err(SsoError::CertificateMismatch {
                expected: expected.to_string(),
                actual: decimal,
            })
        }
    }
}

fn load_ca_file(path: &Path) -> SsoResult<Vec<CertificateDer<'static>>> {
    let file = File::open(path).map_err(|e| {
        SsoError::config(format!(
            "CA certificate file not found on {}: {}",
            path.display(),
            e
        ))
    })?;
    let mut reader = BufReader::new(file);
    collect_certs(&mut reader, &path.display().to_string())
}

fn parse_pem_certs(pem: &[u8], source: &str) -> SsoResult<Vec<CertificateDer<'static>>> {
    let mut reader = BufReader::new(pem);
    collect_certs(&mut reader, source)
}

fn collect_certs(
    reader: &mut dyn std::io::BufRead,
    source: &str,
) -> SsoResult<Vec<CertificateDer<'static>>> {
    let certs = rustls_pemfile::certs(reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SsoError::config(format!("failed to read {}: {}", source, e)))?;

    if certs.is_empty() {
        return Err(SsoError::config(format!(
            "no PEM certificate found in {}",
            source
        )));
    }
    Ok(certs)
}

/// Compare a configured serial with the peer's.
///
/// All-digit values compare as decimal; anything else (hex letters, colons,
/// `0x` prefix) compares as hex ignoring case, colons and leading zeros.
fn serial_matches(expected: &str, decimal: &str, hex: &str) -> bool {
    let expected = expected.trim();
    if expected.chars().all(|c| c.is_ascii_digit()) {
        return expected.trim_start_matches('0') == decimal.trim_start_matches('0');
    }
    let expected = expected
        .strip_prefix("0x")
        .or_else(|| expected.strip_prefix("0X"))
        .unwrap_or(expected);
    normalize_hex(expected) == normalize_hex(hex)
}

fn normalize_hex(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != ':')
        .collect::<String>()
        .to_ascii_lowercase()
        .trim_start_matches('0')
        .to_string()
}

/// Verifier that skips chain validation but still checks handshake signatures.
#[derive(Debug)]
struct AcceptAnyChain {
    algorithms: WebPkiSupportedAlgorithms,
}

impl AcceptAnyChain {
    fn new(provider: &CryptoProvider) -> Self {
        Self {
            algorithms: provider.signature_verification_algorithms,
        }
    }
}

impl ServerCertVerifier for AcceptAnyChain {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn test_cert(serial: &[u8]) -> (String, CertificateDer<'static>) {
        let mut params = rcgen::CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        params.serial_number = Some(rcgen::SerialNumber::from_slice(serial));
        let key = rcgen::KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();
        (cert.pem(), cert.der().clone())
    }

    #[test]
    fn test_serial_matches_decimal_and_hex() {
        assert!(serial_matches("66051", "66051", "01:02:03"));
        assert!(serial_matches("0x010203", "66051", "01:02:03"));
        assert!(serial_matches("0x10203", "66051", "01:02:03"));
        assert!(serial_matches("01:02:03", "66051", "01:02:03"));
        assert!(serial_matches("0A:FF", "2815", "0a:ff"));
        assert!(!serial_matches("66052", "66051", "01:02:03"));
        assert!(!serial_matches("01:02:04", "66051", "01:02:03"));
    }

    #[test]
    fn test_pinned_requires_ca_file() {
        let err = TrustPolicy::from_config(&TrustConfig::default()).unwrap_err();
        assert!(matches!(err, SsoError::Config { .. }));
    }

    #[test]
    fn test_pinned_missing_ca_file() {
        let trust = TrustConfig {
            ca_file: Some("/nonexistent/crt/prodV1/ca.crt".into()),
            ..TrustConfig::default()
        };
        let err = TrustPolicy::from_config(&trust).unwrap_err();
        assert!(err.to_string().contains("CA certificate file not found"));
    }

    #[test]
    fn test_pinned_ca_file_without_certificates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a certificate").unwrap();
        let trust = TrustConfig {
            ca_file: Some(file.path().to_path_buf()),
            ..TrustConfig::default()
        };
        let err = TrustPolicy::from_config(&trust).unwrap_err();
        assert!(err.to_string().contains("no PEM certificate"));
    }

    #[test]
    fn test_pinned_from_ca_file() {
        let (pem, _) = test_cert(&[7]);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(pem.as_bytes()).unwrap();
        let trust = TrustConfig {
            ca_file: Some(file.path().to_path_buf()),
            cert_serial: Some("7".to_string()),
            ..TrustConfig::default()
        };

        let policy = TrustPolicy::from_config(&trust).unwrap();
        assert!(matches!(policy, TrustPolicy::Pinned { ref ca_certs, .. } if ca_certs.len() == 1));
        assert_eq!(policy.expected_serial(), Some("7"));
        assert!(policy.client_config().is_ok());
    }

    #[test]
    fn test_self_signed_ignores_missing_ca() {
        let trust = TrustConfig {
            self_signed: true,
            ..TrustConfig::default()
        };
        let policy = TrustPolicy::from_config(&trust).unwrap();
        assert!(matches!(policy, TrustPolicy::SelfSignedAllowed { serial: None }));
        assert!(policy.client_config().is_ok());
    }

    #[test]
    fn test_verify_peer_serial() {
        let (pem, der) = test_cert(&[0x01, 0x02, 0x03]);

        let matching = TrustPolicy::pinned_pem(pem.as_bytes(), Some("66051".to_string())).unwrap();
        assert!(matching.verify_peer(Some(&der)).is_ok());

        let mismatching =
            TrustPolicy::pinned_pem(pem.as_bytes(), Some("12345".to_string())).unwrap();
        let err = mismatching.verify_peer(Some(&der)).unwrap_err();
        assert!(matches!(
            err,
            SsoError::CertificateMismatch { ref actual, .. } if actual == "66051"
        ));

        let missing = mismatching.verify_peer(None).unwrap_err();
        assert!(matches!(missing, SsoError::CertificateMismatch { .. }));
    }

    #[test]
    fn test_verify_peer_without_serial_accepts_anything() {
        let policy = TrustPolicy::SelfSignedAllowed { serial: None };
        assert!(policy.verify_peer(None).is_ok());
    }
}
