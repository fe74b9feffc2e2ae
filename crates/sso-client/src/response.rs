//! HTTP/1.0-shaped response parsing.
//!
//! Grammar:
//!
//! ```text
//! response    = header-block CRLF CRLF body
//! header-block = status-line *(line-break header-line)
//! status-line = protocol SP code SP reason
//! ```
//!
//! Headers are not interpreted; the server closes the connection after the
//! body, so the body is everything after the first blank line. The header
//! block must be UTF-8; the body is decoded lossily so that one attribute
//! value in a legacy charset does not fail the whole response.

use crate::error::{SsoError, SsoResult};

const HEADER_BODY_SEPARATOR: &[u8] = b"\r\n\r\n";

/// A parsed identity service response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code from the status line.
    pub status: u16,
    /// Reason text from the status line.
    pub reason: String,
    /// Body text, trimmed. Invalid UTF-8 sequences become U+FFFD.
    pub body: String,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Parse raw response bytes.
pub fn parse(raw: &[u8]) -> SsoResult<HttpResponse> {
    let split = find_subslice(raw, HEADER_BODY_SEPARATOR)
        .ok_or_else(|| SsoError::malformed("missing header/body separator"))?;

    let header_block = &raw[..split];
    let body = &raw[split + HEADER_BODY_SEPARATOR.len()..];

    let header_text = std::str::from_utf8(header_block)
        .map_err(|_| SsoError::malformed("header block is not valid UTF-8"))?;

    let status_line = header_text
        .split(|c: char| c == '\r' || c == '\n')
        .next()
        .map(str::trim)
        .unwrap_or_default();

    let (status, reason) = parse_status_line(status_line)?;

    Ok(HttpResponse {
        status,
        reason,
        body: String::from_utf8_lossy(body).trim().to_string(),
    })
}

fn parse_status_line(line: &str) -> SsoResult<(u16, String)> {
    let mut fields = line.splitn(3, ' ');
    let (Some(protocol), Some(code), Some(reason)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(SsoError::malformed(format!(
            "status line must have protocol, code and reason: {:?}",
            line
        )));
    };

    if !protocol.starts_with("HTTP/") {
        return Err(SsoError::malformed(format!(
            "unexpected protocol in status line: {:?}",
            protocol
        )));
    }

    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SsoError::malformed(format!(
            "invalid status code: {:?}",
            code
        )));
    }
    let status = code
        .parse::<u16>()
        .map_err(|_| SsoError::malformed(format!("invalid status code: {:?}", code)))?;

    Ok((status, reason.trim().to_string()))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
