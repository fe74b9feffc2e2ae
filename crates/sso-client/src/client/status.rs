//! Status mapping: the ONLY place that interprets identity service status codes.
//!
//! client/mod.rs never looks at status codes.

use crate::error::{SsoError, SsoResult};
use crate::response::HttpResponse;

/// Outcome of a token validity query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenOutcome {
    Valid,
    Invalid,
}

/// Accept a 200 response and hand back its body.
///
/// 401 → `Unauthorized`, 403 → `Forbidden`, anything else → `HttpStatus`.
pub(crate) fn expect_ok(response: HttpResponse) -> SsoResult<String> {
    match response.status {
        200 => Ok(response.body),
        401 => Err(SsoError::Unauthorized),
        403 => Err(SsoError::Forbidden),
        code => Err(SsoError::HttpStatus { code }),
    }
}

/// Interpret an `isTokenValid` answer.
///
/// A 401 is an ordinary "not authenticated", not an error. The body must
/// contain the literal `true` to count as valid.
pub(crate) fn token_outcome(response: HttpResponse) -> SsoResult<TokenOutcome> {
    match expect_ok(response) {
        Ok(body) if body.contains("true") => Ok(TokenOutcome::Valid),
        Ok(_) => Ok(TokenOutcome::Invalid),
        Err(SsoError::Unauthorized) => Ok(TokenOutcome::Invalid),
        Err(e) => Err(e),
    }
}

/// Strip the `string=` prefix from a `getCookieNameForToken` answer.
pub(crate) fn cookie_name(body: &str) -> String {
    body.strip_prefix("string=").unwrap_or(body).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            reason: String::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_token_outcome_requires_true_literal() {
        assert_eq!(
            token_outcome(response(200, "boolean=true")).unwrap(),
            TokenOutcome::Valid
        );
        assert_eq!(
            token_outcome(response(200, "boolean=false")).unwrap(),
            TokenOutcome::Invalid
        );
        assert_eq!(
            token_outcome(response(200, "")).unwrap(),
            TokenOutcome::Invalid
        );
    }

    #[test]
    fn test_token_outcome_status_mapping() {
        assert_eq!(
            token_outcome(response(401, "")).unwrap(),
            TokenOutcome::Invalid
        );
        assert!(matches!(
            token_outcome(response(403, "")),
            Err(SsoError::Forbidden)
        ));
        assert!(matches!(
            token_outcome(response(500, "boom")),
            Err(SsoError::HttpStatus { code: 500 })
        ));
    }

    #[test]
    fn test_expect_ok_keeps_401_as_error() {
        assert!(matches!(
            expect_ok(response(401, "")),
            Err(SsoError::Unauthorized)
        ));
        assert_eq!(expect_ok(response(200, "body")).unwrap(), "body");
    }

    #[test]
    fn test_cookie_name_prefix() {
        assert_eq!(cookie_name("string=iPlanetDirectoryPro"), "iPlanetDirectoryPro");
        assert_eq!(cookie_name("ssoToken"), "ssoToken");
    }
}
