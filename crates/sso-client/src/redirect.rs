//! Login/logout redirect targets.

/// Form-urlencode a value (space becomes `+`).
pub fn urlencode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// `<base>?goto=<urlencoded goto>`.
pub fn with_goto(base: &str, goto: &str) -> String {
    format!("{}?goto={}", base, urlencode(goto))
}
