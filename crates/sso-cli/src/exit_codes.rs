//! Exit codes for the `sso` CLI.
//! These codes are part of the public contract; scripts branch on them.

pub const SUCCESS: i32 = 0;
pub const INVALID_SESSION: i32 = 1; // Token missing, expired or rejected (401)
pub const CONFIG_ERROR: i32 = 2; // Bad metadata, trust material or arguments
pub const FORBIDDEN: i32 = 3; // Identity service refused the query (403)
pub const CERT_MISMATCH: i32 = 4; // Server certificate serial differs from the pinned one
pub const TRANSPORT_ERROR: i32 = 5; // Connection, timeout or malformed response
