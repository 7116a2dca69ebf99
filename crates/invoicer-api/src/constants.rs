//! API constants

/// API path prefix
pub const API_PREFIX: &str = "/api/v0";

/// Header carrying the identifier of the party requesting a write URL
pub const REQUESTER_ID_HEADER: &str = "requestId";

/// Upper bound on in-flight HTTP requests
pub const HTTP_CONCURRENCY_LIMIT: usize = 1024;

/// The API accepts no uploads itself; files go straight to object storage.
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;
