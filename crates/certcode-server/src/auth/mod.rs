//! Authentication for the certificate server.
//!
//! Admin endpoints are gated by HTTP Basic Auth; public endpoints can
//! optionally be gated by an `X-API-Key` header. Both check against
//! [`Credentials`] loaded once at startup.

pub mod credentials;
pub mod middleware;

pub use credentials::{Credentials, CredentialsError};
pub use middleware::{API_KEY_HEADER, require_api_key, require_basic_auth};
