//! Identity provider seam
//!
//! Authentication itself happens outside this service. The provider only
//! answers who is making the request and where to send them to sign out.

use axum::http::{HeaderMap, HeaderName};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

// Characters left as-is in the `continue` query value; '&', '=', '?', '#'
// and spaces are escaped.
const CONTINUE_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// External collaborator resolving the signed-in user of a request
pub trait IdentityProvider: Send + Sync {
    /// Returns the identity-provider user id, or `None` for anonymous requests
    fn current_identity(&self, headers: &HeaderMap) -> Option<String>;

    /// Builds a sign-out URL that returns the user to `return_path`
    ///
    /// Implementations must escape `return_path` for use inside a query string.
    fn logout_url(&self, return_path: &str) -> String;
}

/// Trusts a user id header injected by the authenticating proxy in front of
/// the service
#[derive(Debug, Clone)]
pub struct HeaderIdentity {
    header: HeaderName,
    logout_endpoint: String,
}

impl HeaderIdentity {
    pub fn new(header: HeaderName, logout_endpoint: impl Into<String>) -> Self {
        Self {
            header,
            logout_endpoint: logout_endpoint.into(),
        }
    }
}

impl IdentityProvider for HeaderIdentity {
    fn current_identity(&self, headers: &HeaderMap) -> Option<String> {
        let value = headers.get(&self.header)?.to_str().ok()?.trim();
        if value.is_empty() {
            return None;
        }
        Some(value.to_string())
    }

    fn logout_url(&self, return_path: &str) -> String {
        format!(
            "{}?continue={}",
            self.logout_endpoint,
            utf8_percent_encode(return_path, CONTINUE_VALUE)
        )
    }
}
