//! Resolution of the caller's upstream credential from an incoming request.
//!
//! Issuing and decoding sessions belongs to the identity provider. The service only needs
//! the access token the provider granted, so the lookup sits behind [`CredentialResolver`]
//! and can be replaced by a resolver that decodes signed session cookies.

use axum::http::{header, HeaderMap};
use std::fmt;

/// An opaque bearer token authorizing calls to the GitHub API.
///
/// The token is only ever handed to the GitHub client. `Debug` is redacted so it cannot
/// leak through logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a token, rejecting blank values.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Maps request headers to the caller's credential.
pub trait CredentialResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<Credential>;
}

/// Reads `Authorization: Bearer <token>`, falling back to the session cookie.
pub struct HeaderCredentialResolver {
    cookie_name: String,
}

impl HeaderCredentialResolver {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
        }
    }

    fn from_authorization(headers: &HeaderMap) -> Option<Credential> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        Credential::new(token)
    }

    fn from_cookie(&self, headers: &HeaderMap) -> Option<Credential> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .and_then(|(_, token)| Credential::new(token))
    }
}

impl CredentialResolver for HeaderCredentialResolver {
    fn resolve(&self, headers: &HeaderMap) -> Option<Credential> {
        Self::from_authorization(headers).or_else(|| self.from_cookie(headers))
    }
}
