//! Page origin and identity-provider selection.
//!
//! The client never hard-codes where users log in. Each `login()` asks an
//! [`OriginSource`] for the origin the application is currently served from
//! and picks the identity provider from that:
//!
//! ```text
//! http://localhost:3000            → http://<local_provider_id>.localhost:<port>
//! http://app.localhost:4943        → http://<local_provider_id>.localhost:<port>
//! http://127.0.0.1:8080            → http://<local_provider_id>.localhost:<port>
//! https://token.example.org        → https://identity.ic0.app
//! ```

use std::fmt;
use std::net::IpAddr;
use std::sync::RwLock;

use thiserror::Error;
use url::Url;

/// The production Internet Identity front end.
pub const PRODUCTION_PROVIDER_URL: &str = "https://identity.ic0.app";

/// Errors that can occur when parsing a page origin.
#[derive(Debug, Error, PartialEq)]
pub enum OriginError {
    #[error("invalid origin '{0}': {1}")]
    Invalid(String, String),

    #[error("origin has no hostname: '{0}'")]
    MissingHost(String),
}

/// Where the application is being served from, e.g. `http://localhost:3000`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOrigin {
    url: Url,
}

impl PageOrigin {
    /// Parse an origin or full page URL. Path and query are ignored.
    pub fn parse(s: &str) -> Result<Self, OriginError> {
        let url = Url::parse(s.trim())
            .map_err(|e| OriginError::Invalid(s.to_string(), e.to_string()))?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(OriginError::MissingHost(s.to_string()));
        }
        Ok(Self { url })
    }

    pub fn hostname(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Whether this origin is a local development host.
    pub fn is_local(&self) -> bool {
        is_local_hostname(self.hostname())
    }
}

impl fmt::Display for PageOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url.origin().ascii_serialization())
    }
}

/// `localhost`, any `*.localhost` name, or a loopback IP literal.
pub fn is_local_hostname(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let lower = host.to_ascii_lowercase();
    if lower == "localhost" || lower.ends_with(".localhost") {
        return true;
    }
    host.parse::<IpAddr>().map(|ip| ip.is_loopback()).unwrap_or(false)
}

/// The identity provider chosen for one login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEndpoint {
    /// A provider canister on the developer's local replica.
    Local(String),
    /// The fixed production provider.
    Production(String),
}

impl ProviderEndpoint {
    /// Pick the provider for `origin`.
    pub fn select(origin: &PageOrigin, local_provider_id: &str, local_port: u16) -> Self {
        if origin.is_local() {
            ProviderEndpoint::Local(format!("http://{local_provider_id}.localhost:{local_port}"))
        } else {
            ProviderEndpoint::Production(PRODUCTION_PROVIDER_URL.to_string())
        }
    }

    pub fn url(&self) -> &str {
        match self {
            ProviderEndpoint::Local(url) | ProviderEndpoint::Production(url) => url,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ProviderEndpoint::Local(_))
    }
}

impl fmt::Display for ProviderEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url())
    }
}

/// Supplies the current page origin. Consulted on every login.
pub trait OriginSource: Send + Sync {
    fn current_origin(&self) -> PageOrigin;
}

impl OriginSource for PageOrigin {
    fn current_origin(&self) -> PageOrigin {
        self.clone()
    }
}

/// An origin the host can update, e.g. after client-side navigation.
#[derive(Debug)]
pub struct MutableOrigin {
    inner: RwLock<PageOrigin>,
}

impl MutableOrigin {
    pub fn new(origin: PageOrigin) -> Self {
        Self {
            inner: RwLock::new(origin),
        }
    }

    pub fn set(&self, origin: PageOrigin) {
        *self.inner.write().unwrap() = origin;
    }
}

impl OriginSource for MutableOrigin {
    fn current_origin(&self) -> PageOrigin {
        self.inner.read().unwrap().clone()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const II: &str = "rdmx6-jaaaa-aaaaa-aaadq-cai";

    fn select(origin: &str) -> ProviderEndpoint {
        ProviderEndpoint::select(&PageOrigin::parse(origin).unwrap(), II, 4943)
    }

    #[test]
    fn localhost_selects_local_provider() {
        assert_eq!(
            select("http://localhost:3000"),
            ProviderEndpoint::Local("http://rdmx6-jaaaa-aaaaa-aaadq-cai.localhost:4943".into())
        );
    }

    #[test]
    fn dot_localhost_subdomain_is_local() {
        assert!(select("http://uxrrr-q7777-77774-qaaaq-cai.localhost:4943/").is_local());
    }

    #[test]
    fn loopback_addresses_are_local() {
        assert!(select("http://127.0.0.1:8080").is_local());
        assert!(select("http://[::1]:8080").is_local());
    }

    #[test]
    fn production_origin_selects_fixed_provider() {
        let endpoint = select("https://token.example.org/explorer");
        assert_eq!(endpoint, ProviderEndpoint::Production(PRODUCTION_PROVIDER_URL.into()));
    }

    #[test]
    fn lookalike_hosts_are_not_local() {
        assert!(!select("https://localhost.example.org").is_local());
        assert!(!select("https://mylocalhost").is_local());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(PageOrigin::parse("not a url"), Err(OriginError::Invalid(..))));
    }

    #[test]
    fn display_is_bare_origin() {
        let origin = PageOrigin::parse("http://localhost:3000/some/page?x=1").unwrap();
        assert_eq!(origin.to_string(), "http://localhost:3000");
    }

    #[test]
    fn mutable_origin_reflects_updates() {
        let source = MutableOrigin::new(PageOrigin::parse("http://localhost:3000").unwrap());
        assert!(source.current_origin().is_local());
        source.set(PageOrigin::parse("https://token.example.org").unwrap());
        assert!(!source.current_origin().is_local());
    }
}
