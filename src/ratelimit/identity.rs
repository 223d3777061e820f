//! Client identification.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::error::{Result, TurnstileError};

/// A key that identifies one caller for rate limiting purposes.
///
/// The key is taken as a trusted string; nothing here authenticates it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<IpAddr> for ClientKey {
    fn from(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }
}

impl AsRef<str> for ClientKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The parts of an incoming request that identity resolution looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Peer address of the connection, when the transport knows it
    pub remote_addr: Option<SocketAddr>,
}

impl RequestContext {
    pub fn new(remote_addr: Option<SocketAddr>) -> Self {
        Self { remote_addr }
    }
}

/// Derives a [`ClientKey`] from a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl IdentityResolver {
    /// Resolve the caller's key from its remote IP address.
    ///
    /// The port is not part of the key, so every connection from the same
    /// host shares one counter.
    pub fn resolve(&self, ctx: &RequestContext) -> Result<ClientKey> {
        ctx.remote_addr
            .map(|addr| ClientKey::from(addr.ip()))
            .ok_or(TurnstileError::IdentityUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_uses_ip_only() {
        let resolver = IdentityResolver;
        let a = RequestContext::new(Some("10.0.0.7:51000".parse().unwrap()));
        let b = RequestContext::new(Some("10.0.0.7:51001".parse().unwrap()));

        let key = resolver.resolve(&a).unwrap();
        assert_eq!(key.as_str(), "10.0.0.7");
        assert_eq!(key, resolver.resolve(&b).unwrap());
    }

    #[test]
    fn test_resolve_ipv6() {
        let ctx = RequestContext::new(Some("[::1]:8080".parse().unwrap()));
        let key = IdentityResolver.resolve(&ctx).unwrap();
        assert_eq!(key.to_string(), "::1");
    }

    #[test]
    fn test_resolve_without_address_fails() {
        let result = IdentityResolver.resolve(&RequestContext::default());
        assert!(matches!(result, Err(TurnstileError::IdentityUnavailable)));
    }
}
