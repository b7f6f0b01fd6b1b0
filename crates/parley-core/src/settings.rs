//! Network settings consumed at engine construction time
//!
//! The settings store itself is an external collaborator; the core only reads
//! a snapshot of the transport-relevant options when an engine is built.

use serde::{Deserialize, Serialize};

/// Longest proxy hostname the engine accepts.
pub const MAX_PROXY_HOST_LEN: usize = 255;

// ----------------------------------------------------------------------------
// Proxy Configuration
// ----------------------------------------------------------------------------

/// Kind of proxy to route engine traffic through
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyKind {
    #[default]
    None,
    Http,
    Socks5,
}

/// Proxy endpoint configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub kind: ProxyKind,
    pub host: String,
    pub port: u16,
}

impl ProxyConfig {
    /// True when a proxy of some kind is requested, regardless of whether the
    /// host/port combination is usable.
    pub fn is_requested(&self) -> bool {
        self.kind != ProxyKind::None
    }

    /// True when the host/port combination is usable as given.
    pub fn is_usable(&self) -> bool {
        !self.host.is_empty() && self.host.len() <= MAX_PROXY_HOST_LEN && self.port > 0
    }
}

// ----------------------------------------------------------------------------
// Network Settings
// ----------------------------------------------------------------------------

/// Transport options read once when an engine is constructed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    pub ipv6_enabled: bool,
    pub udp_enabled: bool,
    pub proxy: ProxyConfig,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            ipv6_enabled: true,
            udp_enabled: true,
            proxy: ProxyConfig::default(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_usability() {
        let mut proxy = ProxyConfig {
            kind: ProxyKind::Socks5,
            host: "127.0.0.1".to_string(),
            port: 9050,
        };
        assert!(proxy.is_requested());
        assert!(proxy.is_usable());

        proxy.port = 0;
        assert!(!proxy.is_usable());

        proxy.port = 9050;
        proxy.host.clear();
        assert!(!proxy.is_usable());

        proxy.host = "h".repeat(MAX_PROXY_HOST_LEN + 1);
        assert!(!proxy.is_usable());
    }

    #[test]
    fn test_defaults() {
        let settings = NetworkSettings::default();
        assert!(settings.ipv6_enabled);
        assert!(settings.udp_enabled);
        assert!(!settings.proxy.is_requested());
    }
}
