//! Compiled-in bootstrap node table
//!
//! A fixed rotating set of public relay/bootstrap nodes used for the
//! best-effort connection attempt before the iteration loop starts. Not
//! user-configurable.

/// One known bootstrap node
#[derive(Debug, Clone, Copy)]
pub struct BootstrapNode {
    pub address: &'static str,
    pub port: u16,
    /// Long-term public key, 64 hex characters
    pub public_key: &'static str,
}

/// Known public bootstrap nodes
pub const NODES: &[BootstrapNode] = &[
    BootstrapNode {
        address: "node.tox.biribiri.org",
        port: 33445,
        public_key: "F404ABAA1C99A9D37D61AB54898F56793E1DEF8BD46B1038B9D822E8460FAB67",
    },
    BootstrapNode {
        address: "nodes.tox.chat",
        port: 33445,
        public_key: "6FC41E2BD381D37E9748FC0E0328CE086AF9598BECC8FEB7DDF2E440475F300E",
    },
    BootstrapNode {
        address: "130.133.110.14",
        port: 33445,
        public_key: "461FA3776EF0FA655F1A05477DF1B3B614F7D6B124F7DB1DD4FE3C08B03B640F",
    },
    BootstrapNode {
        address: "205.185.116.116",
        port: 33445,
        public_key: "A179B09749AC826FF01F37A9613F6B57118AE014D4196A0E1105A98F93A54702",
    },
    BootstrapNode {
        address: "198.98.51.198",
        port: 33445,
        public_key: "1D5A5F2F5D6233058BF0259B09622FB40B482E4FA0931EB8FD3AB8E7BF7DAF6F",
    },
    BootstrapNode {
        address: "85.172.30.117",
        port: 33445,
        public_key: "8E7D0B859922EF569298B4D261A8CCB5FEA14FB91ED412A7603A585A25698832",
    },
    BootstrapNode {
        address: "tox.verdict.gg",
        port: 33445,
        public_key: "1C5293AEF2114717547B39DA8EA6F1E331E5E358B35F9B6B5F19317911C5F976",
    },
    BootstrapNode {
        address: "tox.initramfs.io",
        port: 33445,
        public_key: "3F0A45A268367C1BEA652F258C85F4A66DA76BCAA667A49E770BCC4917AB6A25",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PublicKey;

    #[test]
    fn test_node_table_is_well_formed() {
        assert!(!NODES.is_empty());
        for node in NODES {
            assert!(!node.address.is_empty());
            assert!(node.port > 0);
            assert!(node.public_key.parse::<PublicKey>().is_ok(), "{}", node.address);
        }
    }
}
