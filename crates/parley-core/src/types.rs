//! Core types for the Parley messenger
//!
//! This module defines the fundamental types used throughout the crate,
//! using newtype patterns for semantic validation and type safety.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

// ----------------------------------------------------------------------------
// Public Key
// ----------------------------------------------------------------------------

/// Length of a peer public key in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// A peer's long-term public key.
///
/// Rendered as a 64-character uppercase hex string, which is also the format
/// accepted when adding a friend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey([u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    /// Create a new public key from raw bytes
    pub fn new(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}

impl FromStr for PublicKey {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clean = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(clean).map_err(|_| EngineError::InvalidPublicKey)?;
        if bytes.len() != PUBLIC_KEY_LEN {
            return Err(EngineError::InvalidPublicKey);
        }

        let mut key = [0u8; PUBLIC_KEY_LEN];
        key.copy_from_slice(&bytes);
        Ok(Self(key))
    }
}

// ----------------------------------------------------------------------------
// Friend Identifier
// ----------------------------------------------------------------------------

/// Index of a friend inside the active engine's friend table.
///
/// Assigned by the engine when a friend is added; indices of removed friends
/// are reused for later additions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FriendId(u32);

impl FriendId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for FriendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// User Status
// ----------------------------------------------------------------------------

/// Self-reported availability of a profile or friend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    /// Online and available
    #[default]
    Ready,
    /// Online but away from the device
    Away,
    /// Online but does not want to be disturbed
    Busy,
}

impl UserStatus {
    /// Wire/UI representation as a small integer
    pub fn as_u8(&self) -> u8 {
        match self {
            UserStatus::Ready => 0,
            UserStatus::Away => 1,
            UserStatus::Busy => 2,
        }
    }

    /// Parse the small-integer representation; unknown values map to `Away`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => UserStatus::Ready,
            2 => UserStatus::Busy,
            _ => UserStatus::Away,
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UserStatus::Ready => "ready",
            UserStatus::Away => "away",
            UserStatus::Busy => "busy",
        };
        write!(f, "{name}")
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_key_hex_round_trip() {
        let key = PublicKey::new([0xAB; 32]);
        let text = key.to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text.parse::<PublicKey>().unwrap(), key);
    }

    #[test]
    fn test_public_key_rejects_bad_input() {
        assert!("not hex".parse::<PublicKey>().is_err());
        // Right alphabet, wrong length
        assert!("ABCD".parse::<PublicKey>().is_err());
    }

    #[test]
    fn test_user_status_integer_mapping() {
        for status in [UserStatus::Ready, UserStatus::Away, UserStatus::Busy] {
            assert_eq!(UserStatus::from_u8(status.as_u8()), status);
        }

        // Out-of-range values degrade to Away, never panic
        assert_eq!(UserStatus::from_u8(200), UserStatus::Away);
    }
}
