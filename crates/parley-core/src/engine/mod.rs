//! Network engine seam
//!
//! The DHT/messaging protocol itself is consumed as an opaque engine behind
//! the [`NetworkEngine`] trait: the runtime drives `iterate` on a background
//! schedule, issues queries/commands under a mutex, and forwards the events
//! the engine reports. [`LoopbackEngine`] is the in-process reference
//! implementation used by the CLI and the test suites; a real DHT engine
//! would implement the same trait.

mod loopback;

pub use loopback::{LoopbackEngine, LoopbackFactory};

use core::time::Duration;

use crate::errors::EngineError;
use crate::events::EngineEvent;
use crate::settings::NetworkSettings;
use crate::types::{FriendId, PublicKey, UserStatus};

/// Longest accepted user name, in bytes.
pub const MAX_NAME_LEN: usize = 128;
/// Longest accepted status message, in bytes.
pub const MAX_STATUS_MESSAGE_LEN: usize = 1007;
/// Longest accepted single message, in bytes.
pub const MAX_MESSAGE_LEN: usize = 1372;

// ----------------------------------------------------------------------------
// Construction
// ----------------------------------------------------------------------------

/// Parameters for constructing an engine instance
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions<'a> {
    /// Transport options, read once at construction
    pub settings: &'a NetworkSettings,
    /// Decrypted save data to restore identity from; `None` generates a
    /// fresh identity
    pub save_data: Option<&'a [u8]>,
}

/// Constructs engine instances for the session layer.
///
/// The factory is what makes the engine pluggable: the runtime never names a
/// concrete engine type, it only asks its factory for one when a profile is
/// created or activated.
pub trait EngineFactory: Send + Sync {
    fn create(&self, options: EngineOptions<'_>) -> Result<Box<dyn NetworkEngine>, EngineError>;
}

// ----------------------------------------------------------------------------
// Engine Surface
// ----------------------------------------------------------------------------

/// The opaque protocol engine owned by an active session.
///
/// All methods are synchronous and expected to be cheap; the caller holds the
/// session mutex for the duration of each call. Events produced by network
/// activity are reported through the sink passed to [`iterate`], on the
/// thread that called it.
///
/// [`iterate`]: NetworkEngine::iterate
pub trait NetworkEngine: Send {
    /// Serialize the engine state for persistence
    fn save_data(&self) -> Result<Vec<u8>, EngineError>;

    /// Preferred delay before the next [`iterate`](NetworkEngine::iterate) call
    fn iteration_interval(&self) -> Duration;

    /// Perform one protocol tick, reporting network-driven events to `sink`
    fn iterate(&mut self, sink: &mut dyn FnMut(EngineEvent));

    /// Attempt a DHT bootstrap against a known node
    fn bootstrap(
        &mut self,
        address: &str,
        port: u16,
        public_key: &PublicKey,
    ) -> Result<(), EngineError>;

    /// Register a TCP relay to fall back to when UDP is unavailable
    fn add_relay(
        &mut self,
        address: &str,
        port: u16,
        public_key: &PublicKey,
    ) -> Result<(), EngineError>;

    fn self_public_key(&self) -> PublicKey;
    fn self_nospam(&self) -> u32;
    fn is_online(&self) -> bool;

    fn self_name(&self) -> String;
    fn set_self_name(&mut self, name: &str) -> Result<(), EngineError>;

    fn self_status_message(&self) -> String;
    fn set_self_status_message(&mut self, message: &str) -> Result<(), EngineError>;

    fn self_status(&self) -> UserStatus;
    fn set_self_status(&mut self, status: UserStatus);

    /// Indices of all current friends, in ascending order
    fn friends(&self) -> Vec<FriendId>;
    fn friend_count(&self) -> usize;

    /// Add a friend by public key without sending a friend request
    fn add_friend_norequest(&mut self, public_key: &PublicKey) -> Result<FriendId, EngineError>;
    fn remove_friend(&mut self, friend: FriendId) -> Result<(), EngineError>;

    fn friend_public_key(&self, friend: FriendId) -> Result<PublicKey, EngineError>;
    fn friend_name(&self, friend: FriendId) -> Result<String, EngineError>;
    fn friend_status_message(&self, friend: FriendId) -> Result<String, EngineError>;
    fn friend_status(&self, friend: FriendId) -> Result<UserStatus, EngineError>;
    fn friend_is_online(&self, friend: FriendId) -> Result<bool, EngineError>;
    fn friend_is_typing(&self, friend: FriendId) -> Result<bool, EngineError>;

    fn send_message(&mut self, friend: FriendId, message: &str) -> Result<(), EngineError>;
}
