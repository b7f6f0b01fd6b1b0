//! Notification event types
//!
//! Two event families are fanned out to observers: profile-level events for
//! the local identity and friend-level events keyed by friend index. Engine
//! implementations report the network-driven subset as [`EngineEvent`]s;
//! locally-caused changes (a setter succeeding, a friend added or removed by
//! command) are published directly by the session layer.

use crate::types::{FriendId, UserStatus};

// ----------------------------------------------------------------------------
// Observer-Facing Events
// ----------------------------------------------------------------------------

/// State changes of the local profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileEvent {
    UserNameChanged(String),
    IsOnlineChanged(bool),
    StatusMessageChanged(String),
    StatusChanged(UserStatus),
}

/// State changes of a single friend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FriendEvent {
    Added(FriendId),
    Removed(FriendId),
    NameChanged(FriendId, String),
    StatusMessageChanged(FriendId, String),
    StatusChanged(FriendId, UserStatus),
    IsOnlineChanged(FriendId, bool),
    IsTypingChanged(FriendId, bool),
    MessageReceived(FriendId, String),
}

// ----------------------------------------------------------------------------
// Engine-Native Events
// ----------------------------------------------------------------------------

/// Events produced by the engine during a protocol tick.
///
/// These cover only changes that originate from the network; they are
/// translated into [`ProfileEvent`]/[`FriendEvent`] values on the iteration
/// thread before reaching observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    SelfOnlineChanged(bool),
    FriendOnlineChanged(FriendId, bool),
    FriendNameChanged(FriendId, String),
    FriendStatusMessageChanged(FriendId, String),
    FriendStatusChanged(FriendId, UserStatus),
    FriendTypingChanged(FriendId, bool),
    MessageReceived(FriendId, String),
}
