//! Parley Core
//!
//! This crate provides the foundational pieces of the Parley peer-to-peer
//! messenger: domain types, the error taxonomy, notification event types, the
//! network-engine seam, encrypted profile storage, and the compiled-in
//! bootstrap node table. The runtime crate builds the session machinery on
//! top of these.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod bootstrap;
pub mod engine;
pub mod errors;
pub mod events;
pub mod settings;
pub mod store;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use engine::{EngineFactory, EngineOptions, LoopbackEngine, LoopbackFactory, NetworkEngine};
pub use errors::{CryptoError, EngineError, ParleyError, StorageError};
pub use events::{EngineEvent, FriendEvent, ProfileEvent};
pub use settings::{NetworkSettings, ProxyConfig, ProxyKind};
pub use types::{FriendId, PublicKey, UserStatus};

pub type Result<T> = core::result::Result<T, ParleyError>;
