//! Profile session
//!
//! The live counterpart of one on-disk profile: one engine binding plus one
//! iteration loop. Every profile- and friend-level getter/setter funnels
//! through the binding's query/command boundary; commands that change
//! locally-observable state publish the matching event themselves, since the
//! engine's event path only covers network-driven changes.

use std::sync::Arc;

use tracing::warn;

use parley_core::engine::NetworkEngine;
use parley_core::errors::EngineError;
use parley_core::events::{FriendEvent, ProfileEvent};
use parley_core::types::{FriendId, PublicKey, UserStatus};

use crate::binding::EngineBinding;
use crate::hub::NotificationHub;
use crate::iteration::{IterationLoop, LoopState};

// ----------------------------------------------------------------------------
// Profile Session
// ----------------------------------------------------------------------------

pub struct ProfileSession {
    name: String,
    binding: EngineBinding,
    iteration: IterationLoop,
}

impl ProfileSession {
    pub(crate) fn new(name: String, binding: EngineBinding) -> Self {
        let iteration = IterationLoop::new(binding.shared_engine(), Arc::clone(binding.hub()));
        Self {
            name,
            binding,
            iteration,
        }
    }

    /// Bootstrap against the public node table, then begin ticking
    pub(crate) fn start(&mut self) {
        self.iteration.bootstrap();
        self.iteration.start();
    }

    /// The profile name (base name of the on-disk save)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state of the background loop
    pub fn loop_state(&self) -> LoopState {
        self.iteration.state()
    }

    fn hub(&self) -> &Arc<NotificationHub> {
        self.binding.hub()
    }

    // ------------------------------------------------------------------------
    // Profile queries
    // ------------------------------------------------------------------------

    pub fn user_name(&self) -> String {
        self.binding.execute_query(|engine| engine.self_name())
    }

    pub fn status_message(&self) -> String {
        self.binding
            .execute_query(|engine| engine.self_status_message())
    }

    pub fn status(&self) -> UserStatus {
        self.binding.execute_query(|engine| engine.self_status())
    }

    pub fn is_online(&self) -> bool {
        self.binding.execute_query(|engine| engine.is_online())
    }

    pub fn public_key(&self) -> PublicKey {
        self.binding
            .execute_query(|engine| engine.self_public_key())
    }

    pub fn nospam(&self) -> u32 {
        self.binding.execute_query(|engine| engine.self_nospam())
    }

    // ------------------------------------------------------------------------
    // Profile commands
    // ------------------------------------------------------------------------

    /// Set the user name. Publishes a `UserNameChanged` event when the value
    /// actually changes; setting the current value is a no-op.
    pub fn set_user_name(&self, name: &str) -> Result<(), EngineError> {
        if name == self.user_name() {
            return Ok(());
        }

        let result = self
            .binding
            .execute_command(|engine| engine.set_self_name(name));
        match result {
            Ok(()) => self
                .hub()
                .publish_profile(ProfileEvent::UserNameChanged(name.to_string())),
            Err(ref err) => warn!(%err, "could not set user name"),
        }
        result
    }

    /// Set the status message; same change-detection contract as
    /// [`set_user_name`](Self::set_user_name).
    pub fn set_status_message(&self, message: &str) -> Result<(), EngineError> {
        if message == self.status_message() {
            return Ok(());
        }

        let result = self
            .binding
            .execute_command(|engine| engine.set_self_status_message(message));
        match result {
            Ok(()) => self
                .hub()
                .publish_profile(ProfileEvent::StatusMessageChanged(message.to_string())),
            Err(ref err) => warn!(%err, "could not set status message"),
        }
        result
    }

    /// Set the availability status; same change-detection contract as
    /// [`set_user_name`](Self::set_user_name).
    pub fn set_status(&self, status: UserStatus) {
        if status == self.status() {
            return;
        }

        // Infallible on the engine side
        let _ = self.binding.execute_command(|engine| {
            engine.set_self_status(status);
            Ok(())
        });
        self.hub().publish_profile(ProfileEvent::StatusChanged(status));
    }

    // ------------------------------------------------------------------------
    // Friend queries
    // ------------------------------------------------------------------------

    pub fn friends(&self) -> Vec<FriendId> {
        self.binding.execute_query(|engine| engine.friends())
    }

    pub fn friend_count(&self) -> usize {
        self.binding.execute_query(|engine| engine.friend_count())
    }

    pub fn friend_public_key(&self, friend: FriendId) -> Result<PublicKey, EngineError> {
        self.binding
            .execute_query(|engine| engine.friend_public_key(friend))
    }

    pub fn friend_name(&self, friend: FriendId) -> Result<String, EngineError> {
        self.binding
            .execute_query(|engine| engine.friend_name(friend))
    }

    pub fn friend_status_message(&self, friend: FriendId) -> Result<String, EngineError> {
        self.binding
            .execute_query(|engine| engine.friend_status_message(friend))
    }

    pub fn friend_status(&self, friend: FriendId) -> Result<UserStatus, EngineError> {
        self.binding
            .execute_query(|engine| engine.friend_status(friend))
    }

    pub fn friend_is_online(&self, friend: FriendId) -> Result<bool, EngineError> {
        self.binding
            .execute_query(|engine| engine.friend_is_online(friend))
    }

    pub fn friend_is_typing(&self, friend: FriendId) -> Result<bool, EngineError> {
        self.binding
            .execute_query(|engine| engine.friend_is_typing(friend))
    }

    // ------------------------------------------------------------------------
    // Friend commands
    // ------------------------------------------------------------------------

    /// Add a friend by public key without sending a request (e.g. when
    /// importing a friend from another profile). Publishes `Added` on
    /// success.
    pub fn add_friend_norequest(&self, public_key: &PublicKey) -> Result<FriendId, EngineError> {
        let result = self
            .binding
            .execute_command(|engine| engine.add_friend_norequest(public_key));
        match result {
            Ok(friend) => self.hub().publish_friend(FriendEvent::Added(friend)),
            Err(ref err) => warn!(key = %public_key, %err, "could not add friend"),
        }
        result
    }

    /// Remove a friend. Publishes `Removed` on success.
    pub fn remove_friend(&self, friend: FriendId) -> Result<(), EngineError> {
        let result = self
            .binding
            .execute_command(|engine| engine.remove_friend(friend));
        match result {
            Ok(()) => self.hub().publish_friend(FriendEvent::Removed(friend)),
            Err(ref err) => warn!(%friend, %err, "could not remove friend"),
        }
        result
    }

    /// Send a message to a friend. Failures are returned to the caller and
    /// never tear down the session.
    pub fn send_message(&self, friend: FriendId, message: &str) -> Result<(), EngineError> {
        let result = self
            .binding
            .execute_command(|engine| engine.send_message(friend, message));
        if let Err(ref err) = result {
            warn!(%friend, %err, "sending message failed");
        }
        result
    }
}

impl Drop for ProfileSession {
    fn drop(&mut self) {
        // Join the iteration thread before the engine handle goes away.
        self.iteration.stop();
    }
}
