//! In-process reference engine
//!
//! `LoopbackEngine` implements the full [`NetworkEngine`] surface without any
//! real network I/O: identity is an ed25519 key pair, save data is a bincode
//! snapshot, bootstrap validates its arguments, and sent messages are echoed
//! back as received events on the following tick. Network-driven state
//! changes can be simulated with [`LoopbackEngine::inject_event`].

use std::collections::VecDeque;
use std::time::Duration;

use ed25519_dalek::SigningKey;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::events::EngineEvent;
use crate::settings::{NetworkSettings, MAX_PROXY_HOST_LEN};
use crate::store;
use crate::types::{FriendId, PublicKey, UserStatus};

use super::{
    EngineFactory, EngineOptions, NetworkEngine, MAX_MESSAGE_LEN, MAX_NAME_LEN,
    MAX_STATUS_MESSAGE_LEN,
};

/// Tick interval while connected
const INTERVAL_ONLINE: Duration = Duration::from_millis(50);
/// Tick interval while still establishing connectivity
const INTERVAL_CONNECTING: Duration = Duration::from_millis(20);

// ----------------------------------------------------------------------------
// Save Format
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FriendRecord {
    public_key: PublicKey,
    name: String,
    status_message: String,
    status: u8,
    #[serde(skip)]
    online: bool,
    #[serde(skip)]
    typing: bool,
}

impl FriendRecord {
    fn new(public_key: PublicKey) -> Self {
        Self {
            public_key,
            name: String::new(),
            status_message: String::new(),
            status: 0,
            online: false,
            typing: false,
        }
    }
}

/// Persistent identity snapshot; the friend table keeps its slots so indices
/// survive a save/restore cycle.
#[derive(Serialize, Deserialize)]
struct EngineSnapshot {
    secret_key: [u8; 32],
    nospam: u32,
    name: String,
    status_message: String,
    status: u8,
    friends: Vec<Option<FriendRecord>>,
}

// ----------------------------------------------------------------------------
// Loopback Engine
// ----------------------------------------------------------------------------

pub struct LoopbackEngine {
    signing_key: SigningKey,
    nospam: u32,
    name: String,
    status_message: String,
    status: UserStatus,
    friends: Vec<Option<FriendRecord>>,
    bootstrapped: bool,
    online: bool,
    pending: VecDeque<EngineEvent>,
}

impl LoopbackEngine {
    pub fn new(options: EngineOptions<'_>) -> Result<Self, EngineError> {
        Self::validate_proxy(options.settings)?;

        match options.save_data {
            Some(data) => Self::from_save(data),
            None => Ok(Self::fresh()),
        }
    }

    fn fresh() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
            nospam: rng.gen(),
            name: String::new(),
            status_message: String::new(),
            status: UserStatus::Ready,
            friends: Vec::new(),
            bootstrapped: false,
            online: false,
            pending: VecDeque::new(),
        }
    }

    fn from_save(data: &[u8]) -> Result<Self, EngineError> {
        if data.is_empty() {
            return Err(EngineError::NullArgument);
        }
        if store::is_encrypted(data) {
            return Err(EngineError::SaveStillEncrypted);
        }

        let snapshot: EngineSnapshot =
            bincode::deserialize(data).map_err(|_| EngineError::BadSaveFormat)?;

        Ok(Self {
            signing_key: SigningKey::from_bytes(&snapshot.secret_key),
            nospam: snapshot.nospam,
            name: snapshot.name,
            status_message: snapshot.status_message,
            status: UserStatus::from_u8(snapshot.status),
            friends: snapshot.friends,
            bootstrapped: false,
            online: false,
            pending: VecDeque::new(),
        })
    }

    fn validate_proxy(settings: &NetworkSettings) -> Result<(), EngineError> {
        if !settings.proxy.is_requested() {
            return Ok(());
        }
        let host = &settings.proxy.host;
        if host.is_empty() || host.len() > MAX_PROXY_HOST_LEN {
            return Err(EngineError::ProxyBadHost { host: host.clone() });
        }
        if settings.proxy.port == 0 {
            return Err(EngineError::ProxyBadPort);
        }
        Ok(())
    }

    fn check_node(address: &str, port: u16) -> Result<(), EngineError> {
        if address.is_empty() {
            return Err(EngineError::BadBootstrapHost {
                host: address.to_string(),
            });
        }
        if port == 0 {
            return Err(EngineError::BadBootstrapPort);
        }
        Ok(())
    }

    fn friend_record(&self, friend: FriendId) -> Result<&FriendRecord, EngineError> {
        self.friends
            .get(friend.index() as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or(EngineError::FriendNotFound {
                index: friend.index(),
            })
    }

    fn friend_record_mut(&mut self, friend: FriendId) -> Result<&mut FriendRecord, EngineError> {
        self.friends
            .get_mut(friend.index() as usize)
            .and_then(|slot| slot.as_mut())
            .ok_or(EngineError::FriendNotFound {
                index: friend.index(),
            })
    }

    /// Simulate a network-driven change: internal state is updated and the
    /// event is reported from the next `iterate` call.
    pub fn inject_event(&mut self, event: EngineEvent) {
        match &event {
            EngineEvent::SelfOnlineChanged(online) => self.online = *online,
            EngineEvent::FriendOnlineChanged(id, online) => {
                if let Ok(record) = self.friend_record_mut(*id) {
                    record.online = *online;
                }
            }
            EngineEvent::FriendNameChanged(id, name) => {
                if let Ok(record) = self.friend_record_mut(*id) {
                    record.name = name.clone();
                }
            }
            EngineEvent::FriendStatusMessageChanged(id, message) => {
                if let Ok(record) = self.friend_record_mut(*id) {
                    record.status_message = message.clone();
                }
            }
            EngineEvent::FriendStatusChanged(id, status) => {
                if let Ok(record) = self.friend_record_mut(*id) {
                    record.status = status.as_u8();
                }
            }
            EngineEvent::FriendTypingChanged(id, typing) => {
                if let Ok(record) = self.friend_record_mut(*id) {
                    record.typing = *typing;
                }
            }
            EngineEvent::MessageReceived(..) => {}
        }
        self.pending.push_back(event);
    }
}

impl NetworkEngine for LoopbackEngine {
    fn save_data(&self) -> Result<Vec<u8>, EngineError> {
        let snapshot = EngineSnapshot {
            secret_key: self.signing_key.to_bytes(),
            nospam: self.nospam,
            name: self.name.clone(),
            status_message: self.status_message.clone(),
            status: self.status.as_u8(),
            friends: self.friends.clone(),
        };
        bincode::serialize(&snapshot).map_err(|_| EngineError::OutOfMemory)
    }

    fn iteration_interval(&self) -> Duration {
        if self.online {
            INTERVAL_ONLINE
        } else {
            INTERVAL_CONNECTING
        }
    }

    fn iterate(&mut self, sink: &mut dyn FnMut(EngineEvent)) {
        // The first tick after a successful bootstrap brings us online.
        if self.bootstrapped && !self.online {
            self.online = true;
            sink(EngineEvent::SelfOnlineChanged(true));
        }

        while let Some(event) = self.pending.pop_front() {
            sink(event);
        }
    }

    fn bootstrap(
        &mut self,
        address: &str,
        port: u16,
        _public_key: &PublicKey,
    ) -> Result<(), EngineError> {
        Self::check_node(address, port)?;
        self.bootstrapped = true;
        Ok(())
    }

    fn add_relay(
        &mut self,
        address: &str,
        port: u16,
        _public_key: &PublicKey,
    ) -> Result<(), EngineError> {
        Self::check_node(address, port)
    }

    fn self_public_key(&self) -> PublicKey {
        PublicKey::new(self.signing_key.verifying_key().to_bytes())
    }

    fn self_nospam(&self) -> u32 {
        self.nospam
    }

    fn is_online(&self) -> bool {
        self.online
    }

    fn self_name(&self) -> String {
        self.name.clone()
    }

    fn set_self_name(&mut self, name: &str) -> Result<(), EngineError> {
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::ValueTooLong {
                max: MAX_NAME_LEN,
                actual: name.len(),
            });
        }
        self.name = name.to_string();
        Ok(())
    }

    fn self_status_message(&self) -> String {
        self.status_message.clone()
    }

    fn set_self_status_message(&mut self, message: &str) -> Result<(), EngineError> {
        if message.len() > MAX_STATUS_MESSAGE_LEN {
            return Err(EngineError::ValueTooLong {
                max: MAX_STATUS_MESSAGE_LEN,
                actual: message.len(),
            });
        }
        self.status_message = message.to_string();
        Ok(())
    }

    fn self_status(&self) -> UserStatus {
        self.status
    }

    fn set_self_status(&mut self, status: UserStatus) {
        self.status = status;
    }

    fn friends(&self) -> Vec<FriendId> {
        self.friends
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| FriendId::new(index as u32))
            .collect()
    }

    fn friend_count(&self) -> usize {
        self.friends.iter().filter(|slot| slot.is_some()).count()
    }

    fn add_friend_norequest(&mut self, public_key: &PublicKey) -> Result<FriendId, EngineError> {
        if *public_key == self.self_public_key() {
            return Err(EngineError::OwnPublicKey);
        }
        if self
            .friends
            .iter()
            .flatten()
            .any(|record| record.public_key == *public_key)
        {
            return Err(EngineError::FriendAlreadyAdded {
                key: public_key.to_string(),
            });
        }

        // Reuse the lowest free slot so indices stay dense.
        let record = FriendRecord::new(*public_key);
        for (index, slot) in self.friends.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(record);
                return Ok(FriendId::new(index as u32));
            }
        }
        self.friends.push(Some(record));
        Ok(FriendId::new((self.friends.len() - 1) as u32))
    }

    fn remove_friend(&mut self, friend: FriendId) -> Result<(), EngineError> {
        let slot = self
            .friends
            .get_mut(friend.index() as usize)
            .ok_or(EngineError::FriendNotFound {
                index: friend.index(),
            })?;
        if slot.is_none() {
            return Err(EngineError::FriendNotFound {
                index: friend.index(),
            });
        }
        *slot = None;
        Ok(())
    }

    fn friend_public_key(&self, friend: FriendId) -> Result<PublicKey, EngineError> {
        Ok(self.friend_record(friend)?.public_key)
    }

    fn friend_name(&self, friend: FriendId) -> Result<String, EngineError> {
        Ok(self.friend_record(friend)?.name.clone())
    }

    fn friend_status_message(&self, friend: FriendId) -> Result<String, EngineError> {
        Ok(self.friend_record(friend)?.status_message.clone())
    }

    fn friend_status(&self, friend: FriendId) -> Result<UserStatus, EngineError> {
        Ok(UserStatus::from_u8(self.friend_record(friend)?.status))
    }

    fn friend_is_online(&self, friend: FriendId) -> Result<bool, EngineError> {
        Ok(self.friend_record(friend)?.online)
    }

    fn friend_is_typing(&self, friend: FriendId) -> Result<bool, EngineError> {
        Ok(self.friend_record(friend)?.typing)
    }

    fn send_message(&mut self, friend: FriendId, message: &str) -> Result<(), EngineError> {
        self.friend_record(friend)?;
        if message.is_empty() {
            return Err(EngineError::MessageEmpty);
        }
        if message.len() > MAX_MESSAGE_LEN {
            return Err(EngineError::ValueTooLong {
                max: MAX_MESSAGE_LEN,
                actual: message.len(),
            });
        }

        // No real peer on the other end; echo the message back so the full
        // receive path stays exercisable.
        self.pending
            .push_back(EngineEvent::MessageReceived(friend, message.to_string()));
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Factory
// ----------------------------------------------------------------------------

/// [`EngineFactory`] producing [`LoopbackEngine`] instances
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopbackFactory;

impl EngineFactory for LoopbackFactory {
    fn create(&self, options: EngineOptions<'_>) -> Result<Box<dyn NetworkEngine>, EngineError> {
        Ok(Box::new(LoopbackEngine::new(options)?))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{ProxyConfig, ProxyKind};

    fn fresh_engine() -> LoopbackEngine {
        let settings = NetworkSettings::default();
        LoopbackEngine::new(EngineOptions {
            settings: &settings,
            save_data: None,
        })
        .unwrap()
    }

    fn collect_events(engine: &mut LoopbackEngine) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        engine.iterate(&mut |event| events.push(event));
        events
    }

    fn test_key(byte: u8) -> PublicKey {
        PublicKey::new([byte; 32])
    }

    #[test]
    fn test_save_restore_round_trip() {
        let mut engine = fresh_engine();
        engine.set_self_name("alice").unwrap();
        engine.set_self_status_message("hello").unwrap();
        engine.set_self_status(UserStatus::Busy);
        let friend = engine.add_friend_norequest(&test_key(7)).unwrap();

        let save = engine.save_data().unwrap();
        let settings = NetworkSettings::default();
        let restored = LoopbackEngine::new(EngineOptions {
            settings: &settings,
            save_data: Some(&save),
        })
        .unwrap();

        assert_eq!(restored.self_public_key(), engine.self_public_key());
        assert_eq!(restored.self_nospam(), engine.self_nospam());
        assert_eq!(restored.self_name(), "alice");
        assert_eq!(restored.self_status_message(), "hello");
        assert_eq!(restored.self_status(), UserStatus::Busy);
        assert_eq!(restored.friends(), vec![friend]);
        assert_eq!(restored.friend_public_key(friend).unwrap(), test_key(7));
    }

    #[test]
    fn test_malformed_save_rejected() {
        let settings = NetworkSettings::default();
        let result = LoopbackEngine::new(EngineOptions {
            settings: &settings,
            save_data: Some(b"definitely not a snapshot"),
        });
        assert!(matches!(result, Err(EngineError::BadSaveFormat)));
    }

    #[test]
    fn test_encrypted_save_rejected() {
        let engine = fresh_engine();
        let encrypted = store::encrypt(&engine.save_data().unwrap(), "pw").unwrap();
        let settings = NetworkSettings::default();
        let result = LoopbackEngine::new(EngineOptions {
            settings: &settings,
            save_data: Some(&encrypted),
        });
        assert!(matches!(result, Err(EngineError::SaveStillEncrypted)));
    }

    #[test]
    fn test_bad_proxy_rejected() {
        let mut settings = NetworkSettings::default();
        settings.proxy = ProxyConfig {
            kind: ProxyKind::Socks5,
            host: String::new(),
            port: 9050,
        };
        let result = LoopbackEngine::new(EngineOptions {
            settings: &settings,
            save_data: None,
        });
        assert!(matches!(result, Err(EngineError::ProxyBadHost { .. })));

        settings.proxy.host = "127.0.0.1".to_string();
        settings.proxy.port = 0;
        let result = LoopbackEngine::new(EngineOptions {
            settings: &settings,
            save_data: None,
        });
        assert!(matches!(result, Err(EngineError::ProxyBadPort)));
    }

    #[test]
    fn test_online_after_bootstrap_tick() {
        let mut engine = fresh_engine();
        assert!(!engine.is_online());
        assert!(collect_events(&mut engine).is_empty());

        engine.bootstrap("nodes.example.net", 33445, &test_key(1)).unwrap();
        let events = collect_events(&mut engine);
        assert_eq!(events, vec![EngineEvent::SelfOnlineChanged(true)]);
        assert!(engine.is_online());

        // Only reported once
        assert!(collect_events(&mut engine).is_empty());
    }

    #[test]
    fn test_bootstrap_validation() {
        let mut engine = fresh_engine();
        assert!(matches!(
            engine.bootstrap("", 33445, &test_key(1)),
            Err(EngineError::BadBootstrapHost { .. })
        ));
        assert!(matches!(
            engine.add_relay("nodes.example.net", 0, &test_key(1)),
            Err(EngineError::BadBootstrapPort)
        ));
        assert!(!engine.is_online());
    }

    #[test]
    fn test_friend_slot_reuse() {
        let mut engine = fresh_engine();
        let a = engine.add_friend_norequest(&test_key(1)).unwrap();
        let b = engine.add_friend_norequest(&test_key(2)).unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);

        engine.remove_friend(a).unwrap();
        assert_eq!(engine.friends(), vec![b]);

        // The freed slot is reused before new ones are appended
        let c = engine.add_friend_norequest(&test_key(3)).unwrap();
        assert_eq!(c.index(), 0);
        assert_eq!(engine.friend_count(), 2);
    }

    #[test]
    fn test_duplicate_and_own_key_rejected() {
        let mut engine = fresh_engine();
        engine.add_friend_norequest(&test_key(1)).unwrap();
        assert!(matches!(
            engine.add_friend_norequest(&test_key(1)),
            Err(EngineError::FriendAlreadyAdded { .. })
        ));

        let own = engine.self_public_key();
        assert!(matches!(
            engine.add_friend_norequest(&own),
            Err(EngineError::OwnPublicKey)
        ));
    }

    #[test]
    fn test_send_message_echoes_on_next_tick() {
        let mut engine = fresh_engine();
        let friend = engine.add_friend_norequest(&test_key(1)).unwrap();

        engine.send_message(friend, "ping").unwrap();
        let events = collect_events(&mut engine);
        assert_eq!(
            events,
            vec![EngineEvent::MessageReceived(friend, "ping".to_string())]
        );
    }

    #[test]
    fn test_send_message_validation() {
        let mut engine = fresh_engine();
        let friend = engine.add_friend_norequest(&test_key(1)).unwrap();

        assert!(matches!(
            engine.send_message(FriendId::new(99), "hi"),
            Err(EngineError::FriendNotFound { index: 99 })
        ));
        assert!(matches!(
            engine.send_message(friend, ""),
            Err(EngineError::MessageEmpty)
        ));
        let long = "x".repeat(MAX_MESSAGE_LEN + 1);
        assert!(matches!(
            engine.send_message(friend, &long),
            Err(EngineError::ValueTooLong { .. })
        ));
    }

    #[test]
    fn test_inject_event_updates_state() {
        let mut engine = fresh_engine();
        let friend = engine.add_friend_norequest(&test_key(1)).unwrap();

        engine.inject_event(EngineEvent::FriendNameChanged(friend, "bob".to_string()));
        engine.inject_event(EngineEvent::FriendOnlineChanged(friend, true));

        assert_eq!(engine.friend_name(friend).unwrap(), "bob");
        assert!(engine.friend_is_online(friend).unwrap());

        let events = collect_events(&mut engine);
        assert_eq!(events.len(), 2);
    }
}
