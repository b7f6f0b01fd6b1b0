//! Engine binding
//!
//! Owns the live engine handle and exposes the synchronous query/command
//! boundary between foreground callers and the iteration thread. Both sides
//! funnel every engine touch through the same mutex; individual calls are a
//! single engine operation, so hold times stay bounded.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use parley_core::engine::{EngineFactory, EngineOptions, NetworkEngine};
use parley_core::errors::EngineError;
use parley_core::events::{EngineEvent, FriendEvent, ProfileEvent};
use parley_core::settings::{NetworkSettings, ProxyConfig, MAX_PROXY_HOST_LEN};

use crate::hub::NotificationHub;

/// Engine handle shared between a session's binding and its iteration loop
pub type SharedEngine = Arc<Mutex<Box<dyn NetworkEngine>>>;

pub(crate) fn lock_engine(engine: &SharedEngine) -> MutexGuard<'_, Box<dyn NetworkEngine>> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}

// ----------------------------------------------------------------------------
// Engine Binding
// ----------------------------------------------------------------------------

pub struct EngineBinding {
    engine: SharedEngine,
    hub: Arc<NotificationHub>,
}

impl EngineBinding {
    /// Construct an engine from `save_data` (or a fresh identity when `None`)
    /// and bind it to the notification hub.
    pub fn new(
        factory: &dyn EngineFactory,
        settings: &NetworkSettings,
        save_data: Option<&[u8]>,
        hub: Arc<NotificationHub>,
    ) -> Result<Self, EngineError> {
        let effective = effective_settings(settings);
        let engine = factory.create(EngineOptions {
            settings: &effective,
            save_data,
        })?;

        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
            hub,
        })
    }

    /// Run a read-only closure against the engine under the session mutex
    pub fn execute_query<R>(&self, query: impl FnOnce(&dyn NetworkEngine) -> R) -> R {
        let guard = lock_engine(&self.engine);
        query(&**guard)
    }

    /// Run a mutating closure against the engine under the session mutex
    pub fn execute_command<R>(
        &self,
        command: impl FnOnce(&mut dyn NetworkEngine) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        let mut guard = lock_engine(&self.engine);
        command(&mut **guard)
    }

    pub fn hub(&self) -> &Arc<NotificationHub> {
        &self.hub
    }

    pub(crate) fn shared_engine(&self) -> SharedEngine {
        Arc::clone(&self.engine)
    }
}

// ----------------------------------------------------------------------------
// Settings Validation
// ----------------------------------------------------------------------------

/// Sanitize the proxy configuration before it reaches the engine.
///
/// An unusable proxy degrades to "no proxy" with a logged warning instead of
/// failing engine construction; the profile must stay usable without a
/// working proxy.
pub(crate) fn effective_settings(settings: &NetworkSettings) -> NetworkSettings {
    let mut effective = settings.clone();
    if effective.proxy.is_requested() && !effective.proxy.is_usable() {
        if effective.proxy.host.len() > MAX_PROXY_HOST_LEN {
            warn!(host = %effective.proxy.host, "proxy address is too long, disabling proxy");
        } else {
            warn!(
                host = %effective.proxy.host,
                port = effective.proxy.port,
                "incomplete proxy configuration, disabling proxy"
            );
        }
        effective.proxy = ProxyConfig::default();
    }
    effective
}

// ----------------------------------------------------------------------------
// Engine Event Adapters
// ----------------------------------------------------------------------------

/// Translate one engine-native event into its observer-facing form and push
/// it into the hub. Called on the iteration thread, once per event, with an
/// explicit hub reference captured at loop construction.
pub(crate) fn forward_engine_event(hub: &NotificationHub, event: EngineEvent) {
    match event {
        EngineEvent::SelfOnlineChanged(online) => {
            hub.publish_profile(ProfileEvent::IsOnlineChanged(online));
        }
        EngineEvent::FriendOnlineChanged(friend, online) => {
            hub.publish_friend(FriendEvent::IsOnlineChanged(friend, online));
        }
        EngineEvent::FriendNameChanged(friend, name) => {
            hub.publish_friend(FriendEvent::NameChanged(friend, name));
        }
        EngineEvent::FriendStatusMessageChanged(friend, message) => {
            hub.publish_friend(FriendEvent::StatusMessageChanged(friend, message));
        }
        EngineEvent::FriendStatusChanged(friend, status) => {
            hub.publish_friend(FriendEvent::StatusChanged(friend, status));
        }
        EngineEvent::FriendTypingChanged(friend, typing) => {
            hub.publish_friend(FriendEvent::IsTypingChanged(friend, typing));
        }
        EngineEvent::MessageReceived(friend, message) => {
            hub.publish_friend(FriendEvent::MessageReceived(friend, message));
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::engine::LoopbackFactory;
    use parley_core::settings::ProxyKind;
    use parley_core::types::FriendId;
    use std::sync::Mutex as StdMutex;

    fn binding_with_defaults() -> EngineBinding {
        EngineBinding::new(
            &LoopbackFactory,
            &NetworkSettings::default(),
            None,
            Arc::new(NotificationHub::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_query_and_command_share_one_engine() {
        let binding = binding_with_defaults();

        binding
            .execute_command(|engine| engine.set_self_name("carol"))
            .unwrap();
        let name = binding.execute_query(|engine| engine.self_name());
        assert_eq!(name, "carol");
    }

    #[test]
    fn test_unusable_proxy_degrades_to_none() {
        let mut settings = NetworkSettings::default();
        settings.proxy = ProxyConfig {
            kind: ProxyKind::Http,
            host: String::new(),
            port: 8080,
        };

        // Construction succeeds because the proxy is dropped, not forwarded
        let binding = EngineBinding::new(
            &LoopbackFactory,
            &settings,
            None,
            Arc::new(NotificationHub::new()),
        );
        assert!(binding.is_ok());

        let effective = effective_settings(&settings);
        assert!(!effective.proxy.is_requested());
    }

    #[test]
    fn test_usable_proxy_is_kept() {
        let mut settings = NetworkSettings::default();
        settings.proxy = ProxyConfig {
            kind: ProxyKind::Socks5,
            host: "127.0.0.1".to_string(),
            port: 9050,
        };
        assert_eq!(effective_settings(&settings).proxy, settings.proxy);
    }

    struct FriendLog(StdMutex<Vec<FriendEvent>>);

    impl crate::hub::FriendObserver for FriendLog {
        fn on_friend_event(&self, event: &FriendEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn test_forward_engine_event_translation() {
        let hub = NotificationHub::new();
        let log = Arc::new(FriendLog(StdMutex::new(Vec::new())));
        hub.subscribe_friend(log.clone());

        let friend = FriendId::new(3);
        forward_engine_event(&hub, EngineEvent::FriendNameChanged(friend, "dave".into()));
        forward_engine_event(&hub, EngineEvent::MessageReceived(friend, "hi".into()));

        let events = log.0.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                FriendEvent::NameChanged(friend, "dave".into()),
                FriendEvent::MessageReceived(friend, "hi".into()),
            ]
        );
    }
}
