//! Notification hub
//!
//! Registry of profile- and friend-event observers and synchronous fan-out of
//! events to all of them, in registration order, on the publishing thread.
//! Observers are held as `Arc`s and identified by pointer, so registration
//! and removal are explicit calls made by whoever owns the observer, and an
//! observer removed mid-dispatch stays valid until the in-flight snapshot is
//! done with it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use parley_core::events::{FriendEvent, ProfileEvent};

// ----------------------------------------------------------------------------
// Observer Traits
// ----------------------------------------------------------------------------

/// Receives state changes of the local profile
pub trait ProfileObserver: Send + Sync {
    fn on_profile_event(&self, event: &ProfileEvent);
}

/// Receives state changes of individual friends
pub trait FriendObserver: Send + Sync {
    fn on_friend_event(&self, event: &FriendEvent);
}

// ----------------------------------------------------------------------------
// Notification Hub
// ----------------------------------------------------------------------------

/// Observer registry shared by the profile manager and every session it
/// activates; registrations outlive individual sessions.
#[derive(Default)]
pub struct NotificationHub {
    profile_observers: Mutex<Vec<Arc<dyn ProfileObserver>>>,
    friend_observers: Mutex<Vec<Arc<dyn FriendObserver>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile observer; it receives every profile event until
    /// unsubscribed.
    pub fn subscribe_profile(&self, observer: Arc<dyn ProfileObserver>) {
        lock(&self.profile_observers).push(observer);
    }

    /// Remove a profile observer. Removing an observer that is not registered
    /// is a no-op.
    pub fn unsubscribe_profile(&self, observer: &Arc<dyn ProfileObserver>) {
        lock(&self.profile_observers).retain(|existing| !Arc::ptr_eq(existing, observer));
    }

    pub fn subscribe_friend(&self, observer: Arc<dyn FriendObserver>) {
        lock(&self.friend_observers).push(observer);
    }

    pub fn unsubscribe_friend(&self, observer: &Arc<dyn FriendObserver>) {
        lock(&self.friend_observers).retain(|existing| !Arc::ptr_eq(existing, observer));
    }

    /// Deliver an event to every registered profile observer, in registration
    /// order, on the calling thread.
    ///
    /// The registry is snapshotted at entry: observers registered during the
    /// dispatch see only subsequent publishes, and observers removed during
    /// the dispatch still receive this event.
    pub fn publish_profile(&self, event: ProfileEvent) {
        let snapshot: Vec<_> = lock(&self.profile_observers).clone();
        for observer in snapshot {
            observer.on_profile_event(&event);
        }
    }

    /// Friend-event counterpart of [`publish_profile`](Self::publish_profile)
    pub fn publish_friend(&self, event: FriendEvent) {
        let snapshot: Vec<_> = lock(&self.friend_observers).clone();
        for observer in snapshot {
            observer.on_friend_event(&event);
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::types::FriendId;
    use std::sync::Mutex;

    struct Recorder {
        tag: usize,
        log: Arc<Mutex<Vec<(usize, ProfileEvent)>>>,
    }

    impl ProfileObserver for Recorder {
        fn on_profile_event(&self, event: &ProfileEvent) {
            self.log.lock().unwrap().push((self.tag, event.clone()));
        }
    }

    #[test]
    fn test_fan_out_in_registration_order() {
        let hub = NotificationHub::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in 0..3 {
            hub.subscribe_profile(Arc::new(Recorder {
                tag,
                log: Arc::clone(&log),
            }));
        }

        hub.publish_profile(ProfileEvent::IsOnlineChanged(true));

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 3);
        let order: Vec<usize> = log.iter().map(|(tag, _)| *tag).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let hub = NotificationHub::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let observer: Arc<dyn ProfileObserver> = Arc::new(Recorder {
            tag: 0,
            log: Arc::clone(&log),
        });
        hub.subscribe_profile(Arc::clone(&observer));

        hub.publish_profile(ProfileEvent::UserNameChanged("a".into()));
        hub.unsubscribe_profile(&observer);
        hub.publish_profile(ProfileEvent::UserNameChanged("b".into()));

        assert_eq!(log.lock().unwrap().len(), 1);

        // Removing again is a no-op
        hub.unsubscribe_profile(&observer);
    }

    struct SubscribingObserver {
        hub: Arc<NotificationHub>,
        log: Arc<Mutex<Vec<(usize, ProfileEvent)>>>,
    }

    impl ProfileObserver for SubscribingObserver {
        fn on_profile_event(&self, _event: &ProfileEvent) {
            self.hub.subscribe_profile(Arc::new(Recorder {
                tag: 99,
                log: Arc::clone(&self.log),
            }));
        }
    }

    #[test]
    fn test_subscribe_during_publish_is_deferred() {
        let hub = Arc::new(NotificationHub::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        hub.subscribe_profile(Arc::new(SubscribingObserver {
            hub: Arc::clone(&hub),
            log: Arc::clone(&log),
        }));

        // The observer added mid-dispatch must not see the in-flight event
        hub.publish_profile(ProfileEvent::IsOnlineChanged(true));
        assert!(log.lock().unwrap().is_empty());

        // ...but does see the next one
        hub.publish_profile(ProfileEvent::IsOnlineChanged(false));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    struct SelfRemovingObserver {
        hub: Arc<NotificationHub>,
        this: Mutex<Option<Arc<dyn ProfileObserver>>>,
        received: Arc<Mutex<usize>>,
    }

    impl ProfileObserver for SelfRemovingObserver {
        fn on_profile_event(&self, _event: &ProfileEvent) {
            *self.received.lock().unwrap() += 1;
            if let Some(this) = self.this.lock().unwrap().take() {
                self.hub.unsubscribe_profile(&this);
            }
        }
    }

    #[test]
    fn test_unsubscribe_during_publish_still_delivers_in_flight_event() {
        let hub = Arc::new(NotificationHub::new());
        let received = Arc::new(Mutex::new(0));

        let observer = Arc::new(SelfRemovingObserver {
            hub: Arc::clone(&hub),
            this: Mutex::new(None),
            received: Arc::clone(&received),
        });
        let as_dyn: Arc<dyn ProfileObserver> = observer.clone();
        *observer.this.lock().unwrap() = Some(Arc::clone(&as_dyn));
        hub.subscribe_profile(as_dyn);

        // Present at dispatch entry, so the in-flight event arrives even
        // though the observer removes itself while handling it.
        hub.publish_profile(ProfileEvent::IsOnlineChanged(true));
        assert_eq!(*received.lock().unwrap(), 1);

        // Gone for subsequent publishes
        hub.publish_profile(ProfileEvent::IsOnlineChanged(false));
        assert_eq!(*received.lock().unwrap(), 1);
    }

    struct FriendCounter {
        count: Arc<Mutex<usize>>,
    }

    impl FriendObserver for FriendCounter {
        fn on_friend_event(&self, _event: &FriendEvent) {
            *self.count.lock().unwrap() += 1;
        }
    }

    #[test]
    fn test_friend_registry_is_independent() {
        let hub = NotificationHub::new();
        let count = Arc::new(Mutex::new(0));
        hub.subscribe_friend(Arc::new(FriendCounter {
            count: Arc::clone(&count),
        }));

        // Profile events do not reach friend observers
        hub.publish_profile(ProfileEvent::IsOnlineChanged(true));
        assert_eq!(*count.lock().unwrap(), 0);

        hub.publish_friend(FriendEvent::Added(FriendId::new(0)));
        assert_eq!(*count.lock().unwrap(), 1);
    }
}
