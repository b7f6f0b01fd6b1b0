//! Console observer
//!
//! Prints every notification event to stdout. Events may arrive on the
//! iteration thread; plain line-buffered printing needs no re-marshaling.

use parley_core::events::{FriendEvent, ProfileEvent};
use parley_runtime::{FriendObserver, ProfileObserver};

pub struct ConsoleObserver;

impl ProfileObserver for ConsoleObserver {
    fn on_profile_event(&self, event: &ProfileEvent) {
        match event {
            ProfileEvent::UserNameChanged(name) => println!("* user name is now {name:?}"),
            ProfileEvent::IsOnlineChanged(true) => println!("* connected"),
            ProfileEvent::IsOnlineChanged(false) => println!("* disconnected"),
            ProfileEvent::StatusMessageChanged(message) => {
                println!("* status message is now {message:?}")
            }
            ProfileEvent::StatusChanged(status) => println!("* status is now {status}"),
        }
    }
}

impl FriendObserver for ConsoleObserver {
    fn on_friend_event(&self, event: &FriendEvent) {
        match event {
            FriendEvent::Added(friend) => println!("* friend {friend} added"),
            FriendEvent::Removed(friend) => println!("* friend {friend} removed"),
            FriendEvent::NameChanged(friend, name) => {
                println!("* friend {friend} is now known as {name:?}")
            }
            FriendEvent::StatusMessageChanged(friend, message) => {
                println!("* friend {friend} status message: {message:?}")
            }
            FriendEvent::StatusChanged(friend, status) => {
                println!("* friend {friend} is now {status}")
            }
            FriendEvent::IsOnlineChanged(friend, online) => {
                let state = if *online { "online" } else { "offline" };
                println!("* friend {friend} went {state}")
            }
            FriendEvent::IsTypingChanged(friend, typing) => {
                let state = if *typing { "typing" } else { "idle" };
                println!("* friend {friend} is {state}")
            }
            FriendEvent::MessageReceived(friend, message) => {
                println!("<{friend}> {message}")
            }
        }
    }
}
