//! Background iteration loop
//!
//! One worker thread per active session drives the engine's protocol tick at
//! the engine's preferred interval. Shutdown is cooperative: `stop()` clears
//! an atomic flag and joins the thread, so the worst-case latency is one
//! tick-sleep cycle, and the caller knows the loop's engine reference is gone
//! when `stop()` returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rand::Rng;
use tracing::{debug, warn};

use parley_core::bootstrap::{self, BootstrapNode};
use parley_core::engine::NetworkEngine;
use parley_core::types::PublicKey;

use crate::binding::{forward_engine_event, lock_engine, SharedEngine};
use crate::hub::NotificationHub;

/// Bootstrap entries attempted per activation
const BOOTSTRAP_ATTEMPTS: usize = 4;

// ----------------------------------------------------------------------------
// Loop State
// ----------------------------------------------------------------------------

/// Lifecycle of the iteration loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Created,
    Bootstrapped,
    Running,
    Stopped,
}

// ----------------------------------------------------------------------------
// Iteration Loop
// ----------------------------------------------------------------------------

pub struct IterationLoop {
    engine: SharedEngine,
    hub: Arc<NotificationHub>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    state: LoopState,
}

impl IterationLoop {
    pub fn new(engine: SharedEngine, hub: Arc<NotificationHub>) -> Self {
        Self {
            engine,
            hub,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
            state: LoopState::Created,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Best-effort connection attempt against the compiled-in node table.
    ///
    /// Starts at a pseudo-random offset and tries a fixed number of entries;
    /// individual failures are logged and skipped.
    pub fn bootstrap(&mut self) {
        self.bootstrap_with(bootstrap::NODES);
    }

    pub(crate) fn bootstrap_with(&mut self, nodes: &[BootstrapNode]) {
        if self.state != LoopState::Created {
            debug!(state = ?self.state, "bootstrap skipped");
            return;
        }

        if nodes.is_empty() {
            warn!("no bootstrap nodes available");
            self.state = LoopState::Bootstrapped;
            return;
        }

        let offset = rand::thread_rng().gen_range(0..nodes.len());
        let mut engine = lock_engine(&self.engine);
        for i in 0..BOOTSTRAP_ATTEMPTS.min(nodes.len()) {
            let node = &nodes[(offset + i) % nodes.len()];
            let key = match node.public_key.parse::<PublicKey>() {
                Ok(key) => key,
                Err(err) => {
                    warn!(address = node.address, %err, "skipping bootstrap node with bad key");
                    continue;
                }
            };

            if let Err(err) = engine.bootstrap(node.address, node.port, &key) {
                warn!(address = node.address, %err, "bootstrap attempt failed");
            }
            if let Err(err) = engine.add_relay(node.address, node.port, &key) {
                warn!(address = node.address, %err, "relay registration failed");
            }
        }
        drop(engine);

        self.state = LoopState::Bootstrapped;
    }

    /// Spawn the worker thread. Calling `start()` on a running loop is a
    /// no-op.
    pub fn start(&mut self) {
        if self.state == LoopState::Running {
            debug!("iteration loop already running");
            return;
        }

        self.running.store(true, Ordering::Release);

        let engine = Arc::clone(&self.engine);
        let hub = Arc::clone(&self.hub);
        let running = Arc::clone(&self.running);

        self.handle = Some(thread::spawn(move || {
            let mut events = Vec::new();
            while running.load(Ordering::Acquire) {
                let interval = {
                    let mut engine = lock_engine(&engine);
                    let interval = engine.iteration_interval();
                    engine.iterate(&mut |event| events.push(event));
                    interval
                };

                // Fan out with the engine mutex released, so an observer may
                // issue queries/commands from its callback.
                for event in events.drain(..) {
                    forward_engine_event(&hub, event);
                }
                thread::sleep(interval);
            }
        }));

        self.state = LoopState::Running;
    }

    /// Signal the worker thread to exit and wait for it.
    ///
    /// Safe to call from any thread and idempotent; on return the thread has
    /// exited and dropped its engine reference.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("iteration thread terminated with a panic");
            }
            self.state = LoopState::Stopped;
        }
    }
}

impl Drop for IterationLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::engine::{EngineOptions, LoopbackFactory, EngineFactory};
    use parley_core::settings::NetworkSettings;
    use std::sync::Mutex;
    use std::time::Duration;

    fn shared_loopback() -> SharedEngine {
        let settings = NetworkSettings::default();
        let engine = LoopbackFactory
            .create(EngineOptions {
                settings: &settings,
                save_data: None,
            })
            .unwrap();
        Arc::new(Mutex::new(engine))
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_state_machine_transitions() {
        let engine = shared_loopback();
        let hub = Arc::new(NotificationHub::new());
        let mut iteration = IterationLoop::new(Arc::clone(&engine), hub);

        assert_eq!(iteration.state(), LoopState::Created);
        iteration.bootstrap();
        assert_eq!(iteration.state(), LoopState::Bootstrapped);
        iteration.start();
        assert_eq!(iteration.state(), LoopState::Running);

        // The loop brings the engine online within a few ticks
        assert!(wait_until(|| lock_engine(&engine).is_online()));

        iteration.stop();
        assert_eq!(iteration.state(), LoopState::Stopped);
    }

    #[test]
    fn test_start_twice_is_a_no_op() {
        let engine = shared_loopback();
        let hub = Arc::new(NotificationHub::new());
        let mut iteration = IterationLoop::new(engine, hub);

        iteration.bootstrap();
        iteration.start();
        iteration.start();
        assert_eq!(iteration.state(), LoopState::Running);
        iteration.stop();
    }

    #[test]
    fn test_stop_before_start_is_safe() {
        let engine = shared_loopback();
        let hub = Arc::new(NotificationHub::new());
        let mut iteration = IterationLoop::new(engine, hub);

        iteration.stop();
        assert_eq!(iteration.state(), LoopState::Created);
    }

    #[test]
    fn test_failed_bootstrap_entry_does_not_prevent_running() {
        let engine = shared_loopback();
        let hub = Arc::new(NotificationHub::new());
        let mut iteration = IterationLoop::new(Arc::clone(&engine), hub);

        // One broken entry followed by valid ones; the failure is logged and
        // skipped.
        let nodes = [
            BootstrapNode {
                address: "broken.example.net",
                port: 0,
                public_key: "0000000000000000000000000000000000000000000000000000000000000000",
            },
            BootstrapNode {
                address: "nodes.example.net",
                port: 33445,
                public_key: "0101010101010101010101010101010101010101010101010101010101010101",
            },
        ];
        iteration.bootstrap_with(&nodes);
        assert_eq!(iteration.state(), LoopState::Bootstrapped);

        iteration.start();
        assert_eq!(iteration.state(), LoopState::Running);
        assert!(wait_until(|| lock_engine(&engine).is_online()));
        iteration.stop();
    }

    #[test]
    fn test_loop_releases_engine_reference_on_stop() {
        let engine = shared_loopback();
        let hub = Arc::new(NotificationHub::new());
        let mut iteration = IterationLoop::new(Arc::clone(&engine), hub);

        iteration.bootstrap();
        iteration.start();
        iteration.stop();

        // Only this test and the IterationLoop value itself still hold the
        // engine; the worker thread's clone is gone after the join.
        assert_eq!(Arc::strong_count(&engine), 2);
    }
}
