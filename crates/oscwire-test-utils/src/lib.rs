//! Common test helpers for oscwire tests
//!
//! - Port allocation
//! - Condition-based waiting (no hardcoded sleeps)
//! - Message collectors for checking what a handler saw

use bytes::Bytes;
use oscwire_core::Message;
use parking_lot::Mutex;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// Port Allocation
// ============================================================================

/// Find an available UDP port for testing
pub fn find_available_udp_port() -> u16 {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap().port()
}

/// A loopback address on a currently free UDP port
pub fn free_loopback_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], find_available_udp_port()))
}

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Wait for a condition with timeout - condition-based, not time-based
pub fn wait_for<F>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check() {
            return true;
        }
        thread::sleep(interval);
    }
    check()
}

/// Wait for an atomic counter to reach a target value
pub fn wait_for_count(counter: &AtomicU32, target: u32, max_wait: Duration) -> bool {
    wait_for(
        || counter.load(Ordering::SeqCst) >= target,
        DEFAULT_CHECK_INTERVAL,
        max_wait,
    )
}

/// Keep calling `step` until `check` holds. For single-threaded consumers
/// such as a dispatcher that must be pumped to make progress.
pub fn pump_until<S, C>(mut step: S, check: C, max_wait: Duration) -> bool
where
    S: FnMut(),
    C: Fn() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        step();
        if check() {
            return true;
        }
        thread::sleep(DEFAULT_CHECK_INTERVAL);
    }
    false
}

// ============================================================================
// Collectors
// ============================================================================

/// Collects messages delivered to a handler, with thread-safe access
#[derive(Clone, Default)]
pub struct MessageCollector {
    messages: Arc<Mutex<Vec<Message>>>,
    count: Arc<AtomicU32>,
}

impl MessageCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler that records every message it is called with
    pub fn handler(&self) -> impl FnMut(&Message) + Send + 'static {
        let messages = self.messages.clone();
        let count = self.count.clone();
        move |msg| {
            messages.lock().push(msg.clone());
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    /// Wait for at least n messages to be collected
    pub fn wait_for_count(&self, n: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.count, n, max_wait)
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    /// Full paths of the collected messages, in arrival order
    pub fn paths(&self) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .map(|m| m.address().full_path().to_string())
            .collect()
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.messages
            .lock()
            .iter()
            .any(|m| m.address().full_path() == path)
    }

    pub fn last(&self) -> Option<Message> {
        self.messages.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
        self.count.store(0, Ordering::SeqCst);
    }
}

/// Collects raw datagrams handed to a receiver callback
#[derive(Clone, Default)]
pub struct DatagramCollector {
    datagrams: Arc<Mutex<Vec<(Vec<u8>, SocketAddr)>>>,
    count: Arc<AtomicU32>,
}

impl DatagramCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A receiver callback that records every datagram
    pub fn callback(&self) -> impl FnMut(Bytes, SocketAddr) + Send + 'static {
        let datagrams = self.datagrams.clone();
        let count = self.count.clone();
        move |data, from| {
            datagrams.lock().push((data.to_vec(), from));
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn wait_for_count(&self, n: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.count, n, max_wait)
    }

    pub fn datagrams(&self) -> Vec<(Vec<u8>, SocketAddr)> {
        self.datagrams.lock().clone()
    }
}
