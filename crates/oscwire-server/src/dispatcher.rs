//! Packet queue and message routing
//!
//! The receiver thread decodes datagrams and pushes them through a
//! [`PacketSink`]; the owning thread calls [`Dispatcher::pump`] once per
//! tick to drain the queue, filter senders and invoke handlers.
//!
//! ```text
//! receiver thread              owning thread
//!   datagram -> decode -> [queue] -> allow-list -> on_bundle
//!                                              \-> messages -> on_message
//!                                                           \-> bindings
//! ```

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use oscwire_core::{codec, Bundle, Message, OscAddress, Packet};

use crate::allow_list::AllowList;
use crate::bindings::{Bindings, Handler, HandlerId};

/// Default queue bound
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Callback invoked with each allowed top-level bundle
pub type BundleHandler = Box<dyn FnMut(&Bundle) + Send + 'static>;

/// Producer half of the packet queue, handed to the receiver thread
#[derive(Clone)]
pub struct PacketSink {
    sender: mpsc::Sender<Packet>,
    dropped: Arc<AtomicU64>,
    strict: bool,
}

impl PacketSink {
    /// Decode a datagram and queue it. Malformed datagrams are logged and
    /// dropped.
    ///
    /// A bundle whose framing breaks keeps the children decoded before the
    /// break unless the sink is strict.
    pub fn push_datagram(&self, data: &[u8], from: SocketAddr) {
        let decoded = if self.strict {
            codec::decode(data, from)
        } else {
            codec::decode_lossy(data, from)
        };

        match decoded {
            Ok(packet) => self.push(packet),
            Err(e) => warn!(
                "dropping malformed datagram ({} bytes) from {}: {}",
                data.len(),
                from,
                e
            ),
        }
    }

    /// Queue an already decoded packet
    pub fn push(&self, packet: Packet) {
        match self.sender.try_send(packet) {
            Ok(()) => {}
            Err(TrySendError::Full(packet)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    "packet queue full, dropping packet from {} ({} dropped so far)",
                    packet.endpoint(),
                    total
                );
            }
            Err(TrySendError::Closed(packet)) => {
                debug!(
                    "packet queue closed, discarding packet from {}",
                    packet.endpoint()
                );
            }
        }
    }
}

/// Routes queued packets to bound handlers
pub struct Dispatcher {
    sender: mpsc::Sender<Packet>,
    receiver: mpsc::Receiver<Packet>,
    capacity: usize,
    strict: bool,
    dropped: Arc<AtomicU64>,
    allow_list: AllowList,
    bindings: Bindings,
    message_listeners: Vec<Handler>,
    bundle_listeners: Vec<BundleHandler>,
}

impl Dispatcher {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver,
            capacity,
            strict: false,
            dropped: Arc::new(AtomicU64::new(0)),
            allow_list: AllowList::new(),
            bindings: Bindings::new(),
            message_listeners: Vec::new(),
            bundle_listeners: Vec::new(),
        }
    }

    /// Reject a whole bundle on any framing error, in sinks created after
    /// this call
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// A producer handle for the current queue
    pub fn sink(&self) -> PacketSink {
        PacketSink {
            sender: self.sender.clone(),
            dropped: self.dropped.clone(),
            strict: self.strict,
        }
    }

    /// Replace the queue, discarding anything not yet pumped. Sinks handed
    /// out earlier stop delivering.
    pub fn reset_queue(&mut self) {
        let (sender, receiver) = mpsc::channel(self.capacity);
        self.sender = sender;
        self.receiver = receiver;
    }

    /// Packets rejected because the queue was full
    pub fn dropped_packets(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub fn allow_list_mut(&mut self) -> &mut AllowList {
        &mut self.allow_list
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Route messages matching `pattern` to `handler`.
    ///
    /// Handlers run grouped by pattern: patterns in the order they were
    /// first bound, and each pattern's handlers in bind order. Binding
    /// `/x/*`, `/x/y`, then `/x/*` again runs both `/x/*` handlers before
    /// the `/x/y` one for a message to `/x/y`.
    ///
    /// Returns `None` and binds nothing if `pattern` is not a valid pattern.
    pub fn bind<F>(&mut self, pattern: OscAddress, handler: F) -> Option<HandlerId>
    where
        F: FnMut(&Message) + Send + 'static,
    {
        self.bindings.bind(pattern, Box::new(handler))
    }

    pub fn unbind(&mut self, id: HandlerId) -> bool {
        self.bindings.unbind(id)
    }

    pub fn unbind_all(&mut self, pattern: &OscAddress) -> usize {
        self.bindings.unbind_all(pattern)
    }

    /// Called with every allowed message, before pattern handlers
    pub fn on_message<F>(&mut self, listener: F)
    where
        F: FnMut(&Message) + Send + 'static,
    {
        self.message_listeners.push(Box::new(listener));
    }

    /// Called with every allowed top-level bundle, before its messages
    pub fn on_bundle<F>(&mut self, listener: F)
    where
        F: FnMut(&Bundle) + Send + 'static,
    {
        self.bundle_listeners.push(Box::new(listener));
    }

    /// Whether the packet's sender passes the allow-list
    pub fn can_process(&self, packet: &Packet) -> bool {
        self.allow_list.allows(&packet.endpoint())
    }

    /// Drain the queue and dispatch; returns the number of messages routed.
    ///
    /// Never blocks. At most one queue's worth of packets is handled per
    /// call so a flooding sender cannot keep the caller here forever.
    pub fn pump(&mut self) -> usize {
        let mut routed = 0;
        for _ in 0..self.capacity {
            match self.receiver.try_recv() {
                Ok(packet) => routed += self.process(&packet),
                Err(_) => break,
            }
        }
        routed
    }

    /// Dispatch one packet immediately, bypassing the queue.
    pub fn process(&mut self, packet: &Packet) -> usize {
        if !self.can_process(packet) {
            debug!("ignoring packet from {}: not in allow-list", packet.endpoint());
            return 0;
        }

        match packet {
            Packet::Message(message) => {
                self.route(message);
                1
            }
            Packet::Bundle(bundle) => {
                for listener in &mut self.bundle_listeners {
                    listener(bundle);
                }
                let mut routed = 0;
                for message in bundle.messages() {
                    self.route(message);
                    routed += 1;
                }
                routed
            }
        }
    }

    fn route(&mut self, message: &Message) {
        for listener in &mut self.message_listeners {
            listener(message);
        }
        let invoked = self.bindings.dispatch(message);
        if invoked == 0 {
            debug!("no handler for {}", message.address());
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oscwire_core::endpoint::ANY_ENDPOINT;
    use std::sync::Mutex;

    fn msg(path: &str) -> Message {
        Message::with_path(path).unwrap()
    }

    fn from(addr: &str, message: Message) -> Packet {
        let mut packet = Packet::from(message);
        packet.set_endpoint(addr.parse().unwrap());
        packet
    }

    #[test]
    fn test_pump_empty_queue() {
        let mut d = Dispatcher::default();
        assert_eq!(d.pump(), 0);
    }

    #[test]
    fn test_fifo_across_pushes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut d = Dispatcher::new(16);
        let log = seen.clone();
        d.on_message(move |m| log.lock().unwrap().push(m.int32_at(0).unwrap()));

        let sink = d.sink();
        for i in 0..5 {
            sink.push(msg("/n").with_argument(i).into());
        }
        assert_eq!(d.pump(), 5);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_full_queue_counts_drops() {
        let mut d = Dispatcher::new(2);
        let sink = d.sink();
        for _ in 0..5 {
            sink.push(msg("/x").into());
        }
        assert_eq!(d.dropped_packets(), 3);
        assert_eq!(d.pump(), 2);
    }

    #[test]
    fn test_reset_discards_pending() {
        let mut d = Dispatcher::new(8);
        let old = d.sink();
        old.push(msg("/x").into());
        d.reset_queue();
        assert_eq!(d.pump(), 0);

        // the old sink is detached, the new one works
        old.push(msg("/x").into());
        assert_eq!(d.pump(), 0);
        d.sink().push(msg("/x").into());
        assert_eq!(d.pump(), 1);
    }

    #[test]
    fn test_malformed_datagram_not_queued() {
        let mut d = Dispatcher::new(8);
        d.sink().push_datagram(b"garbage!", ANY_ENDPOINT);
        assert_eq!(d.pump(), 0);
        assert_eq!(d.dropped_packets(), 0);
    }

    /// `[/a i:1, /b f:2.0]` with the second element's size declared 4 bytes short
    fn short_second_element() -> Vec<u8> {
        let a = msg("/a").with_argument(1);
        let second_at = 16 + 4 + a.encoded_len();
        let bundle = Bundle::immediate()
            .with_packet(a)
            .with_packet(msg("/b").with_argument(2.0f32));

        let mut bytes = Packet::from(bundle).encode().unwrap().to_vec();
        let declared = i32::from_be_bytes(bytes[second_at..second_at + 4].try_into().unwrap());
        bytes[second_at..second_at + 4].copy_from_slice(&(declared - 4).to_be_bytes());
        bytes
    }

    #[test]
    fn test_broken_bundle_keeps_decoded_siblings() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut d = Dispatcher::default();
        let log = seen.clone();
        d.on_message(move |m| log.lock().unwrap().push(m.address().to_string()));

        d.sink().push_datagram(&short_second_element(), ANY_ENDPOINT);
        assert_eq!(d.pump(), 1);
        assert_eq!(*seen.lock().unwrap(), vec!["/a"]);
    }

    #[test]
    fn test_strict_sink_drops_broken_bundle() {
        let mut d = Dispatcher::default();
        d.set_strict(true);
        d.sink().push_datagram(&short_second_element(), ANY_ENDPOINT);
        assert_eq!(d.pump(), 0);
    }

    #[test]
    fn test_allow_list_filters() {
        let count = Arc::new(AtomicU64::new(0));
        let mut d = Dispatcher::new(8);
        let c = count.clone();
        d.on_message(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let entry: SocketAddr = "1.2.3.4:9000".parse().unwrap();
        *d.allow_list_mut() = AllowList::with_entries([entry]);

        assert_eq!(d.process(&from("1.2.3.4:9000", msg("/ok"))), 1);
        assert_eq!(d.process(&from("1.2.3.4:9001", msg("/no"))), 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_bundle_listener_runs_before_messages() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut d = Dispatcher::default();

        let l = log.clone();
        d.on_bundle(move |b| l.lock().unwrap().push(format!("bundle:{}", b.len())));
        let l = log.clone();
        d.on_message(move |m| l.lock().unwrap().push(m.address().to_string()));

        let bundle = Bundle::immediate()
            .with_packet(msg("/a"))
            .with_packet(Bundle::immediate().with_packet(msg("/b")));
        assert_eq!(d.process(&Packet::from(bundle)), 2);
        assert_eq!(*log.lock().unwrap(), vec!["bundle:2", "/a", "/b"]);
    }
}
