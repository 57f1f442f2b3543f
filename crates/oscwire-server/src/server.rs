//! OSC server: a [`UdpReceiver`] feeding a [`Dispatcher`]

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::info;

use oscwire_core::{Bundle, Message, OscAddress};
use oscwire_transport::{ReceiverConfig, UdpReceiver};

use crate::allow_list::AllowList;
use crate::bindings::HandlerId;
use crate::dispatcher::{Dispatcher, DEFAULT_QUEUE_CAPACITY};
use crate::error::{Result, ServerError};

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket and receive-thread settings
    #[serde(default)]
    pub receiver: ReceiverConfig,
    /// Packets buffered between the receiver thread and `pump`
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Only accept senders listed in `allow_list`
    #[serde(default)]
    pub allow_list_enabled: bool,
    #[serde(default)]
    pub allow_list: Vec<SocketAddr>,
    /// Drop a whole bundle when its framing breaks instead of keeping the
    /// children decoded before the break
    #[serde(default)]
    pub strict_bundles: bool,
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            receiver: ReceiverConfig::default(),
            queue_capacity: default_queue_capacity(),
            allow_list_enabled: false,
            allow_list: Vec::new(),
            strict_bundles: false,
        }
    }
}

impl ServerConfig {
    /// Default config listening on `endpoint`
    pub fn with_endpoint(endpoint: SocketAddr) -> Self {
        Self {
            receiver: ReceiverConfig::with_endpoint(endpoint),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(ServerError::Config("queue_capacity must be at least 1".to_string()));
        }
        if self.receiver.max_datagram_size == 0 {
            return Err(ServerError::Config(
                "receiver.max_datagram_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Receives, filters and routes OSC packets.
///
/// Datagrams are decoded on the receiver thread; handlers only ever run
/// inside [`pump`](Self::pump), on the caller's thread.
pub struct OscServer {
    receiver: UdpReceiver,
    dispatcher: Dispatcher,
}

impl OscServer {
    pub fn new(config: ServerConfig) -> Result<Self> {
        config.validate()?;

        let mut dispatcher = Dispatcher::new(config.queue_capacity);
        dispatcher.set_strict(config.strict_bundles);

        let allow_list = dispatcher.allow_list_mut();
        allow_list.set_enabled(config.allow_list_enabled);
        for entry in config.allow_list {
            allow_list.add(entry);
        }

        Ok(Self {
            receiver: UdpReceiver::new(config.receiver),
            dispatcher,
        })
    }

    /// Start receiving; returns the bound address.
    pub fn listen(&mut self) -> Result<SocketAddr> {
        let sink = self.dispatcher.sink();
        let addr = self
            .receiver
            .listen(move |data, from| sink.push_datagram(&data, from))?;
        info!("OSC server listening on {}", addr);
        Ok(addr)
    }

    /// Stop receiving and discard packets not yet pumped
    pub fn stop(&mut self) {
        self.receiver.stop();
        self.dispatcher.reset_queue();
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_active()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.receiver.local_addr()
    }

    /// Dispatch everything queued so far; returns the number of messages routed.
    pub fn pump(&mut self) -> usize {
        self.dispatcher.pump()
    }

    pub fn bind<F>(&mut self, pattern: OscAddress, handler: F) -> Option<HandlerId>
    where
        F: FnMut(&Message) + Send + 'static,
    {
        self.dispatcher.bind(pattern, handler)
    }

    /// Parse `pattern` and bind `handler` to it
    pub fn bind_path<F>(&mut self, pattern: &str, handler: F) -> Result<HandlerId>
    where
        F: FnMut(&Message) + Send + 'static,
    {
        let parsed = OscAddress::parse(pattern)?;
        self.dispatcher.bind(parsed, handler).ok_or_else(|| {
            ServerError::Core(oscwire_core::Error::MalformedAddress(format!(
                "{} is not a valid pattern",
                pattern
            )))
        })
    }

    pub fn unbind(&mut self, id: HandlerId) -> bool {
        self.dispatcher.unbind(id)
    }

    pub fn unbind_all(&mut self, pattern: &OscAddress) -> usize {
        self.dispatcher.unbind_all(pattern)
    }

    pub fn on_message<F>(&mut self, listener: F)
    where
        F: FnMut(&Message) + Send + 'static,
    {
        self.dispatcher.on_message(listener);
    }

    pub fn on_bundle<F>(&mut self, listener: F)
    where
        F: FnMut(&Bundle) + Send + 'static,
    {
        self.dispatcher.on_bundle(listener);
    }

    pub fn allow_list(&self) -> &AllowList {
        self.dispatcher.allow_list()
    }

    pub fn allow_list_mut(&mut self) -> &mut AllowList {
        self.dispatcher.allow_list_mut()
    }

    pub fn dropped_packets(&self) -> u64 {
        self.dispatcher.dropped_packets()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }
}
