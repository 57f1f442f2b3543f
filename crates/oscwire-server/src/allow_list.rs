//! Sender allow-list

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::SocketAddr;

use oscwire_core::endpoint;

/// Endpoints a server accepts packets from.
///
/// An entry with port 0 admits every port of that address; an
/// [`ANY_ENDPOINT`](endpoint::ANY_ENDPOINT) entry admits everyone. A
/// disabled list admits everyone regardless of entries; an enabled empty
/// list admits no one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowList {
    enabled: bool,
    entries: BTreeSet<SocketAddr>,
}

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enabled list holding `entries`
    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = SocketAddr>,
    {
        let mut list = Self {
            enabled: true,
            entries: BTreeSet::new(),
        };
        for entry in entries {
            list.add(entry);
        }
        list
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Returns false if the entry was already present
    pub fn add(&mut self, entry: SocketAddr) -> bool {
        self.entries.insert(endpoint::canonical(entry))
    }

    pub fn remove(&mut self, entry: &SocketAddr) -> bool {
        self.entries.remove(&endpoint::canonical(*entry))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, entry: &SocketAddr) -> bool {
        self.entries.contains(&endpoint::canonical(*entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SocketAddr> {
        self.entries.iter()
    }

    /// Whether a packet from `sender` may be processed
    pub fn allows(&self, sender: &SocketAddr) -> bool {
        if !self.enabled {
            return true;
        }
        if self.entries.iter().any(endpoint::is_any) {
            return true;
        }

        let sender = endpoint::canonical(*sender);
        self.entries.contains(&sender) || self.entries.contains(&endpoint::with_any_port(&sender))
    }
}
