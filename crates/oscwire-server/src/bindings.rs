//! Pattern bindings
//!
//! Handlers are grouped per pattern. Patterns are kept in the order they
//! were first bound and each pattern keeps its handlers in bind order, so a
//! message fans out to every matching handler deterministically.

use oscwire_core::{Message, OscAddress};
use std::fmt;
use tracing::warn;

/// Callback invoked with each routed message
pub type Handler = Box<dyn FnMut(&Message) + Send + 'static>;

/// Identifies one bound handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler#{}", self.0)
    }
}

struct Binding {
    pattern: OscAddress,
    handlers: Vec<(HandlerId, Handler)>,
}

/// Ordered table of `(pattern, handlers)`
#[derive(Default)]
pub struct Bindings {
    entries: Vec<Binding>,
    next_id: u64,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `pattern`.
    ///
    /// Returns `None` and binds nothing if `pattern` is not a valid pattern.
    pub fn bind(&mut self, pattern: OscAddress, handler: Handler) -> Option<HandlerId> {
        if !pattern.is_valid_pattern() {
            warn!("refusing to bind invalid pattern {:?}", pattern.full_path());
            return None;
        }

        self.next_id += 1;
        let id = HandlerId(self.next_id);

        match self.entries.iter_mut().find(|b| b.pattern == pattern) {
            Some(binding) => binding.handlers.push((id, handler)),
            None => self.entries.push(Binding {
                pattern,
                handlers: vec![(id, handler)],
            }),
        }
        Some(id)
    }

    /// Remove one handler. Returns false if it was not bound.
    pub fn unbind(&mut self, id: HandlerId) -> bool {
        let mut removed = false;
        for binding in &mut self.entries {
            let before = binding.handlers.len();
            binding.handlers.retain(|(h, _)| *h != id);
            if binding.handlers.len() != before {
                removed = true;
                break;
            }
        }
        self.entries.retain(|b| !b.handlers.is_empty());
        removed
    }

    /// Remove every handler bound to `pattern`; returns how many there were.
    pub fn unbind_all(&mut self, pattern: &OscAddress) -> usize {
        let mut removed = 0;
        self.entries.retain(|b| {
            if &b.pattern == pattern {
                removed += b.handlers.len();
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of bound handlers across all patterns
    pub fn len(&self) -> usize {
        self.entries.iter().map(|b| b.handlers.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bound patterns, in first-bind order
    pub fn patterns(&self) -> impl Iterator<Item = &OscAddress> {
        self.entries.iter().map(|b| &b.pattern)
    }

    /// Call every handler whose pattern matches; returns how many ran.
    pub fn dispatch(&mut self, message: &Message) -> usize {
        let mut invoked = 0;
        for binding in &mut self.entries {
            if binding.pattern.matches(message.address()) {
                for (_, handler) in &mut binding.handlers {
                    handler(message);
                    invoked += 1;
                }
            }
        }
        invoked
    }
}
