//! Event kinds, typed events and user handlers

mod kind;
mod suppress;
mod typed;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub use kind::{EventKind, EventKindSpec};
pub use suppress::{suppress_duplicates, DedupCache, DUPLICATE_WINDOW};
pub use typed::{FilterChangedEvent, MarksSelectedEvent, ParameterChangedEvent, TypedEvent};

/// Callback over typed events
pub type EventCallback = Arc<dyn Fn(&TypedEvent) -> anyhow::Result<()> + Send + Sync>;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a user handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A user event handler.
///
/// Clones share the same [`HandlerId`], so keep a clone around to unregister
/// later. Handlers built separately never compare equal, even from the same
/// function.
#[derive(Clone)]
pub struct Handler {
    id: HandlerId,
    callback: EventCallback,
}

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&TypedEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            id: HandlerId(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed)),
            callback: Arc::new(f),
        }
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn call(&self, event: &TypedEvent) -> anyhow::Result<()> {
        (self.callback)(event)
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Handler {}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{NativeEvent, NativeEventType};
    use crate::sim::SimWorksheet;

    #[test]
    fn test_handler_identity() {
        let a = Handler::new(|_| Ok(()));
        let b = Handler::new(|_| Ok(()));
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn test_call_returns_handler_error() {
        let failing = Handler::new(|_| anyhow::bail!("boom"));
        let native = NativeEvent::new(NativeEventType::new("mark-selection-changed"))
            .with_worksheet(SimWorksheet::new("Orders", Vec::new()));
        let event = MarksSelectedEvent::from_native(native).unwrap();
        assert_eq!(failing.call(&event).unwrap_err().to_string(), "boom");
    }
}
