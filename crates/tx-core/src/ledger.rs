//! Bookkeeping of installed listeners
//!
//! Every entry owns the cancel token of exactly one installed native listener.
//! Entries are only ever dropped after their token has been invoked.

use std::fmt;

use ahash::AHashMap;
use serde::Serialize;

use crate::error::{EventError, Result};
use crate::events::{EventKind, HandlerId};
use crate::platform::CancelToken;
use crate::targets::TargetKey;

/// Composite key of one registered subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HandlerIdentity {
    pub target: TargetKey,
    #[serde(serialize_with = "serialize_handler")]
    pub handler: HandlerId,
    pub kind: EventKind,
}

fn serialize_handler<S: serde::Serializer>(id: &HandlerId, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(id.get())
}

impl HandlerIdentity {
    pub fn new(target: TargetKey, handler: HandlerId, kind: EventKind) -> Self {
        Self {
            target,
            handler,
            kind,
        }
    }
}

impl fmt::Display for HandlerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} handler {} on {}", self.kind, self.handler, self.target)
    }
}

#[derive(Debug)]
struct LedgerEntry {
    token: CancelToken,
    /// Target the caller registered against; differs from the identity's
    /// target for fanned-out registrations
    origin: TargetKey,
}

impl LedgerEntry {
    fn matches(&self, identity: &HandlerIdentity, target: &TargetKey) -> bool {
        identity.target == *target || self.origin == *target
    }
}

/// Map from handler identity to the cancel token of its native listener
#[derive(Debug, Default)]
pub struct RegistrationLedger {
    entries: AHashMap<HandlerIdentity, LedgerEntry>,
}

impl RegistrationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, identity: &HandlerIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    /// Sorted snapshot of the live identities
    pub fn identities(&self) -> Vec<HandlerIdentity> {
        let mut ids: Vec<_> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Record a listener. An existing entry with the same identity has its
    /// listener cancelled before it is replaced.
    pub fn insert(&mut self, identity: HandlerIdentity, origin: TargetKey, token: CancelToken) {
        if let Some(previous) = self.entries.remove(&identity) {
            tracing::warn!("Replacing existing registration: {}", identity);
            cancel(&identity, previous.token);
        }
        self.entries.insert(identity, LedgerEntry { token, origin });
    }

    /// Cancel and remove the registrations of `handler` on `target`.
    ///
    /// Without `kind`, the handler must be registered for exactly one event
    /// kind on the target. Returns the number of listeners removed.
    pub fn remove(
        &mut self,
        target: &TargetKey,
        handler: HandlerId,
        kind: Option<EventKind>,
    ) -> Result<usize> {
        let matching: Vec<HandlerIdentity> = self
            .entries
            .iter()
            .filter(|(id, entry)| id.handler == handler && entry.matches(id, target))
            .filter(|(id, _)| kind.map_or(true, |k| id.kind == k))
            .map(|(id, _)| id.clone())
            .collect();

        if matching.is_empty() {
            return Err(EventError::NoSuchRegistration {
                target: target.clone(),
                handler: handler.get(),
            });
        }

        let mut kinds: Vec<EventKind> = matching.iter().map(|id| id.kind).collect();
        kinds.sort();
        kinds.dedup();
        if kinds.len() > 1 {
            return Err(EventError::AmbiguousRegistration {
                target: target.clone(),
                handler: handler.get(),
                kinds,
            });
        }

        Ok(self.cancel_all(matching))
    }

    /// Cancel and remove every registration on `target` and on the children
    /// it fanned out to. Returns the number of listeners removed.
    pub fn remove_target(&mut self, target: &TargetKey) -> usize {
        let matching: Vec<HandlerIdentity> = self
            .entries
            .iter()
            .filter(|(id, entry)| entry.matches(id, target))
            .map(|(id, _)| id.clone())
            .collect();
        self.cancel_all(matching)
    }

    /// Cancel everything
    pub fn clear(&mut self) -> usize {
        let all: Vec<HandlerIdentity> = self.entries.keys().cloned().collect();
        self.cancel_all(all)
    }

    fn cancel_all(&mut self, identities: Vec<HandlerIdentity>) -> usize {
        let mut removed = 0;
        for identity in identities {
            if let Some(entry) = self.entries.remove(&identity) {
                cancel(&identity, entry.token);
                removed += 1;
            }
        }
        removed
    }
}

fn cancel(identity: &HandlerIdentity, token: CancelToken) {
    match token.cancel() {
        Ok(()) => tracing::debug!("Cancelled listener: {}", identity),
        Err(e) => tracing::warn!("Platform failed to remove listener {}: {}", identity, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::error::PlatformError;
    use crate::events::Handler;
    use crate::targets::TargetClass;

    fn counted_token(counter: &Arc<AtomicUsize>) -> CancelToken {
        let counter = counter.clone();
        CancelToken::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn sheet(name: &str) -> TargetKey {
        TargetKey::new(TargetClass::Worksheet, name)
    }

    fn param(id: &str) -> TargetKey {
        TargetKey::new(TargetClass::Parameter, id)
    }

    #[test]
    fn test_insert_then_remove_cancels_once() {
        let cancels = Arc::new(AtomicUsize::new(0));
        let handler = Handler::new(|_| Ok(()));
        let mut ledger = RegistrationLedger::new();

        let identity = HandlerIdentity::new(sheet("W"), handler.id(), EventKind::SelectionChanged);
        ledger.insert(identity.clone(), sheet("W"), counted_token(&cancels));
        assert!(ledger.contains(&identity));

        let removed = ledger
            .remove(&sheet("W"), handler.id(), Some(EventKind::SelectionChanged))
            .unwrap();
        assert_eq!(removed, 1);
        assert!(ledger.is_empty());
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_identity_cancels_previous() {
        let cancels = Arc::new(AtomicUsize::new(0));
        let handler = Handler::new(|_| Ok(()));
        let mut ledger = RegistrationLedger::new();
        let identity = HandlerIdentity::new(sheet("W"), handler.id(), EventKind::FilterChanged);

        ledger.insert(identity.clone(), sheet("W"), counted_token(&cancels));
        ledger.insert(identity, sheet("W"), counted_token(&cancels));

        assert_eq!(ledger.len(), 1);
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_without_kind_ambiguous() {
        let cancels = Arc::new(AtomicUsize::new(0));
        let handler = Handler::new(|_| Ok(()));
        let mut ledger = RegistrationLedger::new();
        for kind in [EventKind::FilterChanged, EventKind::SelectionChanged] {
            ledger.insert(
                HandlerIdentity::new(sheet("W"), handler.id(), kind),
                sheet("W"),
                counted_token(&cancels),
            );
        }

        let err = ledger.remove(&sheet("W"), handler.id(), None).unwrap_err();
        assert!(matches!(err, EventError::AmbiguousRegistration { ref kinds, .. } if kinds.len() == 2));
        assert_eq!(ledger.len(), 2);
        assert_eq!(cancels.load(Ordering::SeqCst), 0);

        ledger
            .remove(&sheet("W"), handler.id(), Some(EventKind::FilterChanged))
            .unwrap();
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_remove_missing_registration() {
        let handler = Handler::new(|_| Ok(()));
        let mut ledger = RegistrationLedger::new();
        let err = ledger.remove(&sheet("W"), handler.id(), None).unwrap_err();
        assert!(matches!(err, EventError::NoSuchRegistration { .. }));
    }

    #[test]
    fn test_remove_target_reaches_fanned_out_children_only() {
        let cancels = Arc::new(AtomicUsize::new(0));
        let handler = Handler::new(|_| Ok(()));
        let other = Handler::new(|_| Ok(()));
        let mut ledger = RegistrationLedger::new();

        for p in ["P1", "P2"] {
            ledger.insert(
                HandlerIdentity::new(param(p), handler.id(), EventKind::ParameterChanged),
                sheet("W"),
                counted_token(&cancels),
            );
        }
        ledger.insert(
            HandlerIdentity::new(sheet("V"), other.id(), EventKind::SelectionChanged),
            sheet("V"),
            counted_token(&cancels),
        );

        assert_eq!(ledger.remove_target(&sheet("W")), 2);
        assert_eq!(cancels.load(Ordering::SeqCst), 2);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.identities()[0].target, sheet("V"));

        assert_eq!(ledger.remove_target(&sheet("W")), 0);
    }

    #[test]
    fn test_failed_cancellation_still_drops_entry() {
        let handler = Handler::new(|_| Ok(()));
        let mut ledger = RegistrationLedger::new();
        ledger.insert(
            HandlerIdentity::new(sheet("W"), handler.id(), EventKind::FilterChanged),
            sheet("W"),
            CancelToken::new(|| Err(PlatformError::Cancellation("already removed".to_string()))),
        );

        assert_eq!(ledger.clear(), 1);
        assert!(ledger.is_empty());
    }
}
