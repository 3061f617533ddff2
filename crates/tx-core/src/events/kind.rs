//! The closed set of event kinds the core understands

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EventError;

/// Abstract, platform-independent category of dashboard change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    FilterChanged,
    ParameterChanged,
    SelectionChanged,
}

impl EventKind {
    /// Every kind, in declaration order
    pub const ALL: [EventKind; 3] = [
        EventKind::FilterChanged,
        EventKind::ParameterChanged,
        EventKind::SelectionChanged,
    ];

    /// The registry name for this kind
    pub fn name(self) -> &'static str {
        match self {
            EventKind::FilterChanged => "filter_changed",
            EventKind::ParameterChanged => "parameter_changed",
            EventKind::SelectionChanged => "selection_changed",
        }
    }

    /// Resolve a name or an already-resolved kind
    pub fn resolve(spec: impl Into<EventKindSpec>) -> Result<EventKind, EventError> {
        match spec.into() {
            EventKindSpec::Kind(kind) => Ok(kind),
            EventKindSpec::Name(name) => name.parse(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| EventError::UnknownEventKind(s.to_string()))
    }
}

/// Caller-facing event kind input: either a registry name or a kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKindSpec {
    Name(String),
    Kind(EventKind),
}

impl From<EventKind> for EventKindSpec {
    fn from(kind: EventKind) -> Self {
        EventKindSpec::Kind(kind)
    }
}

impl From<&str> for EventKindSpec {
    fn from(name: &str) -> Self {
        EventKindSpec::Name(name.to_string())
    }
}

impl From<String> for EventKindSpec {
    fn from(name: String) -> Self {
        EventKindSpec::Name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_names() {
        assert_eq!(EventKind::resolve("filter_changed").unwrap(), EventKind::FilterChanged);
        assert_eq!(EventKind::resolve("parameter_changed").unwrap(), EventKind::ParameterChanged);
        assert_eq!(EventKind::resolve("selection_changed").unwrap(), EventKind::SelectionChanged);
    }

    #[test]
    fn test_resolve_passes_kind_through() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::resolve(kind).unwrap(), kind);
            assert_eq!(EventKind::resolve(kind.name()).unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_name() {
        let err = EventKind::resolve("mark_selection_changed").unwrap_err();
        assert!(matches!(err, EventError::UnknownEventKind(name) if name == "mark_selection_changed"));
    }

    #[test]
    fn test_kinds_are_ordered_and_distinct() {
        let mut kinds = EventKind::ALL.to_vec();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), 3);
        assert!(EventKind::FilterChanged < EventKind::SelectionChanged);
    }
}
