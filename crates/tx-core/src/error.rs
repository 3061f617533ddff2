//! Error types for event registration and session handling

use thiserror::Error;

use crate::events::EventKind;
use crate::targets::{TargetClass, TargetKey};

/// Errors raised by the native platform connector
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Platform initialisation failed: {0}")]
    Initialization(String),

    #[error("Listener installation failed: {0}")]
    Listener(String),

    #[error("Listener removal failed: {0}")]
    Cancellation(String),

    #[error("Platform error: {0}")]
    Other(String),
}

/// Errors that can occur while registering or delivering events
#[derive(Error, Debug)]
pub enum EventError {
    #[error("Unrecognized event kind '{0}'. Valid kinds: filter_changed, parameter_changed, selection_changed")]
    UnknownEventKind(String),

    #[error("No platform session is available")]
    SessionNotReady,

    #[error("A session is already active; use Session::current()")]
    SessionAlreadyActive,

    #[error("No registration found for handler {handler} on {target}")]
    NoSuchRegistration { target: TargetKey, handler: u64 },

    #[error("Handler {handler} has registrations for {kinds:?} on {target}; specify the event kind")]
    AmbiguousRegistration {
        target: TargetKey,
        handler: u64,
        kinds: Vec<EventKind>,
    },

    #[error("No event wrapper registered for native event '{0}'")]
    UnknownNativeEvent(String),

    #[error("Native event '{event}' is missing its {field}")]
    MissingEventPayload { event: String, field: &'static str },

    #[error("Cannot register {kind} handlers on a {class}")]
    UnsupportedTarget { kind: EventKind, class: TargetClass },

    #[error("Native event context has already been set for this session")]
    MapperAlreadyInitialized,

    #[error("Native event '{native}' is assigned to both {first} and {second}")]
    NativeKindCollision {
        native: String,
        first: EventKind,
        second: EventKind,
    },

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

pub type Result<T, E = EventError> = std::result::Result<T, E>;
