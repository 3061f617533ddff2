//! Event core for dashboard extensions
//!
//! This crate wraps a dashboard platform's native event emitter: it maps the
//! abstract event kinds onto the platform's values, wraps raw events in typed
//! objects, keeps a ledger of installed listeners so they can be removed again,
//! and suppresses the duplicate filter events the platform is known to emit.

pub mod api;
pub mod config;
pub mod defaults;
pub mod error;
pub mod events;
pub mod ledger;
pub mod mapper;
pub mod platform;
pub mod report;
pub mod session;
pub mod sim;
pub mod targets;

// Re-export commonly used types
pub use config::SessionConfig;
pub use error::{EventError, PlatformError};
pub use events::{
    EventKind, EventKindSpec, FilterChangedEvent, Handler, HandlerId, MarksSelectedEvent,
    ParameterChangedEvent, TypedEvent,
};
pub use ledger::HandlerIdentity;
pub use report::{ErrorReporter, TracingReporter};
pub use session::{ConnectionState, Session};
pub use targets::{Dashboard, Filter, Parameter, Target, TargetClass, TargetKey, Worksheet};
