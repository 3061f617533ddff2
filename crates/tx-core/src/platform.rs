//! Boundary to the native dashboard platform
//!
//! The connector performs the handshake and hands back the dashboard root and
//! the native event enumeration. Every native object that can emit events
//! implements [`EventSource`]; installing a listener returns a [`CancelToken`]
//! which is the only supported way of removing it again.

use std::fmt;
use std::sync::Arc;

use crate::error::PlatformError;

/// Opaque native event-kind value supplied by the platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeEventType(Arc<str>);

impl NativeEventType {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(Arc::from(value.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NativeEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three native event values exposed once the platform is connected
#[derive(Debug, Clone)]
pub struct NativeEventTypes {
    pub filter_changed: NativeEventType,
    pub parameter_changed: NativeEventType,
    pub mark_selection_changed: NativeEventType,
}

/// Everything the platform provides when the handshake succeeds
#[derive(Clone)]
pub struct NativeContext {
    pub dashboard: Arc<dyn NativeDashboard>,
    pub event_types: NativeEventTypes,
}

/// Callback installed on a native event source. An `Err` is handed back to
/// the platform's dispatcher.
pub type NativeCallback = Arc<dyn Fn(NativeEvent) -> anyhow::Result<()> + Send + Sync>;

/// Capability returned by listener installation; calling it removes the listener
pub struct CancelToken {
    cancel: Box<dyn FnOnce() -> Result<(), PlatformError> + Send + Sync>,
}

impl CancelToken {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() -> Result<(), PlatformError> + Send + Sync + 'static,
    {
        Self {
            cancel: Box::new(cancel),
        }
    }

    /// Remove the listener. Consumes the token so it runs at most once.
    pub fn cancel(self) -> Result<(), PlatformError> {
        (self.cancel)()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CancelToken")
    }
}

/// A native object that can emit events
pub trait EventSource: Send + Sync {
    fn add_event_listener(
        &self,
        event_type: &NativeEventType,
        callback: NativeCallback,
    ) -> Result<CancelToken, PlatformError>;
}

/// Native worksheet handle
pub trait NativeWorksheet: EventSource {
    fn name(&self) -> String;

    fn sheet_type(&self) -> String {
        "worksheet".to_string()
    }

    fn parameters(&self) -> Vec<Arc<dyn NativeParameter>>;
}

/// Native parameter handle
pub trait NativeParameter: EventSource {
    fn id(&self) -> String;

    fn name(&self) -> String;

    fn current_value(&self) -> serde_json::Value;
}

/// Native filter handle; filters never emit events themselves
pub trait NativeFilter: Send + Sync {
    fn field_name(&self) -> String;

    fn filter_type(&self) -> String;
}

/// Native dashboard root
pub trait NativeDashboard: EventSource {
    fn id(&self) -> String;

    fn name(&self) -> String;

    fn worksheets(&self) -> Vec<Arc<dyn NativeWorksheet>>;

    fn parameters(&self) -> Vec<Arc<dyn NativeParameter>>;
}

/// Raw event as delivered by the platform
#[derive(Clone)]
pub struct NativeEvent {
    pub event_type: NativeEventType,
    pub worksheet: Option<Arc<dyn NativeWorksheet>>,
    pub filter: Option<Arc<dyn NativeFilter>>,
    pub parameter: Option<Arc<dyn NativeParameter>>,
}

impl NativeEvent {
    pub fn new(event_type: NativeEventType) -> Self {
        Self {
            event_type,
            worksheet: None,
            filter: None,
            parameter: None,
        }
    }

    pub fn with_worksheet(mut self, worksheet: Arc<dyn NativeWorksheet>) -> Self {
        self.worksheet = Some(worksheet);
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn NativeFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_parameter(mut self, parameter: Arc<dyn NativeParameter>) -> Self {
        self.parameter = Some(parameter);
        self
    }
}

impl fmt::Debug for NativeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeEvent")
            .field("event_type", &self.event_type)
            .field("worksheet", &self.worksheet.as_ref().map(|w| w.name()))
            .field("filter", &self.filter.as_ref().map(|f| f.field_name()))
            .field("parameter", &self.parameter.as_ref().map(|p| p.id()))
            .finish()
    }
}

/// Performs the platform handshake
#[async_trait::async_trait]
pub trait PlatformConnector: Send + Sync {
    async fn initialize(&self) -> Result<NativeContext, PlatformError>;
}
