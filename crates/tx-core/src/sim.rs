//! In-memory dashboard platform
//!
//! Stands in for the real extension host: it keeps installed listeners,
//! dispatches events to them the way the host does (including repeated
//! filter events), and counts listener removals. Used by the demo binary and
//! the test suites.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::error::PlatformError;
use crate::platform::{
    CancelToken, EventSource, NativeCallback, NativeContext, NativeDashboard, NativeEvent,
    NativeEventType, NativeEventTypes, NativeFilter, NativeParameter, NativeWorksheet,
    PlatformConnector,
};
use crate::report::ErrorReporter;

/// Native event values used by the simulated host
pub fn native_event_types() -> NativeEventTypes {
    NativeEventTypes {
        filter_changed: NativeEventType::new("filter-changed"),
        parameter_changed: NativeEventType::new("parameter-changed"),
        mark_selection_changed: NativeEventType::new("mark-selection-changed"),
    }
}

#[derive(Default)]
struct ListenerSet {
    next_id: u64,
    listeners: Vec<(u64, NativeEventType, NativeCallback)>,
    cancellations: usize,
}

/// Listener storage shared by every simulated event source
#[derive(Default, Clone)]
pub struct SimEmitter {
    inner: Arc<Mutex<ListenerSet>>,
}

impl SimEmitter {
    fn add(&self, event_type: &NativeEventType, callback: NativeCallback) -> CancelToken {
        let id = {
            let mut set = self.inner.lock();
            set.next_id += 1;
            let id = set.next_id;
            set.listeners.push((id, event_type.clone(), callback));
            id
        };

        let inner = self.inner.clone();
        CancelToken::new(move || {
            let mut set = inner.lock();
            let before = set.listeners.len();
            set.listeners.retain(|(listener, _, _)| *listener != id);
            if set.listeners.len() < before {
                set.cancellations += 1;
            }
            Ok(())
        })
    }

    /// Deliver `event` to every listener of its type, returning the errors the
    /// callbacks raised
    pub fn emit(&self, event: NativeEvent) -> Vec<anyhow::Error> {
        // Snapshot so callbacks can remove listeners while we dispatch
        let callbacks: Vec<NativeCallback> = self
            .inner
            .lock()
            .listeners
            .iter()
            .filter(|(_, ty, _)| *ty == event.event_type)
            .map(|(_, _, cb)| cb.clone())
            .collect();

        callbacks
            .into_iter()
            .filter_map(|cb| cb(event.clone()).err())
            .collect()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    pub fn cancellations(&self) -> usize {
        self.inner.lock().cancellations
    }
}

/// Simulated parameter
pub struct SimParameter {
    id: String,
    name: String,
    value: RwLock<serde_json::Value>,
    emitter: SimEmitter,
}

impl SimParameter {
    pub fn new(id: &str, name: &str, value: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            name: name.to_string(),
            value: RwLock::new(value),
            emitter: SimEmitter::default(),
        })
    }
}

impl EventSource for SimParameter {
    fn add_event_listener(
        &self,
        event_type: &NativeEventType,
        callback: NativeCallback,
    ) -> Result<CancelToken, PlatformError> {
        Ok(self.emitter.add(event_type, callback))
    }
}

impl NativeParameter for SimParameter {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn current_value(&self) -> serde_json::Value {
        self.value.read().clone()
    }
}

/// Simulated filter
pub struct SimFilter {
    field_name: String,
    filter_type: String,
}

impl SimFilter {
    pub fn new(field_name: &str, filter_type: &str) -> Arc<Self> {
        Arc::new(Self {
            field_name: field_name.to_string(),
            filter_type: filter_type.to_string(),
        })
    }
}

impl NativeFilter for SimFilter {
    fn field_name(&self) -> String {
        self.field_name.clone()
    }

    fn filter_type(&self) -> String {
        self.filter_type.clone()
    }
}

/// Simulated worksheet
pub struct SimWorksheet {
    name: String,
    parameters: Vec<Arc<SimParameter>>,
    emitter: SimEmitter,
    rejection: Mutex<Option<String>>,
}

impl SimWorksheet {
    pub fn new(name: &str, parameters: Vec<Arc<SimParameter>>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            parameters,
            emitter: SimEmitter::default(),
            rejection: Mutex::new(None),
        })
    }

    /// Refuse every later listener installation with `reason`
    pub fn reject_listeners(&self, reason: &str) {
        *self.rejection.lock() = Some(reason.to_string());
    }
}

impl EventSource for SimWorksheet {
    fn add_event_listener(
        &self,
        event_type: &NativeEventType,
        callback: NativeCallback,
    ) -> Result<CancelToken, PlatformError> {
        if let Some(reason) = self.rejection.lock().clone() {
            return Err(PlatformError::Listener(reason));
        }
        Ok(self.emitter.add(event_type, callback))
    }
}

impl NativeWorksheet for SimWorksheet {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn parameters(&self) -> Vec<Arc<dyn NativeParameter>> {
        self.parameters
            .iter()
            .map(|p| p.clone() as Arc<dyn NativeParameter>)
            .collect()
    }
}

/// Simulated dashboard; also acts as the event dispatcher of the host
pub struct SimDashboard {
    id: String,
    name: String,
    worksheets: Vec<Arc<SimWorksheet>>,
    parameters: Vec<Arc<SimParameter>>,
    event_types: NativeEventTypes,
    emitter: SimEmitter,
}

impl SimDashboard {
    pub fn builder(id: &str, name: &str) -> SimDashboardBuilder {
        SimDashboardBuilder {
            id: id.to_string(),
            name: name.to_string(),
            worksheets: Vec::new(),
            parameters: Vec::new(),
        }
    }

    pub fn sim_worksheet(&self, name: &str) -> Option<&Arc<SimWorksheet>> {
        self.worksheets.iter().find(|ws| ws.name == name)
    }

    pub fn sim_parameter(&self, id: &str) -> Option<&Arc<SimParameter>> {
        self.parameters.iter().find(|p| p.id == id)
    }

    /// Listeners installed across the dashboard and all its children
    pub fn listener_count(&self) -> usize {
        self.emitter.listener_count()
            + self.worksheets.iter().map(|ws| ws.emitter.listener_count()).sum::<usize>()
            + self.parameters.iter().map(|p| p.emitter.listener_count()).sum::<usize>()
    }

    pub fn cancellations(&self) -> usize {
        self.emitter.cancellations()
            + self.worksheets.iter().map(|ws| ws.emitter.cancellations()).sum::<usize>()
            + self.parameters.iter().map(|p| p.emitter.cancellations()).sum::<usize>()
    }

    /// Fire a mark selection on `worksheet`
    pub fn select_marks(&self, worksheet: &str) -> Result<Vec<anyhow::Error>, PlatformError> {
        let ws = self.require_worksheet(worksheet)?;
        let event = NativeEvent::new(self.event_types.mark_selection_changed.clone())
            .with_worksheet(ws.clone());
        Ok(ws.emitter.emit(event))
    }

    /// Fire a filter change for `field` on `worksheet`
    pub fn change_filter(
        &self,
        worksheet: &str,
        field: &str,
    ) -> Result<Vec<anyhow::Error>, PlatformError> {
        let ws = self.require_worksheet(worksheet)?;
        let event = NativeEvent::new(self.event_types.filter_changed.clone())
            .with_worksheet(ws.clone())
            .with_filter(SimFilter::new(field, "categorical"));
        Ok(ws.emitter.emit(event))
    }

    /// Set a parameter value and fire its change event
    pub fn change_parameter(
        &self,
        id: &str,
        value: serde_json::Value,
    ) -> Result<Vec<anyhow::Error>, PlatformError> {
        let param = self
            .sim_parameter(id)
            .ok_or_else(|| PlatformError::Other(format!("No parameter with id '{}'", id)))?;
        *param.value.write() = value;
        let event = NativeEvent::new(self.event_types.parameter_changed.clone())
            .with_parameter(param.clone());
        Ok(param.emitter.emit(event))
    }

    fn require_worksheet(&self, name: &str) -> Result<&Arc<SimWorksheet>, PlatformError> {
        self.sim_worksheet(name)
            .ok_or_else(|| PlatformError::Other(format!("No worksheet named '{}'", name)))
    }
}

impl EventSource for SimDashboard {
    fn add_event_listener(
        &self,
        event_type: &NativeEventType,
        callback: NativeCallback,
    ) -> Result<CancelToken, PlatformError> {
        Ok(self.emitter.add(event_type, callback))
    }
}

impl NativeDashboard for SimDashboard {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn worksheets(&self) -> Vec<Arc<dyn NativeWorksheet>> {
        self.worksheets
            .iter()
            .map(|ws| ws.clone() as Arc<dyn NativeWorksheet>)
            .collect()
    }

    fn parameters(&self) -> Vec<Arc<dyn NativeParameter>> {
        self.parameters
            .iter()
            .map(|p| p.clone() as Arc<dyn NativeParameter>)
            .collect()
    }
}

pub struct SimDashboardBuilder {
    id: String,
    name: String,
    worksheets: Vec<(String, Vec<String>)>,
    parameters: Vec<(String, String, serde_json::Value)>,
}

impl SimDashboardBuilder {
    /// Add a worksheet using the parameters with the given ids
    pub fn worksheet(mut self, name: &str, parameter_ids: &[&str]) -> Self {
        self.worksheets.push((
            name.to_string(),
            parameter_ids.iter().map(|id| id.to_string()).collect(),
        ));
        self
    }

    pub fn parameter(self, id: &str, name: &str) -> Self {
        self.parameter_with_value(id, name, serde_json::Value::Null)
    }

    pub fn parameter_with_value(mut self, id: &str, name: &str, value: serde_json::Value) -> Self {
        self.parameters.push((id.to_string(), name.to_string(), value));
        self
    }

    pub fn build(self) -> Arc<SimDashboard> {
        let parameters: Vec<Arc<SimParameter>> = self
            .parameters
            .into_iter()
            .map(|(id, name, value)| SimParameter::new(&id, &name, value))
            .collect();

        let worksheets = self
            .worksheets
            .into_iter()
            .map(|(name, ids)| {
                let used = parameters
                    .iter()
                    .filter(|p| ids.contains(&p.id))
                    .cloned()
                    .collect();
                SimWorksheet::new(&name, used)
            })
            .collect();

        Arc::new(SimDashboard {
            id: self.id,
            name: self.name,
            worksheets,
            parameters,
            event_types: native_event_types(),
            emitter: SimEmitter::default(),
        })
    }
}

/// Connector that completes the handshake after an optional delay
pub struct SimConnector {
    dashboard: Arc<SimDashboard>,
    delay: Duration,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl SimConnector {
    pub fn new(dashboard: Arc<SimDashboard>) -> Self {
        Self {
            dashboard,
            delay: Duration::ZERO,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self
    }

    /// Number of handshakes started
    pub fn initialize_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PlatformConnector for SimConnector {
    async fn initialize(&self) -> Result<NativeContext, PlatformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(reason) = &self.failure {
            return Err(PlatformError::Initialization(reason.clone()));
        }
        Ok(NativeContext {
            dashboard: self.dashboard.clone(),
            event_types: self.dashboard.event_types.clone(),
        })
    }
}

/// Reporter that keeps every reported error message
#[derive(Default)]
pub struct RecordingReporter {
    messages: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, error: &anyhow::Error) {
        self.messages.lock().push(format!("{:#}", error));
    }
}
