//! Dashboard objects that handlers can be registered against
//!
//! Each wrapper exposes a fixed set of accessors over its native handle. The
//! identifying attribute differs per class: worksheets are keyed by name,
//! parameters and dashboards by id.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{EventError, PlatformError, Result};
use crate::events::{EventKind, EventKindSpec, Handler};
use crate::platform::{
    CancelToken, NativeCallback, NativeDashboard, NativeEventType, NativeFilter, NativeParameter,
    NativeWorksheet,
};
use crate::session::Session;

/// Class part of a target identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetClass {
    Worksheet,
    Parameter,
    Dashboard,
}

impl fmt::Display for TargetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetClass::Worksheet => f.write_str("worksheet"),
            TargetClass::Parameter => f.write_str("parameter"),
            TargetClass::Dashboard => f.write_str("dashboard"),
        }
    }
}

/// Stable `(class, id)` identity of a target
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetKey {
    pub class: TargetClass,
    pub id: String,
}

impl TargetKey {
    pub fn new(class: TargetClass, id: impl Into<String>) -> Self {
        Self {
            class,
            id: id.into(),
        }
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.class, self.id)
    }
}

/// A worksheet within the dashboard
#[derive(Clone)]
pub struct Worksheet {
    native: Arc<dyn NativeWorksheet>,
}

impl Worksheet {
    pub fn new(native: Arc<dyn NativeWorksheet>) -> Self {
        Self { native }
    }

    pub fn name(&self) -> String {
        self.native.name()
    }

    pub fn sheet_type(&self) -> String {
        self.native.sheet_type()
    }

    pub fn parameters(&self) -> Vec<Parameter> {
        self.native.parameters().into_iter().map(Parameter::new).collect()
    }

    pub fn get_parameter(&self, name: &str) -> Option<Parameter> {
        self.parameters().into_iter().find(|p| p.name() == name)
    }

    pub fn key(&self) -> TargetKey {
        TargetKey::new(TargetClass::Worksheet, self.native.name())
    }

    /// Register `handler` for `kind` on this worksheet
    pub fn register_event_handler(
        &self,
        session: &Session,
        kind: impl Into<EventKindSpec>,
        handler: &Handler,
    ) -> Result<()> {
        session.register_event_handler(kind, handler, self.clone())
    }

    pub fn unregister_event_handler(
        &self,
        session: &Session,
        handler: &Handler,
        kind: Option<EventKind>,
    ) -> Result<()> {
        session.unregister_event_handler(self.clone(), handler, kind)
    }

    /// Remove every handler registered on this worksheet, including those
    /// fanned out to its parameters
    pub fn unregister_all_event_handlers(&self, session: &Session) {
        session.unregister_all_event_handlers(self.clone());
    }
}

impl fmt::Debug for Worksheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worksheet").field("name", &self.name()).finish()
    }
}

/// A dashboard parameter
#[derive(Clone)]
pub struct Parameter {
    native: Arc<dyn NativeParameter>,
}

impl Parameter {
    pub fn new(native: Arc<dyn NativeParameter>) -> Self {
        Self { native }
    }

    pub fn id(&self) -> String {
        self.native.id()
    }

    pub fn name(&self) -> String {
        self.native.name()
    }

    pub fn value(&self) -> serde_json::Value {
        self.native.current_value()
    }

    pub fn key(&self) -> TargetKey {
        TargetKey::new(TargetClass::Parameter, self.native.id())
    }

    pub fn register_event_handler(&self, session: &Session, handler: &Handler) -> Result<()> {
        session.register_event_handler(EventKind::ParameterChanged, handler, self.clone())
    }

    pub fn unregister_event_handler(&self, session: &Session, handler: &Handler) -> Result<()> {
        session.unregister_event_handler(self.clone(), handler, Some(EventKind::ParameterChanged))
    }

    pub fn unregister_all_event_handlers(&self, session: &Session) {
        session.unregister_all_event_handlers(self.clone());
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}

/// A filter attached to a worksheet. Filters are event payloads, not targets.
#[derive(Clone)]
pub struct Filter {
    native: Arc<dyn NativeFilter>,
}

impl Filter {
    pub fn new(native: Arc<dyn NativeFilter>) -> Self {
        Self { native }
    }

    pub fn field_name(&self) -> String {
        self.native.field_name()
    }

    pub fn filter_type(&self) -> String {
        self.native.filter_type()
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("field_name", &self.field_name())
            .finish()
    }
}

/// The dashboard the extension is embedded in
#[derive(Clone)]
pub struct Dashboard {
    native: Arc<dyn NativeDashboard>,
}

impl Dashboard {
    pub fn new(native: Arc<dyn NativeDashboard>) -> Self {
        Self { native }
    }

    pub fn id(&self) -> String {
        self.native.id()
    }

    pub fn name(&self) -> String {
        self.native.name()
    }

    pub fn worksheets(&self) -> Vec<Worksheet> {
        self.native.worksheets().into_iter().map(Worksheet::new).collect()
    }

    /// Look up a worksheet by name. A miss is not an error.
    pub fn get_worksheet(&self, name: &str) -> Option<Worksheet> {
        self.worksheets().into_iter().find(|ws| ws.name() == name)
    }

    pub fn parameters(&self) -> Vec<Parameter> {
        self.native.parameters().into_iter().map(Parameter::new).collect()
    }

    pub fn get_parameter(&self, name: &str) -> Option<Parameter> {
        self.parameters().into_iter().find(|p| p.name() == name)
    }

    pub fn key(&self) -> TargetKey {
        TargetKey::new(TargetClass::Dashboard, self.native.id())
    }

    pub fn register_event_handler(
        &self,
        session: &Session,
        kind: impl Into<EventKindSpec>,
        handler: &Handler,
    ) -> Result<()> {
        session.register_event_handler(kind, handler, self.clone())
    }

    pub fn unregister_all_event_handlers(&self, session: &Session) {
        session.unregister_all_event_handlers(self.clone());
    }
}

impl fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dashboard")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}

/// Any object a handler can be registered against
#[derive(Clone, Debug)]
pub enum Target {
    Worksheet(Worksheet),
    Parameter(Parameter),
    Dashboard(Dashboard),
}

impl Target {
    pub fn key(&self) -> TargetKey {
        match self {
            Target::Worksheet(ws) => ws.key(),
            Target::Parameter(p) => p.key(),
            Target::Dashboard(d) => d.key(),
        }
    }

    pub fn class(&self) -> TargetClass {
        match self {
            Target::Worksheet(_) => TargetClass::Worksheet,
            Target::Parameter(_) => TargetClass::Parameter,
            Target::Dashboard(_) => TargetClass::Dashboard,
        }
    }

    /// The concrete targets a listener for `kind` is installed on
    pub fn expand(&self, kind: EventKind) -> Result<Vec<Target>> {
        match (self, kind) {
            (Target::Worksheet(_), EventKind::FilterChanged | EventKind::SelectionChanged) => {
                Ok(vec![self.clone()])
            }
            (Target::Worksheet(ws), EventKind::ParameterChanged) => {
                Ok(ws.parameters().into_iter().map(Target::Parameter).collect())
            }
            (Target::Dashboard(d), EventKind::FilterChanged | EventKind::SelectionChanged) => {
                Ok(d.worksheets().into_iter().map(Target::Worksheet).collect())
            }
            (Target::Dashboard(d), EventKind::ParameterChanged) => {
                Ok(d.parameters().into_iter().map(Target::Parameter).collect())
            }
            (Target::Parameter(_), EventKind::ParameterChanged) => Ok(vec![self.clone()]),
            (Target::Parameter(_), _) => Err(EventError::UnsupportedTarget {
                kind,
                class: TargetClass::Parameter,
            }),
        }
    }

    pub(crate) fn add_event_listener(
        &self,
        event_type: &NativeEventType,
        callback: NativeCallback,
    ) -> Result<CancelToken, PlatformError> {
        match self {
            Target::Worksheet(ws) => ws.native.add_event_listener(event_type, callback),
            Target::Parameter(p) => p.native.add_event_listener(event_type, callback),
            Target::Dashboard(d) => d.native.add_event_listener(event_type, callback),
        }
    }
}

impl From<Worksheet> for Target {
    fn from(ws: Worksheet) -> Self {
        Target::Worksheet(ws)
    }
}

impl From<Parameter> for Target {
    fn from(p: Parameter) -> Self {
        Target::Parameter(p)
    }
}

impl From<Dashboard> for Target {
    fn from(d: Dashboard) -> Self {
        Target::Dashboard(d)
    }
}

/// A single target or a collection of them
pub trait IntoTargets {
    fn into_targets(self) -> Vec<Target>;
}

macro_rules! impl_into_targets {
    ($($t:ty),*) => {
        $(
            impl IntoTargets for $t {
                fn into_targets(self) -> Vec<Target> {
                    vec![self.into()]
                }
            }

            impl IntoTargets for Vec<$t> {
                fn into_targets(self) -> Vec<Target> {
                    self.into_iter().map(Into::into).collect()
                }
            }

            impl IntoTargets for &[$t] {
                fn into_targets(self) -> Vec<Target> {
                    self.iter().cloned().map(Into::into).collect()
                }
            }

            impl<const N: usize> IntoTargets for [$t; N] {
                fn into_targets(self) -> Vec<Target> {
                    self.into_iter().map(Into::into).collect()
                }
            }
        )*
    }
}

impl_into_targets!(Target, Worksheet, Parameter, Dashboard);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimDashboard;

    fn dashboard() -> Dashboard {
        let sim = SimDashboard::builder("dash-1", "Sales")
            .worksheet("Orders", &["p-region", "p-year"])
            .worksheet("Returns", &[])
            .parameter("p-region", "Region")
            .parameter("p-year", "Year")
            .build();
        Dashboard::new(sim)
    }

    #[test]
    fn test_keys_use_class_specific_identifier() {
        let dash = dashboard();
        assert_eq!(dash.key(), TargetKey::new(TargetClass::Dashboard, "dash-1"));

        let ws = dash.get_worksheet("Orders").unwrap();
        assert_eq!(ws.key(), TargetKey::new(TargetClass::Worksheet, "Orders"));

        let param = dash.get_parameter("Region").unwrap();
        assert_eq!(param.key(), TargetKey::new(TargetClass::Parameter, "p-region"));
    }

    #[test]
    fn test_lookup_miss_is_none() {
        let dash = dashboard();
        assert!(dash.get_worksheet("Missing").is_none());
        assert!(dash.get_parameter("Missing").is_none());
    }

    #[test]
    fn test_expand_fans_out() {
        let dash = dashboard();
        let ws = Target::from(dash.get_worksheet("Orders").unwrap());

        let own = ws.expand(EventKind::FilterChanged).unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].key(), ws.key());

        let params = ws.expand(EventKind::ParameterChanged).unwrap();
        let keys: Vec<_> = params.iter().map(|t| t.key().id).collect();
        assert_eq!(keys, vec!["p-region", "p-year"]);

        let sheets = Target::from(dash.clone()).expand(EventKind::SelectionChanged).unwrap();
        assert_eq!(sheets.len(), 2);
        assert!(sheets.iter().all(|t| t.class() == TargetClass::Worksheet));
    }

    #[test]
    fn test_parameter_rejects_worksheet_events() {
        let dash = dashboard();
        let param = Target::from(dash.get_parameter("Year").unwrap());
        assert!(matches!(
            param.expand(EventKind::SelectionChanged),
            Err(EventError::UnsupportedTarget { class: TargetClass::Parameter, .. })
        ));
    }

    #[test]
    fn test_into_targets_accepts_single_and_many() {
        let dash = dashboard();
        assert_eq!(dash.clone().into_targets().len(), 1);
        assert_eq!(dash.worksheets().into_targets().len(), 2);
        assert_eq!(dash.parameters().as_slice().into_targets().len(), 2);
    }
}
