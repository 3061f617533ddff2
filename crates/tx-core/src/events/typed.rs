//! Typed wrappers over raw native events

use crate::error::{EventError, Result};
use crate::platform::NativeEvent;
use crate::targets::{Filter, Parameter, Worksheet};

use super::EventKind;

/// Triggered when marks are selected on a worksheet
#[derive(Debug, Clone)]
pub struct MarksSelectedEvent {
    worksheet: Worksheet,
}

impl MarksSelectedEvent {
    pub fn from_native(event: NativeEvent) -> Result<TypedEvent> {
        let worksheet = event.worksheet.clone().ok_or_else(|| missing(&event, "worksheet"))?;
        Ok(TypedEvent::MarksSelected(Self {
            worksheet: Worksheet::new(worksheet),
        }))
    }

    /// The worksheet the selection happened on
    pub fn worksheet(&self) -> &Worksheet {
        &self.worksheet
    }
}

/// Triggered when a filter changes on a worksheet
#[derive(Debug, Clone)]
pub struct FilterChangedEvent {
    worksheet: Worksheet,
    filter: Filter,
}

impl FilterChangedEvent {
    pub fn from_native(event: NativeEvent) -> Result<TypedEvent> {
        let worksheet = event.worksheet.clone().ok_or_else(|| missing(&event, "worksheet"))?;
        let filter = event.filter.clone().ok_or_else(|| missing(&event, "filter"))?;
        Ok(TypedEvent::FilterChanged(Self {
            worksheet: Worksheet::new(worksheet),
            filter: Filter::new(filter),
        }))
    }

    pub fn worksheet(&self) -> &Worksheet {
        &self.worksheet
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Name of the filtered field; two filter events are equal when this matches
    pub fn field_name(&self) -> String {
        self.filter.field_name()
    }
}

impl PartialEq for FilterChangedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.field_name() == other.field_name()
    }
}

impl Eq for FilterChangedEvent {}

/// Triggered when a parameter value changes
#[derive(Debug, Clone)]
pub struct ParameterChangedEvent {
    parameter: Parameter,
}

impl ParameterChangedEvent {
    pub fn from_native(event: NativeEvent) -> Result<TypedEvent> {
        let parameter = event.parameter.clone().ok_or_else(|| missing(&event, "parameter"))?;
        Ok(TypedEvent::ParameterChanged(Self {
            parameter: Parameter::new(parameter),
        }))
    }

    pub fn parameter(&self) -> &Parameter {
        &self.parameter
    }
}

fn missing(event: &NativeEvent, field: &'static str) -> EventError {
    EventError::MissingEventPayload {
        event: event.event_type.to_string(),
        field,
    }
}

/// Event handed to user handlers
#[derive(Debug, Clone)]
pub enum TypedEvent {
    MarksSelected(MarksSelectedEvent),
    FilterChanged(FilterChangedEvent),
    ParameterChanged(ParameterChangedEvent),
}

impl TypedEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TypedEvent::MarksSelected(_) => EventKind::SelectionChanged,
            TypedEvent::FilterChanged(_) => EventKind::FilterChanged,
            TypedEvent::ParameterChanged(_) => EventKind::ParameterChanged,
        }
    }

    /// Originating worksheet, for selection and filter events
    pub fn worksheet(&self) -> Option<&Worksheet> {
        match self {
            TypedEvent::MarksSelected(e) => Some(e.worksheet()),
            TypedEvent::FilterChanged(e) => Some(e.worksheet()),
            TypedEvent::ParameterChanged(_) => None,
        }
    }

    pub fn filter(&self) -> Option<&Filter> {
        match self {
            TypedEvent::FilterChanged(e) => Some(e.filter()),
            _ => None,
        }
    }

    pub fn parameter(&self) -> Option<&Parameter> {
        match self {
            TypedEvent::ParameterChanged(e) => Some(e.parameter()),
            _ => None,
        }
    }

    /// Equality key used by the duplicate suppressor
    pub fn dedup_key(&self) -> String {
        match self {
            TypedEvent::FilterChanged(e) => e.field_name(),
            TypedEvent::MarksSelected(e) => e.worksheet().name(),
            TypedEvent::ParameterChanged(e) => e.parameter().id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::NativeEventType;
    use crate::sim::{SimFilter, SimWorksheet};

    #[test]
    fn test_filter_event_needs_filter_payload() {
        let native = NativeEvent::new(NativeEventType::new("filter-changed"))
            .with_worksheet(SimWorksheet::new("Orders", Vec::new()));
        match FilterChangedEvent::from_native(native) {
            Err(EventError::MissingEventPayload { field, .. }) => assert_eq!(field, "filter"),
            other => panic!("unexpected: {:?}", other.map(|e| e.kind())),
        }
    }

    #[test]
    fn test_filter_event_accessors() {
        let native = NativeEvent::new(NativeEventType::new("filter-changed"))
            .with_worksheet(SimWorksheet::new("Orders", Vec::new()))
            .with_filter(SimFilter::new("Region", "categorical"));
        let event = FilterChangedEvent::from_native(native).unwrap();

        assert_eq!(event.kind(), EventKind::FilterChanged);
        assert_eq!(event.worksheet().map(|ws| ws.name()), Some("Orders".to_string()));
        assert!(event.parameter().is_none());
        assert_eq!(event.dedup_key(), "Region");
    }
}
