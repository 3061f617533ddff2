//! Translation between abstract event kinds and the platform's native values

use ahash::AHashMap;

use crate::error::{EventError, Result};
use crate::events::{
    EventKind, FilterChangedEvent, MarksSelectedEvent, ParameterChangedEvent, TypedEvent,
};
use crate::platform::{NativeEvent, NativeEventType, NativeEventTypes};

type WrapperFn = fn(NativeEvent) -> Result<TypedEvent>;

/// Bidirectional `EventKind <-> NativeEventType` table plus the typed wrapper
/// for each native kind. Empty until the platform connection resolves.
#[derive(Debug, Default)]
pub struct NativeEventMapper {
    to_native: AHashMap<EventKind, NativeEventType>,
    from_native: AHashMap<NativeEventType, EventKind>,
    wrappers: AHashMap<NativeEventType, WrapperFn>,
}

impl NativeEventMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_populated(&self) -> bool {
        !self.to_native.is_empty()
    }

    /// Populate the tables from the connected platform. May only happen once.
    pub fn set_native_context(&mut self, types: &NativeEventTypes) -> Result<()> {
        if self.is_populated() {
            return Err(EventError::MapperAlreadyInitialized);
        }

        let entries: [(EventKind, &NativeEventType, WrapperFn); 3] = [
            (
                EventKind::FilterChanged,
                &types.filter_changed,
                FilterChangedEvent::from_native as WrapperFn,
            ),
            (
                EventKind::ParameterChanged,
                &types.parameter_changed,
                ParameterChangedEvent::from_native as WrapperFn,
            ),
            (
                EventKind::SelectionChanged,
                &types.mark_selection_changed,
                MarksSelectedEvent::from_native as WrapperFn,
            ),
        ];

        let mut to_native = AHashMap::new();
        let mut from_native: AHashMap<NativeEventType, EventKind> = AHashMap::new();
        let mut wrappers = AHashMap::new();
        for (kind, native, wrapper) in entries {
            if let Some(first) = from_native.get(native) {
                return Err(EventError::NativeKindCollision {
                    native: native.to_string(),
                    first: *first,
                    second: kind,
                });
            }
            to_native.insert(kind, native.clone());
            from_native.insert(native.clone(), kind);
            wrappers.insert(native.clone(), wrapper);
        }

        self.to_native = to_native;
        self.from_native = from_native;
        self.wrappers = wrappers;
        tracing::debug!("Native event mapping populated: {:?}", self.to_native);
        Ok(())
    }

    pub fn native_kind_for(&self, kind: EventKind) -> Result<NativeEventType> {
        self.to_native
            .get(&kind)
            .cloned()
            .ok_or_else(|| EventError::UnknownEventKind(kind.name().to_string()))
    }

    pub fn event_kind_for(&self, native: &NativeEventType) -> Option<EventKind> {
        self.from_native.get(native).copied()
    }

    /// Wrap a raw native event in its typed counterpart
    pub fn wrap(&self, event: NativeEvent) -> Result<TypedEvent> {
        let wrapper = self
            .wrappers
            .get(&event.event_type)
            .ok_or_else(|| EventError::UnknownNativeEvent(event.event_type.to_string()))?;
        wrapper(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{self, SimFilter, SimParameter, SimWorksheet};

    fn populated() -> NativeEventMapper {
        let mut mapper = NativeEventMapper::new();
        mapper.set_native_context(&sim::native_event_types()).unwrap();
        mapper
    }

    #[test]
    fn test_unpopulated_mapper_rejects_lookup() {
        let mapper = NativeEventMapper::new();
        assert!(matches!(
            mapper.native_kind_for(EventKind::FilterChanged),
            Err(EventError::UnknownEventKind(_))
        ));
    }

    #[test]
    fn test_mapping_is_bijective() {
        let mapper = populated();
        let mut natives = Vec::new();
        for kind in EventKind::ALL {
            let native = mapper.native_kind_for(kind).unwrap();
            assert_eq!(mapper.event_kind_for(&native), Some(kind));
            natives.push(native);
        }
        natives.sort();
        natives.dedup();
        assert_eq!(natives.len(), 3);
    }

    #[test]
    fn test_second_population_rejected() {
        let mut mapper = populated();
        let err = mapper.set_native_context(&sim::native_event_types()).unwrap_err();
        assert!(matches!(err, EventError::MapperAlreadyInitialized));
        assert!(mapper.native_kind_for(EventKind::ParameterChanged).is_ok());
    }

    #[test]
    fn test_colliding_native_kinds_rejected() {
        let mut types = sim::native_event_types();
        types.parameter_changed = types.filter_changed.clone();

        let mut mapper = NativeEventMapper::new();
        let err = mapper.set_native_context(&types).unwrap_err();
        assert!(matches!(
            err,
            EventError::NativeKindCollision {
                first: EventKind::FilterChanged,
                second: EventKind::ParameterChanged,
                ..
            }
        ));
        assert!(!mapper.is_populated());
    }

    #[test]
    fn test_wrap_builds_typed_events() {
        let mapper = populated();
        let types = sim::native_event_types();
        let worksheet = SimWorksheet::new("Orders", Vec::new());

        let selected = mapper
            .wrap(NativeEvent::new(types.mark_selection_changed.clone()).with_worksheet(worksheet.clone()))
            .unwrap();
        assert_eq!(selected.kind(), EventKind::SelectionChanged);
        assert_eq!(selected.worksheet().unwrap().name(), "Orders");

        let filtered = mapper
            .wrap(
                NativeEvent::new(types.filter_changed.clone())
                    .with_worksheet(worksheet)
                    .with_filter(SimFilter::new("Region", "categorical")),
            )
            .unwrap();
        assert_eq!(filtered.filter().unwrap().field_name(), "Region");

        let param = mapper
            .wrap(
                NativeEvent::new(types.parameter_changed.clone())
                    .with_parameter(SimParameter::new("p-1", "Year", serde_json::json!(2024))),
            )
            .unwrap();
        assert_eq!(param.parameter().unwrap().value(), serde_json::json!(2024));
        assert!(param.worksheet().is_none());
    }

    #[test]
    fn test_wrap_unknown_native_event() {
        let mapper = populated();
        let err = mapper
            .wrap(NativeEvent::new(NativeEventType::new("summary-data-changed")))
            .unwrap_err();
        assert!(matches!(err, EventError::UnknownNativeEvent(name) if name == "summary-data-changed"));
    }

    #[test]
    fn test_wrap_missing_payload() {
        let mapper = populated();
        let err = mapper
            .wrap(NativeEvent::new(sim::native_event_types().filter_changed))
            .unwrap_err();
        assert!(matches!(err, EventError::MissingEventPayload { field: "worksheet", .. }));
    }
}
