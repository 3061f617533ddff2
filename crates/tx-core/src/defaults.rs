//! Logging handlers for quick inspection of dashboard activity

use tracing::info;

use crate::error::{EventError, Result};
use crate::events::{EventKind, Handler, TypedEvent};
use crate::session::Session;

const RULE: &str = "**************************************************";

fn on_filter_change(event: &TypedEvent) -> anyhow::Result<()> {
    if let TypedEvent::FilterChanged(e) = event {
        info!("{}", RULE);
        info!("Filter Change detected...");
        info!("** Worksheet: {}", e.worksheet().name());
        info!("** Field Name: {}", e.filter().field_name());
        info!("** Filter type: {}", e.filter().filter_type());
        info!("{}", RULE);
    }
    Ok(())
}

fn on_parameter_change(event: &TypedEvent) -> anyhow::Result<()> {
    if let TypedEvent::ParameterChanged(e) = event {
        info!("{}", RULE);
        info!("Parameter Change detected...");
        info!("** Parameter name: {}", e.parameter().name());
        info!("** Parameter value: {}", e.parameter().value());
        info!("{}", RULE);
    }
    Ok(())
}

fn on_selection_change(event: &TypedEvent) -> anyhow::Result<()> {
    if let TypedEvent::MarksSelected(e) = event {
        info!("{}", RULE);
        info!("Selection Change detected...");
        info!("** Worksheet name: {}", e.worksheet().name());
        info!("** Worksheet type: {}", e.worksheet().sheet_type());
        info!("{}", RULE);
    }
    Ok(())
}

/// Register a logging handler on the whole dashboard for each of `kinds`.
///
/// Returns the handlers in the order of `kinds` so callers can remove them
/// again.
pub fn register_default_handlers(session: &Session, kinds: &[EventKind]) -> Result<Vec<Handler>> {
    let dashboard = session.dashboard().ok_or(EventError::SessionNotReady)?;

    let mut handlers = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        let handler = match kind {
            EventKind::FilterChanged => Handler::new(on_filter_change),
            EventKind::ParameterChanged => Handler::new(on_parameter_change),
            EventKind::SelectionChanged => Handler::new(on_selection_change),
        };
        session.register_event_handler(kind, &handler, dashboard.clone())?;
        handlers.push(handler);
    }
    Ok(handlers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serial_test::serial;

    use crate::config::SessionConfig;
    use crate::sim::{SimConnector, SimDashboard};

    #[tokio::test(start_paused = true)]
    #[serial]
    async fn test_defaults_cover_dashboard() {
        let sim = SimDashboard::builder("dash-1", "Sales")
            .worksheet("Orders", &["P1"])
            .worksheet("Returns", &[])
            .parameter("P1", "Region")
            .build();
        let session = Session::connect(
            Arc::new(SimConnector::new(sim.clone())),
            SessionConfig::default(),
        )
        .unwrap();
        assert!(session.available().await);

        let handlers = register_default_handlers(&session, &EventKind::ALL).unwrap();
        assert_eq!(handlers.len(), 3);
        // two worksheets for filters and selections, one parameter
        assert_eq!(session.registration_count(), 5);

        assert!(sim.change_filter("Orders", "Region").unwrap().is_empty());
        assert!(sim.select_marks("Returns").unwrap().is_empty());
        assert!(sim.change_parameter("P1", serde_json::json!("East")).unwrap().is_empty());

        let dashboard = session.dashboard().unwrap();
        assert_eq!(session.unregister_all_event_handlers(dashboard), 5);
    }
}
