//! Free functions acting on the live session

use crate::error::{EventError, Result};
use crate::events::{EventKind, EventKindSpec, Handler};
use crate::session::Session;
use crate::targets::{IntoTargets, Target};

fn current() -> Result<std::sync::Arc<Session>> {
    Session::current().ok_or(EventError::SessionNotReady)
}

pub fn register_event_handler(
    kind: impl Into<EventKindSpec>,
    handler: &Handler,
    targets: impl IntoTargets,
) -> Result<()> {
    current()?.register_event_handler(kind, handler, targets)
}

pub fn unregister_event_handler(
    target: impl Into<Target>,
    handler: &Handler,
    kind: Option<EventKind>,
) -> Result<()> {
    current()?.unregister_event_handler(target, handler, kind)
}

/// No-op when no session is alive
pub fn unregister_all_event_handlers(target: impl Into<Target>) -> usize {
    Session::current()
        .map(|session| session.unregister_all_event_handlers(target))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serial_test::serial;

    use crate::config::SessionConfig;
    use crate::sim::{SimConnector, SimDashboard};
    use crate::targets::Worksheet;

    #[tokio::test(start_paused = true)]
    #[serial]
    async fn test_free_functions_use_current_session() {
        let sim = SimDashboard::builder("dash-1", "Sales")
            .worksheet("Orders", &[])
            .build();
        let ws = Worksheet::new(sim.sim_worksheet("Orders").unwrap().clone());
        let handler = Handler::new(|_| Ok(()));

        assert!(matches!(
            register_event_handler("filter_changed", &handler, ws.clone()),
            Err(EventError::SessionNotReady)
        ));
        assert_eq!(unregister_all_event_handlers(ws.clone()), 0);

        let session = Session::connect(
            Arc::new(SimConnector::new(sim.clone())),
            SessionConfig::default(),
        )
        .unwrap();
        assert!(session.available().await);

        register_event_handler("filter_changed", &handler, ws.clone()).unwrap();
        assert_eq!(session.registration_count(), 1);
        unregister_event_handler(ws.clone(), &handler, None).unwrap();
        assert!(matches!(
            unregister_event_handler(ws, &handler, None),
            Err(EventError::NoSuchRegistration { .. })
        ));
    }
}
