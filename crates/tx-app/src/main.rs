//! Demo entry point: drives the event core against the in-memory platform

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use tx_core::defaults::register_default_handlers;
use tx_core::sim::{SimConnector, SimDashboard};
use tx_core::{EventKind, Handler, Session, SessionConfig, TypedEvent};

fn load_config() -> Result<SessionConfig> {
    match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => SessionConfig::load(&path),
        None => Ok(SessionConfig::default()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = load_config()?;
    let sim = SimDashboard::builder("dashboard-1", "Superstore")
        .worksheet("Sales by Region", &["p-top-n"])
        .worksheet("Profit Trend", &["p-top-n", "p-year"])
        .parameter_with_value("p-top-n", "Top N", serde_json::json!(10))
        .parameter_with_value("p-year", "Year", serde_json::json!(2023))
        .build();

    let connector = SimConnector::new(sim.clone()).with_delay(Duration::from_millis(250));
    let session = Session::connect(Arc::new(connector), config)?;
    info!("Waiting up to {:?} for the dashboard", session.config().timeout());
    if !session.available().await {
        anyhow::bail!("Dashboard did not become available: {:?}", session.state());
    }
    let dashboard = session.dashboard().context("Session has no dashboard")?;

    let defaults = register_default_handlers(&session, &EventKind::ALL)?;
    info!("Registered {} default handlers", defaults.len());

    let filter_calls = Arc::new(AtomicUsize::new(0));
    let counter = filter_calls.clone();
    let region_filter = Handler::new(move |event: &TypedEvent| {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(filter) = event.filter() {
            info!("Region sheet filtered on '{}'", filter.field_name());
        }
        Ok(())
    });
    let sheet = dashboard
        .get_worksheet("Sales by Region")
        .context("Missing worksheet")?;
    sheet.register_event_handler(&session, "filter_changed", &region_filter)?;

    // The host fires filter changes in bursts
    for _ in 0..3 {
        for error in sim.change_filter("Sales by Region", "Region")? {
            warn!("Handler failed: {:#}", error);
        }
    }
    info!(
        "Region filter handler ran {} time(s) for 3 deliveries",
        filter_calls.load(Ordering::SeqCst)
    );

    sim.select_marks("Profit Trend")?;
    sim.change_parameter("p-year", serde_json::json!(2024))?;

    let ledger = serde_json::to_string_pretty(&session.registrations())?;
    info!("Live registrations:\n{}", ledger);

    sheet.unregister_event_handler(&session, &region_filter, None)?;
    let removed = session.unregister_all_event_handlers(dashboard);
    info!(
        "Removed {} listeners; {} native listeners remain",
        removed,
        sim.listener_count()
    );

    Ok(())
}
