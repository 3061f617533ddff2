//! Platform session: connection gate and owner of the event tables
//!
//! At most one [`Session`] is alive per process. Constructing it starts the
//! platform handshake in the background; [`Session::available`] waits for the
//! handshake with a bounded poll. Registration is refused until the session is
//! ready.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::error::{EventError, PlatformError, Result};
use crate::events::{suppress_duplicates, EventCallback, EventKind, EventKindSpec, Handler, TypedEvent};
use crate::ledger::{HandlerIdentity, RegistrationLedger};
use crate::mapper::NativeEventMapper;
use crate::platform::{NativeCallback, NativeContext, NativeEvent, NativeEventType, PlatformConnector};
use crate::report::{ErrorReporter, TracingReporter};
use crate::targets::{Dashboard, IntoTargets, Target};

static ACTIVE: AtomicBool = AtomicBool::new(false);
static CURRENT: Lazy<Mutex<Weak<Session>>> = Lazy::new(|| Mutex::new(Weak::new()));

/// Connection lifecycle. `Ready` is terminal; `Failed` is a degraded but
/// inspectable end state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Connecting,
    Ready,
    Failed(String),
}

impl ConnectionState {
    pub fn is_pending(&self) -> bool {
        matches!(self, ConnectionState::Uninitialized | ConnectionState::Connecting)
    }
}

#[derive(Debug)]
struct SessionState {
    connection: ConnectionState,
    dashboard: Option<Dashboard>,
}

/// The single platform session
pub struct Session {
    config: SessionConfig,
    state: Arc<RwLock<SessionState>>,
    mapper: Arc<RwLock<NativeEventMapper>>,
    ledger: Mutex<RegistrationLedger>,
    reporter: Arc<dyn ErrorReporter>,
}

impl Session {
    /// Start a new session and begin the platform handshake.
    ///
    /// Must be called from within a tokio runtime. Fails with
    /// [`EventError::SessionAlreadyActive`] while another session is alive.
    pub fn connect(connector: Arc<dyn PlatformConnector>, config: SessionConfig) -> Result<Arc<Session>> {
        Self::connect_with_reporter(connector, config, Arc::new(TracingReporter))
    }

    pub fn connect_with_reporter(
        connector: Arc<dyn PlatformConnector>,
        config: SessionConfig,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Arc<Session>> {
        if ACTIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(EventError::SessionAlreadyActive);
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                ACTIVE.store(false, Ordering::SeqCst);
                return Err(PlatformError::Initialization(e.to_string()).into());
            }
        };

        info!("Starting new session");
        let session = Arc::new(Session {
            config,
            state: Arc::new(RwLock::new(SessionState {
                connection: ConnectionState::Uninitialized,
                dashboard: None,
            })),
            mapper: Arc::new(RwLock::new(NativeEventMapper::new())),
            ledger: Mutex::new(RegistrationLedger::new()),
            reporter,
        });
        *CURRENT.lock() = Arc::downgrade(&session);

        session.state.write().connection = ConnectionState::Connecting;
        let state = session.state.clone();
        let mapper = session.mapper.clone();
        let reporter = session.reporter.clone();
        runtime.spawn(async move {
            let result = connector.initialize().await;
            Session::on_initialized(&state, &mapper, reporter.as_ref(), result);
        });

        Ok(session)
    }

    /// The live session, if any
    pub fn current() -> Option<Arc<Session>> {
        CURRENT.lock().upgrade()
    }

    /// Return the live session or start one
    pub fn get_or_connect(
        connector: Arc<dyn PlatformConnector>,
        config: SessionConfig,
    ) -> Result<Arc<Session>> {
        match Self::current() {
            Some(session) => Ok(session),
            None => Self::connect(connector, config),
        }
    }

    fn on_initialized(
        state: &RwLock<SessionState>,
        mapper: &RwLock<NativeEventMapper>,
        reporter: &dyn ErrorReporter,
        result: Result<NativeContext, PlatformError>,
    ) {
        let outcome = result
            .map_err(EventError::from)
            .and_then(|context| {
                mapper.write().set_native_context(&context.event_types)?;
                Ok(context)
            });

        let mut state = state.write();
        match outcome {
            Ok(context) => {
                let dashboard = Dashboard::new(context.dashboard);
                info!("Session ready for dashboard '{}'", dashboard.name());
                state.dashboard = Some(dashboard);
                state.connection = ConnectionState::Ready;
            }
            Err(e) => {
                error!("Session initialisation failed: {}", e);
                let err = anyhow::Error::new(e);
                reporter.report(&err);
                state.connection = ConnectionState::Failed(format!("{:#}", err));
            }
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state.read().connection.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state.read().connection == ConnectionState::Ready
    }

    /// Wait for the handshake, polling every `poll_interval` for at most
    /// `timeout`. Returns whether the session is ready.
    pub async fn available(&self) -> bool {
        let timeout = self.config.timeout();
        let step = self.config.poll_interval();
        let start = Instant::now();

        if self.state().is_pending() {
            info!(
                "Dashboard is still initialising. Waiting for a max of {:?}...",
                timeout
            );
        }
        while self.state().is_pending() && start.elapsed() < timeout {
            tokio::time::sleep(step.min(timeout.saturating_sub(start.elapsed()))).await;
        }
        debug!("Waited for {:?}", start.elapsed());
        self.is_ready()
    }

    pub fn dashboard(&self) -> Option<Dashboard> {
        self.state.read().dashboard.clone()
    }

    pub fn native_kind_for(&self, kind: EventKind) -> Result<NativeEventType> {
        self.mapper.read().native_kind_for(kind)
    }

    /// Register `handler` for `kind` on one or more targets.
    ///
    /// Worksheets registered for parameter changes and dashboards fan out to
    /// their children; every concrete listener gets its own ledger entry.
    /// If the platform refuses any listener, the ones installed by this call
    /// are cancelled again and nothing is recorded.
    pub fn register_event_handler(
        &self,
        kind: impl Into<EventKindSpec>,
        handler: &Handler,
        targets: impl IntoTargets,
    ) -> Result<()> {
        let kind = EventKind::resolve(kind)?;
        if !self.is_ready() {
            return Err(EventError::SessionNotReady);
        }
        let native_kind = self.native_kind_for(kind)?;

        let mut plan: Vec<(Target, Target)> = Vec::new();
        for origin in targets.into_targets() {
            for target in origin.expand(kind)? {
                plan.push((origin.clone(), target));
            }
        }

        let callback = self.compose_callback(kind, handler);
        let mut installed = Vec::with_capacity(plan.len());
        for (origin, target) in plan {
            match target.add_event_listener(&native_kind, callback.clone()) {
                Ok(token) => installed.push((origin, target, token)),
                Err(e) => {
                    warn!(
                        "Rolling back {} listeners for handler {}: {}",
                        installed.len(),
                        handler.id(),
                        e
                    );
                    for (_, target, token) in installed {
                        if let Err(cancel) = token.cancel() {
                            warn!("Failed to remove listener from {}: {}", target.key(), cancel);
                        }
                    }
                    return Err(e.into());
                }
            }
        }

        let mut ledger = self.ledger.lock();
        for (origin, target, token) in installed {
            let identity = HandlerIdentity::new(target.key(), handler.id(), kind);
            debug!("Registered {} (via {})", identity, origin.key());
            ledger.insert(identity, origin.key(), token);
        }
        Ok(())
    }

    /// Remove `handler` from `target`. Without `kind` the handler must be
    /// registered for a single event kind on that target.
    pub fn unregister_event_handler(
        &self,
        target: impl Into<Target>,
        handler: &Handler,
        kind: Option<EventKind>,
    ) -> Result<()> {
        let key = target.into().key();
        let removed = self.ledger.lock().remove(&key, handler.id(), kind)?;
        debug!("Unregistered handler {} from {} ({} listeners)", handler.id(), key, removed);
        Ok(())
    }

    /// Remove every handler on `target`, including fanned-out children.
    /// Returns the number of listeners removed.
    pub fn unregister_all_event_handlers(&self, target: impl Into<Target>) -> usize {
        let key = target.into().key();
        let removed = self.ledger.lock().remove_target(&key);
        if removed > 0 {
            debug!("Unregistered {} listeners from {}", removed, key);
        }
        removed
    }

    /// Sorted snapshot of live registrations
    pub fn registrations(&self) -> Vec<HandlerIdentity> {
        self.ledger.lock().identities()
    }

    pub fn registration_count(&self) -> usize {
        self.ledger.lock().len()
    }

    /// Native callback: wrap, suppress duplicates for filter events, report
    /// failures and pass them back to the dispatcher
    fn compose_callback(&self, kind: EventKind, handler: &Handler) -> NativeCallback {
        let user = handler.clone();
        let reporter = self.reporter.clone();
        let reporting: EventCallback = Arc::new(move |event: &TypedEvent| {
            user.call(event).map_err(|err| {
                reporter.report(&err);
                err
            })
        });

        let deliver = if kind == EventKind::FilterChanged {
            suppress_duplicates(reporting)
        } else {
            reporting
        };

        let mapper = self.mapper.clone();
        let reporter = self.reporter.clone();
        Arc::new(move |native: NativeEvent| {
            let wrapped = mapper.read().wrap(native);
            let event = wrapped.map_err(|e| {
                let err = anyhow::Error::new(e);
                reporter.report(&err);
                err
            })?;
            deliver(&event)
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let removed = self.ledger.get_mut().clear();
        if removed > 0 {
            info!("Session closed; cancelled {} listeners", removed);
        }
        ACTIVE.store(false, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("registrations", &self.registration_count())
            .finish()
    }
}
