//! Host-side reporting of handler failures

/// Receives errors raised inside user handlers before they are passed back to
/// the platform dispatcher
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &anyhow::Error);
}

/// Reports through the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: &anyhow::Error) {
        tracing::error!("*** ERROR *** {:#}", error);
    }
}
