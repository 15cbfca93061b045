//! Interface of the error-reporting SDK driven by [`InitializationGuard`](crate::InitializationGuard).

use std::{fmt, time::Duration};

/// Options passed to [`ErrorReportingSdk::init()`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOptions {
    /// Sanitized DSN.
    pub dsn: String,
    pub debug: bool,
    /// Explicit list of integration identifiers to enable.
    pub integrations: Vec<String>,
    /// Whether the SDK should add its default integrations on its own.
    pub default_integrations: bool,
    /// Whether the SDK should add its auto-enabling integrations on its own.
    pub auto_enabling_integrations: bool,
}

/// Error-reporting SDK owning the process-wide client.
///
/// Integrations are referred to by opaque identifiers; the implementation maps them to its own
/// integration instances.
pub trait ErrorReportingSdk: fmt::Debug + Send + Sync {
    /// Checks whether a client is already bound, regardless of who has initialized it.
    fn has_active_client(&self) -> bool;

    /// Identifiers of the integrations the SDK enables by default, in order.
    fn default_integrations(&self) -> Vec<String>;

    /// Identifiers of the integrations the SDK enables when their target library is present.
    fn auto_enabling_integrations(&self) -> Vec<String>;

    /// Identifier of the integration capturing records from all loggers.
    fn logging_integration(&self) -> &str;

    /// Initializes the process-wide client.
    fn init(&self, options: InitOptions) -> anyhow::Result<()>;

    /// Flushes pending events. Returns `false` if the timeout has elapsed.
    fn flush(&self, _timeout: Duration) -> bool {
        true
    }

    /// Shuts the client down. Returns `false` if the timeout has elapsed.
    fn close(&self, _timeout: Duration) -> bool {
        true
    }
}
