//! Idempotent initialization of the error-reporting client.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, PoisonError,
    },
    time::Duration,
};

use once_cell::sync::Lazy;
use tracing::subscriber::NoSubscriber;

use crate::{
    config::SentryLoggerConfig,
    sdk::{ErrorReportingSdk, InitOptions},
    sentry::SentryBackend,
};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum InitError {
    /// The SDK failed to initialize the client.
    #[error("failed initializing Sentry client")]
    Sdk(#[source] anyhow::Error),
}

/// Conditions under which [`InitializationGuard::ensure_initialized()`] leaves the client alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Diagnostic {
    ForeignClient,
    MissingDsn,
}

impl Diagnostic {
    /// Reports the diagnostic via `tracing`, or to stderr if no subscriber is installed yet
    /// (e.g., because the handler is constructed while the subscriber is being built).
    fn report(self) {
        let has_subscriber =
            tracing::dispatcher::get_default(|dispatch| !dispatch.is::<NoSubscriber>());
        match (self, has_subscriber) {
            (Self::ForeignClient, true) => tracing::warn!("{}", self.message()),
            (Self::MissingDsn, true) => tracing::info!("{}", self.message()),
            (_, false) => eprintln!("{}", self.message()),
        }
    }

    fn message(self) -> &'static str {
        match self {
            Self::ForeignClient => {
                "Sentry client was not initialized by ccsentry_logger; leaving it as is"
            }
            Self::MissingDsn => "NOTICE: SENTRY_DSN is not set, Sentry error reporting is disabled",
        }
    }
}

/// Performs at most one initialization of the error-reporting client, configured from
/// the environment (see [`SentryLoggerConfig`]).
///
/// Usually, the process-wide instance returned by [`Self::global()`] is used. Separate instances
/// are useful to inject another [`ErrorReportingSdk`], e.g., in tests.
#[derive(Debug)]
pub struct InitializationGuard<S> {
    sdk: S,
    initialized: AtomicBool,
    /// Held for the entire check-then-initialize sequence.
    init_lock: Mutex<()>,
}

static GLOBAL_GUARD: Lazy<InitializationGuard<SentryBackend>> =
    Lazy::new(|| InitializationGuard::new(SentryBackend::new()));

impl InitializationGuard<SentryBackend> {
    /// Returns the process-wide guard for the `sentry` crate.
    pub fn global() -> &'static Self {
        &GLOBAL_GUARD
    }
}

impl<S: ErrorReportingSdk> InitializationGuard<S> {
    /// Time limit for [`Self::flush()`] and [`Self::shutdown()`].
    const TIMEOUT: Duration = Duration::from_secs(1);

    pub fn new(sdk: S) -> Self {
        Self {
            sdk,
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
        }
    }

    pub fn sdk(&self) -> &S {
        &self.sdk
    }

    /// Checks whether the client was initialized by this guard.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Initializes the client unless it was already initialized (by this guard or elsewhere)
    /// or no DSN is configured. Returns `true` iff this call has initialized the client.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`ErrorReportingSdk::init()`]; the guard remains uninitialized in
    /// this case.
    pub fn ensure_initialized(&self) -> Result<bool, InitError> {
        if self.is_initialized() {
            return Ok(false);
        }
        let _lock = self
            .init_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Another caller may have completed initialization while we were waiting for the lock.
        if self.is_initialized() {
            return Ok(false);
        }

        if self.sdk.has_active_client() {
            Diagnostic::ForeignClient.report();
            return Ok(false);
        }

        let config = SentryLoggerConfig::from_env();
        let Some(dsn) = config.dsn.clone() else {
            Diagnostic::MissingDsn.report();
            return Ok(false);
        };

        let integrations = config.integration_selection().select(
            self.sdk.logging_integration(),
            &self.sdk.default_integrations(),
            &self.sdk.auto_enabling_integrations(),
        );
        tracing::debug!(
            ?integrations,
            debug = config.debug,
            "Initializing Sentry client"
        );
        self.sdk
            .init(InitOptions {
                dsn,
                debug: config.debug,
                integrations,
                default_integrations: false,
                auto_enabling_integrations: false,
            })
            .map_err(InitError::Sdk)?;

        self.initialized.store(true, Ordering::Release);
        Ok(true)
    }

    /// Flushes pending events. This method is blocking.
    pub fn flush(&self) {
        if !self.is_initialized() {
            return;
        }
        if self.sdk.flush(Self::TIMEOUT) {
            tracing::info!("Sentry events are flushed");
        } else {
            tracing::warn!(timeout = ?Self::TIMEOUT, "Timed out flushing Sentry events");
        }
    }

    /// Flushes pending events and shuts the client down. The guard stays initialized, so
    /// the client is not re-initialized afterwards.
    pub fn shutdown(&self) {
        if !self.is_initialized() {
            return;
        }
        if self.sdk.close(Self::TIMEOUT) {
            tracing::info!("Sentry client is shut down");
        } else {
            tracing::warn!(timeout = ?Self::TIMEOUT, "Timed out shutting down Sentry client");
        }
    }
}
