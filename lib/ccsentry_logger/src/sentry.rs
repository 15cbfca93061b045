//! [`ErrorReportingSdk`] implementation based on the `sentry` crate.

use std::{
    borrow::Cow,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use anyhow::Context as _;
use sentry::{
    integrations::{
        backtrace::{AttachStacktraceIntegration, ProcessStacktraceIntegration},
        contexts::ContextIntegration,
        debug_images::DebugImagesIntegration,
        log::SentryLogger,
        panic::PanicIntegration,
    },
    types::Dsn,
    ClientInitGuard, ClientOptions, Hub, Integration,
};

use crate::sdk::{ErrorReportingSdk, InitOptions};

/// Sentry SDK driven through the `sentry` crate.
///
/// The default integration set mirrors the one `sentry::init()` would install on its own, with
/// [`LogCaptureIntegration`] in front. The auto-enabling set is empty unless populated with
/// [`Self::with_auto_integration()`].
pub struct SentryBackend {
    log_capture: Arc<LogCaptureIntegration>,
    default_integrations: Vec<Arc<dyn Integration>>,
    auto_enabling_integrations: Vec<Arc<dyn Integration>>,
    environment: Option<String>,
    /// Set after a successful `init()`; keeps the client alive.
    client_guard: Mutex<Option<ClientInitGuard>>,
}

impl fmt::Debug for SentryBackend {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |integrations: &[Arc<dyn Integration>]| {
            integrations
                .iter()
                .map(|integration| integration.name())
                .collect::<Vec<_>>()
        };
        formatter
            .debug_struct("SentryBackend")
            .field("default_integrations", &names(&self.default_integrations))
            .field(
                "auto_enabling_integrations",
                &names(&self.auto_enabling_integrations),
            )
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

impl Default for SentryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SentryBackend {
    pub fn new() -> Self {
        let log_capture = Arc::new(LogCaptureIntegration::default());
        let default_integrations: Vec<Arc<dyn Integration>> = vec![
            log_capture.clone(),
            Arc::new(AttachStacktraceIntegration::default()),
            Arc::new(DebugImagesIntegration::default()),
            Arc::new(ContextIntegration::default()),
            Arc::new(PanicIntegration::default()),
            Arc::new(ProcessStacktraceIntegration::default()),
        ];
        Self {
            log_capture,
            default_integrations,
            auto_enabling_integrations: Vec::new(),
            environment: None,
            client_guard: Mutex::new(None),
        }
    }

    pub fn with_environment(mut self, environment: Option<String>) -> Self {
        self.environment = environment;
        self
    }

    /// Sets the application logger for `log` records. The logger is installed as the global
    /// `log` logger on `init()`, wrapped into Sentry capture if the logging integration is enabled.
    pub fn with_log_destination(
        self,
        logger: impl log::Log + 'static,
        max_level: log::LevelFilter,
    ) -> Self {
        self.log_capture.set_destination(Box::new(logger), max_level);
        self
    }

    /// Registers an integration that is only enabled if auto-enabling integrations are requested.
    pub fn with_auto_integration<I: Integration>(mut self, integration: I) -> Self {
        self.auto_enabling_integrations.push(Arc::new(integration));
        self
    }

    fn resolve(&self, id: &str) -> Option<Arc<dyn Integration>> {
        self.default_integrations
            .iter()
            .chain(&self.auto_enabling_integrations)
            .find(|integration| integration.name() == id)
            .cloned()
    }

    fn client_guard(&self) -> MutexGuard<'_, Option<ClientInitGuard>> {
        self.client_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ErrorReportingSdk for SentryBackend {
    fn has_active_client(&self) -> bool {
        Hub::current().client().is_some()
    }

    fn default_integrations(&self) -> Vec<String> {
        self.default_integrations
            .iter()
            .map(|integration| integration.name().to_owned())
            .collect()
    }

    fn auto_enabling_integrations(&self) -> Vec<String> {
        self.auto_enabling_integrations
            .iter()
            .map(|integration| integration.name().to_owned())
            .collect()
    }

    fn logging_integration(&self) -> &str {
        LogCaptureIntegration::NAME
    }

    fn init(&self, options: InitOptions) -> anyhow::Result<()> {
        // The DSN is not included into the error since it contains the project key.
        let dsn: Dsn = options.dsn.parse().context("failed parsing Sentry DSN")?;
        let mut integrations = options
            .integrations
            .iter()
            .map(|id| {
                self.resolve(id)
                    .with_context(|| format!("unknown Sentry integration `{id}`"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        if options.auto_enabling_integrations {
            for integration in &self.auto_enabling_integrations {
                if !options.integrations.iter().any(|id| id == integration.name()) {
                    integrations.push(integration.clone());
                }
            }
        }

        let client_options = ClientOptions {
            dsn: Some(dsn),
            debug: options.debug,
            // `integrations` is already the complete set; `sentry::init()` must not prepend its
            // own defaults to it.
            default_integrations: false,
            integrations,
            release: sentry::release_name!(),
            environment: self.environment.clone().map(Cow::from),
            ..ClientOptions::default()
        };
        let guard = sentry::init(client_options);
        *self.client_guard() = Some(guard);
        if !options.integrations.iter().any(|id| id == LogCaptureIntegration::NAME) {
            self.log_capture.install_destination_only();
        }
        Ok(())
    }

    fn flush(&self, timeout: Duration) -> bool {
        match &*self.client_guard() {
            Some(guard) => guard.flush(Some(timeout)),
            None => true,
        }
    }

    fn close(&self, timeout: Duration) -> bool {
        // `take` ensures that the closed client cannot be flushed or closed again.
        match self.client_guard().take() {
            Some(guard) => guard.close(Some(timeout)),
            None => true,
        }
    }
}

/// Integration capturing records of the `log` crate from *all* targets: errors as events,
/// info and warnings as breadcrumbs.
///
/// During client setup, the integration installs a [`SentryLogger`] as the global `log` logger.
/// The logger wraps the application logger supplied with
/// [`SentryBackend::with_log_destination()`], so records still reach it. The `log` crate allows
/// a single logger per process; if another logger is installed beforehand, nothing is captured.
#[derive(Debug)]
pub struct LogCaptureIntegration {
    /// Taken on installation.
    destination: Mutex<Option<LogDestination>>,
}

impl Default for LogCaptureIntegration {
    fn default() -> Self {
        Self {
            destination: Mutex::new(Some(LogDestination::default())),
        }
    }
}

impl LogCaptureIntegration {
    pub const NAME: &'static str = "logging";

    fn destination(&self) -> MutexGuard<'_, Option<LogDestination>> {
        self.destination
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_destination(&self, logger: Box<dyn log::Log>, max_level: log::LevelFilter) {
        match &mut *self.destination() {
            Some(destination) => {
                *destination = LogDestination {
                    logger: Some(logger),
                    max_level,
                };
            }
            None => {
                tracing::warn!("global `log` logger is already installed; ignoring new destination");
            }
        }
    }

    /// Installs the application logger without Sentry capture.
    fn install_destination_only(&self) {
        let Some(destination) = self.destination().take() else {
            return;
        };
        if destination.logger.is_some() {
            let max_level = destination.max_level;
            install_logger(destination, max_level);
        }
    }
}

impl Integration for LogCaptureIntegration {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn setup(&self, _options: &mut ClientOptions) {
        let Some(destination) = self.destination().take() else {
            return;
        };
        // Sentry needs at least info records for breadcrumbs.
        let max_level = destination.max_level.max(log::LevelFilter::Info);
        install_logger(SentryLogger::with_dest(destination), max_level);
    }
}

fn install_logger(logger: impl log::Log + 'static, max_level: log::LevelFilter) {
    match log::set_boxed_logger(Box::new(logger)) {
        Ok(()) => log::set_max_level(max_level),
        Err(err) => tracing::warn!("`log` records will not be captured by Sentry: {err}"),
    }
}

/// Application logger wrapped by [`LogCaptureIntegration`]. Without a logger, records are
/// only reported to Sentry.
struct LogDestination {
    logger: Option<Box<dyn log::Log>>,
    max_level: log::LevelFilter,
}

impl Default for LogDestination {
    fn default() -> Self {
        Self {
            logger: None,
            max_level: log::LevelFilter::Info,
        }
    }
}

impl fmt::Debug for LogDestination {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LogDestination")
            .field("has_logger", &self.logger.is_some())
            .field("max_level", &self.max_level)
            .finish()
    }
}

impl log::Log for LogDestination {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= self.max_level
            && self
                .logger
                .as_ref()
                .map_or(false, |logger| logger.enabled(metadata))
    }

    fn log(&self, record: &log::Record<'_>) {
        if let Some(logger) = &self.logger {
            if self.enabled(record.metadata()) {
                logger.log(record);
            }
        }
    }

    fn flush(&self) {
        if let Some(logger) = &self.logger {
            logger.flush();
        }
    }
}
