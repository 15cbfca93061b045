//! Handlers forwarding log records to Sentry.
//!
//! Handlers are [`Layer`]s for `tracing-subscriber`, so they can be composed with other layers
//! and filtered per target the same way as any other output. Record conversion, span tracking
//! and emitting are delegated to the SDK's `tracing` integration; a handler only decides which
//! records it takes. Constructing a handler is what initializes the Sentry client
//! (see [`InitializationGuard`]).

use std::{fmt, marker::PhantomData, str::FromStr};

use sentry::integrations::tracing::{EventFilter, SentryLayer};
use tracing::{level_filters::LevelFilter, span, Event, Subscriber};
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

use crate::{
    guard::{InitError, InitializationGuard},
    sdk::ErrorReportingSdk,
    sentry::SentryBackend,
};

/// How records accepted by a [`ReportingHandler`] are reported.
pub trait Granularity: fmt::Debug + Send + Sync + 'static {
    const KIND: HandlerKind;
    /// Threshold used by [`ReportingHandler::new()`].
    const DEFAULT_LEVEL: LevelFilter;
}

/// Records are captured as Sentry events.
#[derive(Debug)]
pub enum Events {}

impl Granularity for Events {
    const KIND: HandlerKind = HandlerKind::Event;
    const DEFAULT_LEVEL: LevelFilter = LevelFilter::ERROR;
}

/// Records are added as breadcrumbs to the current Sentry scope.
#[derive(Debug)]
pub enum Breadcrumbs {}

impl Granularity for Breadcrumbs {
    const KIND: HandlerKind = HandlerKind::Breadcrumb;
    const DEFAULT_LEVEL: LevelFilter = LevelFilter::INFO;
}

/// Handler that ensures that the Sentry client is initialized when constructed and reports
/// records at or above its level through a [`SentryLayer`].
pub struct ReportingHandler<G, S> {
    level: LevelFilter,
    inner: SentryLayer<S>,
    _granularity: PhantomData<G>,
}

/// Handler sending records as Sentry events.
pub type EventHandler<S> = ReportingHandler<Events, S>;
/// Handler recording records as Sentry breadcrumbs.
pub type BreadcrumbHandler<S> = ReportingHandler<Breadcrumbs, S>;

impl<G: Granularity, S> fmt::Debug for ReportingHandler<G, S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ReportingHandler")
            .field("kind", &G::KIND)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

impl<G, S> ReportingHandler<G, S>
where
    G: Granularity,
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    /// Creates a handler with the default level, using the process-wide guard.
    pub fn new() -> Result<Self, InitError> {
        Self::with_guard(
            InitializationGuard::<SentryBackend>::global(),
            G::DEFAULT_LEVEL,
        )
    }

    /// Creates a handler, initializing the client via `guard` if necessary.
    ///
    /// # Errors
    ///
    /// Propagates SDK initialization errors. A missing DSN or a client initialized elsewhere
    /// are not errors.
    pub fn with_guard<T: ErrorReportingSdk>(
        guard: &InitializationGuard<T>,
        level: LevelFilter,
    ) -> Result<Self, InitError> {
        guard.ensure_initialized()?;
        Ok(Self {
            level,
            inner: Self::sentry_layer(level),
            _granularity: PhantomData,
        })
    }

    #[must_use]
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self.inner = Self::sentry_layer(level);
        self
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    fn sentry_layer(level: LevelFilter) -> SentryLayer<S> {
        let kind = G::KIND;
        let layer = sentry::integrations::tracing::layer().event_filter(move |metadata| {
            if *metadata.level() <= level {
                kind.event_filter()
            } else {
                EventFilter::Ignore
            }
        });
        match kind {
            HandlerKind::Event => layer,
            // Spans are tracked by the event handler; tracking them twice would open duplicate
            // Sentry spans when both handlers are installed.
            HandlerKind::Breadcrumb => layer.span_filter(|_| false),
        }
    }
}

impl<G, S> Layer<S> for ReportingHandler<G, S>
where
    G: Granularity,
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        self.inner.on_new_span(attrs, id, ctx);
    }

    fn on_record(&self, span: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        self.inner.on_record(span, values, ctx);
    }

    fn on_enter(&self, id: &span::Id, ctx: Context<'_, S>) {
        self.inner.on_enter(id, ctx);
    }

    fn on_exit(&self, id: &span::Id, ctx: Context<'_, S>) {
        self.inner.on_exit(id, ctx);
    }

    fn on_close(&self, id: span::Id, ctx: Context<'_, S>) {
        self.inner.on_close(id, ctx);
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        self.inner.on_event(event, ctx);
    }
}

/// Handler kinds that can be referenced by name in logging configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Event,
    Breadcrumb,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown handler `{0}`; expected `event` or `breadcrumb`")]
pub struct ParseHandlerKindError(String);

impl FromStr for HandlerKind {
    type Err = ParseHandlerKindError;

    /// Accepts `event` / `breadcrumb` as well as handler type names, optionally path-qualified
    /// (e.g., `ccsentry_logger::EventHandler`). Matching is case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let name = match trimmed.rsplit_once("::") {
            Some((_, name)) => name,
            None => trimmed,
        };
        match name.to_ascii_lowercase().as_str() {
            "event" | "eventhandler" => Ok(Self::Event),
            "breadcrumb" | "breadcrumbhandler" => Ok(Self::Breadcrumb),
            _ => Err(ParseHandlerKindError(s.to_owned())),
        }
    }
}

impl HandlerKind {
    fn event_filter(self) -> EventFilter {
        match self {
            Self::Event => EventFilter::Event,
            Self::Breadcrumb => EventFilter::Breadcrumb,
        }
    }

    /// Builds a handler of this kind with the default level, using the process-wide guard.
    pub fn build<S>(self) -> Result<Box<dyn Layer<S> + Send + Sync>, InitError>
    where
        S: Subscriber + for<'a> LookupSpan<'a> + Send + Sync + 'static,
    {
        self.build_with_guard(InitializationGuard::<SentryBackend>::global())
    }

    pub fn build_with_guard<S, T>(
        self,
        guard: &InitializationGuard<T>,
    ) -> Result<Box<dyn Layer<S> + Send + Sync>, InitError>
    where
        S: Subscriber + for<'a> LookupSpan<'a> + Send + Sync + 'static,
        T: ErrorReportingSdk,
    {
        Ok(match self {
            Self::Event => EventHandler::with_guard(guard, Events::DEFAULT_LEVEL)?.boxed(),
            Self::Breadcrumb => {
                BreadcrumbHandler::with_guard(guard, Breadcrumbs::DEFAULT_LEVEL)?.boxed()
            }
        })
    }
}
