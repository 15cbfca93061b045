//! Sentry integration for applications migrating from the deprecated `raven` client.
//!
//! The crate provides two `tracing-subscriber` layers, [`EventHandler`] and [`BreadcrumbHandler`],
//! which can be referenced by name in logging configuration (see [`HandlerKind`]). Both delegate
//! to the SDK's `tracing` integration. Constructing either of them initializes the Sentry client
//! once per process, configured from the environment:
//!
//! | Variable | Default | Effect |
//! |---|---|---|
//! | `SENTRY_DSN` | – | DSN; reporting is disabled if not set. `raven`-style DSNs are sanitized. |
//! | `CCSENTRY_DEBUG` | `false` | SDK debug mode. |
//! | `CCSENTRY_DEFAULT_INTEGRATIONS` | `true` | Enables the SDK default integrations. |
//! | `CCSENTRY_AUTO_ENABLE_LOG` | `false` | Keeps the integration capturing *all* `log` records. |
//! | `CCSENTRY_AUTO_INTEGRATIONS` | `false` | Enables auto-enabling integrations. |
//!
//! ```no_run
//! use ccsentry_logger::{BreadcrumbHandler, EventHandler};
//! use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
//!
//! # fn main() -> anyhow::Result<()> {
//! tracing_subscriber::registry()
//!     .with(EventHandler::new()?)
//!     .with(BreadcrumbHandler::new()?)
//!     .try_init()?;
//! # Ok(())
//! # }
//! ```

pub use crate::{
    config::{parse_bool_env, SentryLoggerConfig},
    dsn::sanitize_dsn,
    guard::{InitError, InitializationGuard},
    handlers::{
        BreadcrumbHandler, Breadcrumbs, EventHandler, Events, Granularity, HandlerKind,
        ParseHandlerKindError, ReportingHandler,
    },
    integrations::IntegrationSelection,
    sdk::{ErrorReportingSdk, InitOptions},
    sentry::{LogCaptureIntegration, SentryBackend},
};

pub mod config;
pub mod dsn;
pub mod guard;
pub mod handlers;
pub mod integrations;
pub mod sdk;
pub mod sentry;
#[cfg(test)]
mod test_utils;
