//! Test utilities shared by unit tests in this crate.

use std::{
    collections::HashMap,
    env,
    ffi::{OsStr, OsString},
    fmt, mem,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use tracing::{field::Visit, Subscriber};
use tracing_subscriber::{layer::Context, Layer};

use crate::sdk::{ErrorReportingSdk, InitOptions};

/// Shared by all tests reading `SENTRY_DSN` and `CCSENTRY_*` variables.
pub(crate) static ENV_MUTEX: EnvMutex = EnvMutex::new();

/// Mutex that allows to modify certain env variables and roll them back to initial values when
/// the corresponding [`EnvMutexGuard`] is dropped.
#[derive(Debug)]
pub(crate) struct EnvMutex(Mutex<()>);

impl EnvMutex {
    pub const fn new() -> Self {
        Self(Mutex::new(()))
    }

    pub fn lock(&self) -> EnvMutexGuard<'_> {
        let guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        EnvMutexGuard {
            _inner: guard,
            redefined_vars: HashMap::new(),
        }
    }
}

/// Guard provided by [`EnvMutex`] that allows mutating env variables. All changes are rolled back
/// when the guard is dropped.
#[must_use = "Environment will be reset when the guard is dropped"]
#[derive(Debug)]
pub(crate) struct EnvMutexGuard<'a> {
    _inner: MutexGuard<'a, ()>,
    redefined_vars: HashMap<OsString, Option<OsString>>,
}

impl Drop for EnvMutexGuard<'_> {
    fn drop(&mut self) {
        for (env_name, value) in mem::take(&mut self.redefined_vars) {
            if let Some(value) = value {
                env::set_var(env_name, value);
            } else {
                env::remove_var(env_name);
            }
        }
    }
}

impl EnvMutexGuard<'_> {
    fn remember(&mut self, variable_name: &OsStr) {
        if !self.redefined_vars.contains_key(variable_name) {
            let prev_value = env::var_os(variable_name);
            self.redefined_vars
                .insert(variable_name.to_os_string(), prev_value);
        }
    }

    /// Sets env vars specified in `.env`-like format. Values may be quoted; they are not trimmed
    /// further.
    pub fn set_env(&mut self, fixture: &str) {
        for line in fixture.split('\n').map(str::trim) {
            if line.is_empty() {
                continue;
            }

            let (name, value) = line
                .split_once('=')
                .unwrap_or_else(|| panic!("Incorrect line for setting environment variable: {line}"));
            self.set_var(name, value.trim_matches('"'));
        }
    }

    /// Sets a single env var to a verbatim value.
    pub fn set_var(&mut self, name: &str, value: &str) {
        let variable_name: &OsStr = name.as_ref();
        self.remember(variable_name);
        env::set_var(variable_name, value);
    }

    /// Removes the specified env vars.
    pub fn remove_env(&mut self, var_names: &[&str]) {
        for &var_name in var_names {
            let variable_name: &OsStr = var_name.as_ref();
            self.remember(variable_name);
            env::remove_var(variable_name);
        }
    }
}

/// Collaborator double recording `init()` calls.
#[derive(Debug, Default)]
pub(crate) struct MockSdk {
    pub has_client: AtomicBool,
    pub fail_init: AtomicBool,
    init_calls: Mutex<Vec<InitOptions>>,
    has_client_checks: AtomicUsize,
}

impl MockSdk {
    pub const LOGGING: &'static str = "logging";
    pub const DEFAULT_INTEGRATIONS: [&'static str; 5] =
        ["logging", "stdlib", "excepthook", "dedupe", "atexit"];
    pub const AUTO_INTEGRATIONS: [&'static str; 2] = ["flask", "redis"];

    pub fn with_active_client() -> Self {
        let this = Self::default();
        this.has_client.store(true, Ordering::SeqCst);
        this
    }

    pub fn init_calls(&self) -> Vec<InitOptions> {
        self.init_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_client_checks(&self) -> usize {
        self.has_client_checks.load(Ordering::SeqCst)
    }
}

impl ErrorReportingSdk for MockSdk {
    fn has_active_client(&self) -> bool {
        self.has_client_checks.fetch_add(1, Ordering::SeqCst);
        self.has_client.load(Ordering::SeqCst)
    }

    fn default_integrations(&self) -> Vec<String> {
        Self::DEFAULT_INTEGRATIONS.map(str::to_owned).to_vec()
    }

    fn auto_enabling_integrations(&self) -> Vec<String> {
        Self::AUTO_INTEGRATIONS.map(str::to_owned).to_vec()
    }

    fn logging_integration(&self) -> &str {
        Self::LOGGING
    }

    fn init(&self, options: InitOptions) -> anyhow::Result<()> {
        if self.fail_init.load(Ordering::SeqCst) {
            anyhow::bail!("mock init failure");
        }
        self.init_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(options);
        self.has_client.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// `tracing` layer collecting `(level, message)` pairs of all events.
#[derive(Debug, Clone, Default)]
pub(crate) struct CapturingLayer {
    events: Arc<Mutex<Vec<(tracing::Level, String)>>>,
}

impl CapturingLayer {
    pub fn events(&self) -> Vec<(tracing::Level, String)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for CapturingLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((*event.metadata().level(), visitor.0));
    }
}

#[test]
fn env_mutex_basics() {
    const TEST_VARIABLE_NAME: &str = "CCSENTRY_TEST_VARIABLE_THAT_WILL_CERTAINLY_NOT_BE_SET";
    const REDEFINED_VARIABLE_NAME: &str = "CCSENTRY_REDEFINED_VARIABLE_THAT_WILL_CERTAINLY_NOT_BE_SET";

    let mutex = EnvMutex::new();
    assert!(env::var_os(TEST_VARIABLE_NAME).is_none());
    assert!(env::var_os(REDEFINED_VARIABLE_NAME).is_none());
    env::set_var(REDEFINED_VARIABLE_NAME, "initial");

    let mut lock = mutex.lock();
    lock.set_env(&format!("{TEST_VARIABLE_NAME}=\"test=value\""));
    assert!(lock.redefined_vars[OsStr::new(TEST_VARIABLE_NAME)].is_none());
    assert_eq!(env::var_os(TEST_VARIABLE_NAME).unwrap(), "test=value");
    lock.set_var(REDEFINED_VARIABLE_NAME, " redefined ");
    assert_eq!(
        lock.redefined_vars[OsStr::new(REDEFINED_VARIABLE_NAME)]
            .as_ref()
            .unwrap(),
        "initial"
    );
    assert_eq!(env::var_os(REDEFINED_VARIABLE_NAME).unwrap(), " redefined ");

    lock.remove_env(&[REDEFINED_VARIABLE_NAME]);
    assert!(env::var_os(REDEFINED_VARIABLE_NAME).is_none());

    drop(lock);
    assert!(env::var_os(TEST_VARIABLE_NAME).is_none());
    assert_eq!(env::var_os(REDEFINED_VARIABLE_NAME).unwrap(), "initial");
    env::remove_var(REDEFINED_VARIABLE_NAME);
}
