//! Migration of DSNs written for the deprecated `raven` client.

/// Scheme wrapper accepted by `raven` (e.g. `requests+https://...`) but not by the Sentry SDK.
const RAVEN_TRANSPORT_PREFIX: &str = "requests+";

/// Rewrites a DSN so that the Sentry SDK accepts it.
///
/// `raven` DSNs may carry a `requests+` scheme wrapper and transport options in the query string
/// (e.g. `?verify_ssl=0`). Both are stripped: the prefix first, then everything starting with
/// the last `?`. A DSN without either is returned unchanged; nested wrappers are peeled one
/// level per call.
pub fn sanitize_dsn(raw: &str) -> String {
    let dsn = raw.strip_prefix(RAVEN_TRANSPORT_PREFIX).unwrap_or(raw);
    let dsn = match dsn.rfind('?') {
        Some(query_start) => &dsn[..query_start],
        None => dsn,
    };
    dsn.to_owned()
}
