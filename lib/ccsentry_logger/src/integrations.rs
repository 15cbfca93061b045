//! Selection of the integrations passed explicitly to the SDK.

/// Which groups of SDK integrations should be enabled.
///
/// The SDK can only switch its default integrations on or off as a whole, so the shim computes the
/// exact list itself and passes it with the SDK's own defaults disabled. That way all default
/// integrations except the logging one (which would capture records from *every* logger) can be
/// kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrationSelection {
    pub enable_defaults: bool,
    pub enable_logging: bool,
    pub enable_auto: bool,
}

impl IntegrationSelection {
    /// Computes the ordered list of integration identifiers: the default set (without
    /// `logging_integration` unless logging is enabled), followed by the auto-enabling set.
    /// Duplicates across the two sets are preserved.
    pub fn select(
        &self,
        logging_integration: &str,
        default_set: &[String],
        auto_set: &[String],
    ) -> Vec<String> {
        let mut integrations = Vec::with_capacity(default_set.len() + auto_set.len());
        if self.enable_defaults {
            integrations.extend_from_slice(default_set);
        }
        if !self.enable_logging {
            integrations.retain(|id| id != logging_integration);
        }
        if self.enable_auto {
            integrations.extend_from_slice(auto_set);
        }
        integrations
    }
}
