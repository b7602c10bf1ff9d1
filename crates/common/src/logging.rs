//! Runtime-reloadable log filter (§3.1 of the expanded spec): the
//! admin-mutable `log-level` config-kv key (§6) changes the active
//! `tracing` filter without a process restart.

use tracing_subscriber::EnvFilter;

use crate::{AppError, AppResult};

/// A live handle to the process's `EnvFilter` layer, installed once at
/// startup directly atop the registry (so its subscriber type parameter is
/// `Registry`).
type ReloadHandle = tracing_subscriber::reload::Handle<EnvFilter, tracing_subscriber::Registry>;

/// Thin wrapper kept in `relay-api`'s `AppState` so the config endpoint can
/// change the active log filter without depending on `tracing_subscriber`'s
/// generic reload types directly.
#[derive(Clone)]
pub struct LogFilterHandle(ReloadHandle);

impl LogFilterHandle {
    #[must_use]
    pub const fn new(handle: ReloadHandle) -> Self {
        Self(handle)
    }

    /// Builds a handle detached from any live subscriber, for tests that
    /// need an `AppState` but don't exercise log output.
    #[must_use]
    pub fn for_testing() -> Self {
        let (_layer, handle) =
            tracing_subscriber::reload::Layer::<EnvFilter, tracing_subscriber::Registry>::new(EnvFilter::new("info"));
        Self(handle)
    }

    /// Replaces the active filter directive.
    ///
    /// # Errors
    /// Returns [`AppError::Validation`] if `directive` doesn't parse as an
    /// `EnvFilter` directive string, or [`AppError::Internal`] if the
    /// subscriber has since been dropped.
    pub fn set(&self, directive: &str) -> AppResult<()> {
        let filter =
            EnvFilter::try_new(directive).map_err(|e| AppError::Validation(format!("invalid log filter: {e}")))?;
        self.0
            .reload(filter)
            .map_err(|e| AppError::Internal(format!("failed to reload log filter: {e}")))
    }
}

/// Maps the spec's `log-level` enum (§6: `DEBUG|VERBOSE|INFO|WARNING|ERROR|CRITICAL`)
/// to a `tracing` directive scoped to the relay's own target.
#[must_use]
pub fn directive_for_log_level(level: &str) -> &'static str {
    match level.to_uppercase().as_str() {
        "DEBUG" => "relay=debug",
        "VERBOSE" => "relay=trace",
        "INFO" => "relay=info",
        "WARNING" => "relay=warn",
        "ERROR" | "CRITICAL" => "relay=error",
        _ => "relay=info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_log_levels_to_directives() {
        assert_eq!(directive_for_log_level("DEBUG"), "relay=debug");
        assert_eq!(directive_for_log_level("warning"), "relay=warn");
        assert_eq!(directive_for_log_level("CRITICAL"), "relay=error");
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        assert_eq!(directive_for_log_level("NOPE"), "relay=info");
    }

    #[test]
    fn set_rejects_malformed_directive() {
        let handle = LogFilterHandle::for_testing();
        let result = handle.set("not a valid directive!!");
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn set_accepts_well_formed_directive() {
        let handle = LogFilterHandle::for_testing();
        assert!(handle.set("relay=debug").is_ok());
    }
}
