//! Dev/production render mode (spec §6; SPEC_FULL §8).

use std::sync::OnceLock;

/// Distinguishes pretty-printed, indented output from tight production
/// output. The only process-wide state this crate keeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Dev,
    Production,
}

static RENDER_MODE: OnceLock<RenderMode> = OnceLock::new();

impl RenderMode {
    /// The cached, environment-derived mode. Read once per process.
    pub fn current() -> Self {
        *RENDER_MODE.get_or_init(Self::from_env)
    }

    /// Re-derives the mode from the environment, ignoring the cache.
    /// Exposed for embedders and tests that want to probe behavior under a
    /// specific value without relying on the process-wide cache having been
    /// primed a particular way.
    pub fn from_env() -> Self {
        if let Ok(value) = std::env::var("PGFRAG_DEV") {
            let lower = value.to_ascii_lowercase();
            if matches!(lower.as_str(), "1" | "true" | "yes" | "dev" | "development") {
                return RenderMode::Dev;
            }
            if matches!(lower.as_str(), "0" | "false" | "no" | "prod" | "production") {
                return RenderMode::Production;
            }
        }
        for var in ["NODE_ENV", "APP_ENV"] {
            if let Ok(value) = std::env::var(var) {
                let lower = value.to_ascii_lowercase();
                if lower == "development" || lower == "dev" {
                    return RenderMode::Dev;
                }
            }
        }
        RenderMode::Production
    }
}
