use anyhow::{Result, anyhow};
use serde::Deserialize;

/// Environment variable that overrides [`RuntimeConfig::max_call_depth`].
pub const MAX_CALL_DEPTH_ENV: &str = "LDK_MAX_CALL_DEPTH";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RuntimeConfig {
    /// Maximum number of nested frames before `VmContext::call` reports a stack overflow.
    pub max_call_depth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { max_call_depth: 200 }
    }
}

impl RuntimeConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).map_err(|e| anyhow!("invalid runtime config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides read through `get`. Values that are not a positive
    /// integer are ignored.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = get(MAX_CALL_DEPTH_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(depth) if depth > 0 => config.max_call_depth = depth,
                _ => tracing::warn!(target: "ldk::config", "ignoring {}={:?}: expected a positive integer", MAX_CALL_DEPTH_ENV, raw),
            }
        }
        config
    }

    fn validate(&self) -> Result<()> {
        if self.max_call_depth == 0 {
            return Err(anyhow!("max_call_depth must be at least 1"));
        }
        Ok(())
    }
}
