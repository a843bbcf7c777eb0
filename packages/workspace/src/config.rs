use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "onlook.config.json";

/// Onlook project configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceConfig {
    /// Extensions of files that may carry instrumented elements
    pub extensions: Vec<String>,

    /// Directory names never indexed or watched
    pub ignored_dirs: Vec<String>,

    /// Upper bound on any single rendering-surface query
    pub surface_timeout_ms: u64,

    /// Backoff for reloading a page that rendered without instrumentation
    pub reload: RetryPolicy,

    /// Undo levels kept by the history
    pub history_depth: usize,

    /// Program used by view-source, invoked as `<program> -g <path>:<line>:<column>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor_command: Option<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            extensions: ["tsx", "jsx", "ts", "js", "html"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            ignored_dirs: ["node_modules", ".next", "dist", "build", ".git"]
                .iter()
                .map(|dir| dir.to_string())
                .collect(),
            surface_timeout_ms: 5000,
            reload: RetryPolicy::default(),
            history_depth: 100,
            editor_command: None,
        }
    }
}

impl WorkspaceConfig {
    /// Load config from a project root, falling back to defaults when absent
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let config_path = root.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: WorkspaceConfig = serde_json::from_str(&content)?;
            tracing::debug!(path = ?config_path, "loaded config");
            Ok(config)
        } else {
            Ok(WorkspaceConfig::default())
        }
    }

    pub fn surface_timeout(&self) -> Duration {
        Duration::from_millis(self.surface_timeout_ms)
    }

    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|allowed| allowed == ext))
            .unwrap_or(false)
    }

    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignored_dirs.iter().any(|dir| dir == name)
    }

    /// True when any component of `path` is an ignored directory
    pub fn is_ignored_path(&self, path: &Path) -> bool {
        path.components()
            .filter_map(|component| component.as_os_str().to_str())
            .any(|name| self.is_ignored_dir(name))
    }
}

/// Capped exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    pub initial_delay_ms: u64,
    pub multiplier: u32,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 3000,
            multiplier: 2,
            max_delay_ms: 30_000,
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based); `None` once exhausted
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let factor = u64::from(self.multiplier).saturating_pow(attempt);
        let millis = self
            .initial_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Some(Duration::from_millis(millis))
    }
}
