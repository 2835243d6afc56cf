use crate::errors::{HighlightError, Result};
use crate::types::Viewport;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub selector: SelectorConfig,
    pub filter: FilterConfig,
    pub highlight: HighlightConfig,
    pub viewport: Viewport,
}

/// Budget and shape of the robust selector search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Wall-clock budget for a single element, checked between iterations.
    pub timeout_ms: u64,
    /// Upper bound on uniqueness checks (search plus optimization).
    pub max_attempts: usize,
    /// Largest number of combinations kept per depth.
    pub threshold: usize,
    /// Depth at which uniqueness probing starts.
    pub seed_min_length: usize,
    /// Paths at or below this length are not optimized further.
    pub optimized_min_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub viewport_coverage: f64,
    pub origin_tolerance_px: f64,
    pub shallow_depth: usize,
    pub min_size_px: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub overlay_id: String,
    pub border_color: String,
    pub handle_scroll: bool,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            max_attempts: 10000,
            threshold: 1000,
            seed_min_length: 1,
            optimized_min_length: 2,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            viewport_coverage: 0.95,
            origin_tolerance_px: 5.0,
            shallow_depth: 4,
            min_size_px: 1.0,
        }
    }
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            overlay_id: "highlight-overlay".to_string(),
            border_color: "red".to_string(),
            handle_scroll: false,
        }
    }
}

impl Config {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.selector.seed_min_length == 0 {
            return Err(HighlightError::ConfigurationError(
                "selector.seed_min_length must be at least 1".to_string(),
            ));
        }
        if self.selector.threshold == 0 {
            return Err(HighlightError::ConfigurationError(
                "selector.threshold must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.filter.viewport_coverage) {
            return Err(HighlightError::ConfigurationError(
                "filter.viewport_coverage must be within 0..=1".to_string(),
            ));
        }
        Ok(())
    }
}
