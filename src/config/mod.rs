//! Harness configuration
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration. Environment variables override file values.

use crate::error::{Error, Result};
use crate::report::ReportStyle;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding [`HarnessConfig::report_style`]
pub const ENV_REPORT_STYLE: &str = "HARNESS_REPORT_STYLE";
/// Environment variable overriding [`HarnessConfig::log_filter`]
pub const ENV_LOG: &str = "HARNESS_LOG";

/// Configuration shared by every suite run with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Line format used by the reporter
    pub report_style: ReportStyle,
    /// Absolute tolerance for legacy numeric comparisons. `None` means exact
    /// IEEE-754 equality.
    pub numeric_tolerance: Option<f64>,
    /// Appended to a failed case's reason by the runner
    pub failure_annotation: String,
    /// Emit the suite summary line after the last case
    pub emit_summary: bool,
    /// `tracing` filter directive, e.g. `conformance_harness=debug`
    pub log_filter: Option<String>,
    /// Smallest delay a timer may be scheduled with
    pub min_timer_delay_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            report_style: ReportStyle::Mozilla,
            numeric_tolerance: None,
            failure_annotation: "wrong value ".to_string(),
            emit_summary: true,
            log_filter: None,
            min_timer_delay_ms: 1,
        }
    }
}

impl HarnessConfig {
    /// Parse from a JSON document
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in
    /// production, a map in tests)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(style) = lookup(ENV_REPORT_STYLE) {
            self.report_style = style.parse()?;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = Some(filter);
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject values the runner cannot work with
    pub fn validate(&self) -> Result<()> {
        if let Some(eps) = self.numeric_tolerance {
            if !eps.is_finite() || eps < 0.0 {
                return Err(Error::invalid_config(format!(
                    "numeric_tolerance must be a finite, non-negative number, got {}",
                    eps
                )));
            }
        }
        if self.failure_annotation.trim().is_empty() {
            return Err(Error::invalid_config("failure_annotation must not be empty"));
        }
        if self.min_timer_delay_ms == 0 {
            return Err(Error::invalid_config("min_timer_delay_ms must be at least 1"));
        }
        Ok(())
    }
}
