//! Engine tunables, loadable from JSON.
//!
//! Every field has a default, so `{}` is a valid configuration document.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::duration::validate_durations;
use crate::error::{Result, SlotError};

/// Upper bound for `start_grace_minutes`: one day.
const MAX_START_GRACE_MINUTES: i64 = 24 * 60;
/// Upper bound for `minimum_range_days` and the page sizes: ten years.
const MAX_RANGE_DAYS: i64 = 3_660;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// A query start in the past is pushed to `now` plus this many minutes.
    pub start_grace_minutes: i64,
    /// Query ranges shorter than this many days are extended.
    pub minimum_range_days: i64,
    /// Day windows generated per meeting-hub page.
    pub page_days: u32,
    /// Days between the first windows of consecutive pages.
    pub page_stride_days: u32,
    /// Durations used when neither a slot nor its profile declares any.
    pub default_durations: Vec<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            start_grace_minutes: 5,
            minimum_range_days: 10,
            page_days: 8,
            page_stride_days: 7,
            default_durations: vec![15],
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| SlotError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| SlotError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0..=MAX_START_GRACE_MINUTES).contains(&self.start_grace_minutes) {
            return Err(SlotError::Config(format!(
                "start_grace_minutes must be between 0 and {MAX_START_GRACE_MINUTES}"
            )));
        }
        if !(0..=MAX_RANGE_DAYS).contains(&self.minimum_range_days) {
            return Err(SlotError::Config(format!(
                "minimum_range_days must be between 0 and {MAX_RANGE_DAYS}"
            )));
        }
        if self.page_days == 0 || i64::from(self.page_days) > MAX_RANGE_DAYS {
            return Err(SlotError::Config(format!(
                "page_days must be between 1 and {MAX_RANGE_DAYS}"
            )));
        }
        if i64::from(self.page_stride_days) > MAX_RANGE_DAYS {
            return Err(SlotError::Config(format!(
                "page_stride_days must be at most {MAX_RANGE_DAYS}"
            )));
        }
        if self.default_durations.is_empty() {
            return Err(SlotError::Config(
                "default_durations must not be empty".to_string(),
            ));
        }
        validate_durations(&self.default_durations)
    }
}
