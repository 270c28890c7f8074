use crate::capture::CaptureFormat;
use crate::error::{LinkError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharingConfig {
    /// Ticks between initialization attempts while the session is unavailable.
    pub init_retry_ticks: u32,
    /// Seconds of travel added to a projectile's spawn point along its direction.
    pub projectile_lead: f32,
    pub enable_capture: bool,
    /// Oldest frames are evicted once the capture holds this many.
    pub capture_limit: usize,
    pub capture_format: CaptureFormat,
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            init_retry_ticks: 1,
            projectile_lead: 0.016,
            enable_capture: false,
            capture_limit: 1024,
            capture_format: CaptureFormat::Json,
        }
    }
}

impl SharingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_init_retry_ticks(mut self, ticks: u32) -> Self {
        self.init_retry_ticks = ticks;
        self
    }

    pub fn with_projectile_lead(mut self, lead: f32) -> Self {
        self.projectile_lead = lead;
        self
    }

    pub fn with_capture(mut self, enabled: bool, limit: usize) -> Self {
        self.enable_capture = enabled;
        self.capture_limit = limit;
        self
    }

    pub fn with_capture_format(mut self, format: CaptureFormat) -> Self {
        self.capture_format = format;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.init_retry_ticks == 0 {
            return Err(LinkError::Config(
                "init_retry_ticks must be at least 1".to_string(),
            ));
        }
        if self.enable_capture && self.capture_limit == 0 {
            return Err(LinkError::Config(
                "capture_limit must be non-zero when capture is enabled".to_string(),
            ));
        }
        if !self.projectile_lead.is_finite() {
            return Err(LinkError::Config(format!(
                "projectile_lead must be finite, got {}",
                self.projectile_lead
            )));
        }
        Ok(())
    }
}
