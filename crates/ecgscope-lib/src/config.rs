use crate::signal::{MAX_POINTS, SAMPLE_RATE};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunables for windowing and chart summaries. Every field may be omitted in TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Sampling frequency used to convert seconds to sample indices (Hz).
    pub sample_rate: u32,
    /// Point budget for a single window.
    pub max_points: usize,
    pub histogram_bins: usize,
    /// Matching tolerance between an event and a series point (seconds).
    pub event_tolerance_s: f64,
    pub default_window_s: f64,
    pub event_zoom_window_s: f64,
    /// How far before an event the zoomed window starts (seconds).
    pub event_zoom_lead_s: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            max_points: MAX_POINTS,
            histogram_bins: 20,
            event_tolerance_s: 0.01,
            default_window_s: 30.0,
            event_zoom_window_s: 1.0,
            event_zoom_lead_s: 0.5,
        }
    }
}

impl ViewerConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let cfg: ViewerConfig = toml::from_str(contents).context("parsing viewer config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("in {}", path.display()))
    }

    /// Load `path` when given, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            bail!("sample_rate must be positive");
        }
        if self.max_points == 0 {
            bail!("max_points must be positive");
        }
        if self.histogram_bins == 0 {
            bail!("histogram_bins must be positive");
        }
        if self.event_tolerance_s.is_nan() || self.event_tolerance_s < 0.0 {
            bail!("event_tolerance_s must be a non-negative number");
        }
        let positive = |value: f64| value.is_finite() && value > 0.0;
        if !positive(self.default_window_s) || !positive(self.event_zoom_window_s) {
            bail!("window lengths must be positive");
        }
        Ok(())
    }
}
