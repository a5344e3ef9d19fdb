//! Configuration for the rtpeaks detector.
//!
//! Every section has a `Default` carrying the tuned values, so a TOML file only
//! needs to name what it changes:
//!
//! ```toml
//! [detection]
//! rate = 50.0
//! initial_timeout_ms = 2000
//!
//! [baseline]
//! enabled = true
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{PeakError, Result};

/// Detection sample rate
///
/// The detector decimates the incoming stream to this rate. It can be given
/// either as a frequency or as a sampling interval.
///
/// # Parsing formats
/// - `50` - frequency in Hz (no suffix)
/// - `50hz` or `50Hz` - frequency in Hz (explicit)
/// - `20ms` - sampling interval in milliseconds
///
/// # Example
/// ```
/// use rtpeaks::config::DetectionRate;
///
/// let rate: DetectionRate = "20ms".parse().unwrap();
/// assert!((rate.as_hz() - 50.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct DetectionRate(f64);

impl DetectionRate {
    pub fn from_hz(hz: f64) -> Self {
        Self(hz)
    }

    pub fn from_interval_ms(ms: f64) -> Self {
        Self(1000.0 / ms)
    }

    pub fn as_hz(&self) -> f64 {
        self.0
    }

    /// Whether this rate is a positive, finite frequency
    pub fn is_valid(&self) -> bool {
        self.0 > 0.0 && self.0.is_finite()
    }

    /// Minimum spacing between accepted samples, in milliseconds
    pub fn interval_ms(&self) -> f64 {
        1000.0 / self.0
    }
}

impl Default for DetectionRate {
    fn default() -> Self {
        Self::from_hz(50.0)
    }
}

impl fmt::Display for DetectionRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}hz", self.0)
    }
}

impl FromStr for DetectionRate {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(num) = s.strip_suffix("ms") {
            let ms: f64 = num
                .trim()
                .parse()
                .map_err(|_| format!("invalid interval: {}", s))?;
            if ms <= 0.0 {
                return Err("interval must be positive".to_string());
            }
            return Ok(Self::from_interval_ms(ms));
        }

        let num = s
            .strip_suffix("hz")
            .or_else(|| s.strip_suffix("Hz"))
            .or_else(|| s.strip_suffix("HZ"))
            .unwrap_or(s);

        let hz: f64 = num
            .trim()
            .parse()
            .map_err(|_| format!("invalid frequency: {}", s))?;
        if hz <= 0.0 || !hz.is_finite() {
            return Err("frequency must be positive".to_string());
        }
        Ok(Self::from_hz(hz))
    }
}

/// What happens to a confirmed detection besides being logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SignalMode {
    /// Confirmations are only logged
    Debug,
    /// Real-time confirmations are also signalled to the external device
    #[default]
    Live,
}

/// Top-level detector configuration
///
/// # Example
/// ```
/// use rtpeaks::config::{DetectionRate, DetectorConfig};
///
/// let mut config = DetectorConfig::default();
/// config.detection.rate = DetectionRate::from_hz(100.0);
/// assert!((config.detection.rate.interval_ms() - 10.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Live detection configuration
    pub detection: DetectionConfig,
    /// Calibration (baseline) configuration
    pub baseline: BaselineConfig,
    /// Queue sizing and channel selection
    pub pipeline: PipelineConfig,
}

/// Live detection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Rate the incoming stream is decimated to before detection
    pub rate: DetectionRate,
    /// Starvation timeout in milliseconds used while the history holds no
    /// confirmed peak/trough pair
    pub initial_timeout_ms: i64,
    /// Whether confirmations are signalled or only logged
    pub signal_mode: SignalMode,
    /// Consecutive malformed samples between two health reports
    pub malformed_report_every: usize,
}

/// Baseline seeding configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// Wait for a calibration recording before live detection starts
    pub enabled: bool,
    /// Normalized height threshold handed to the batch peak finder (0-1 range)
    pub height_threshold: f64,
    /// Minimum spacing between two extrema of the same kind, in milliseconds
    pub min_distance_ms: i64,
}

/// Three-stage pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Capacity of the sampler -> detector queue
    pub input_capacity: usize,
    /// Capacity of the detector -> consumer queue
    pub output_capacity: usize,
    /// Zero-based data column watched in a multi-channel recording
    pub channel: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            rate: DetectionRate::default(),
            initial_timeout_ms: 2000,
            signal_mode: SignalMode::Live,
            malformed_report_every: 10,
        }
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            height_threshold: 0.2,
            min_distance_ms: 200,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_capacity: 256,
            output_capacity: 64,
            channel: 0,
        }
    }
}

impl DetectorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| PeakError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        let rate = self.detection.rate;
        if !rate.is_valid() {
            return Err(PeakError::Config(format!(
                "detection rate must be positive, got {}",
                rate.as_hz()
            )));
        }
        if self.detection.initial_timeout_ms <= 0 {
            return Err(PeakError::Config("initial_timeout_ms must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.baseline.height_threshold) {
            return Err(PeakError::InvalidThreshold(self.baseline.height_threshold));
        }
        if self.pipeline.input_capacity == 0 || self.pipeline.output_capacity == 0 {
            return Err(PeakError::Config("queue capacities must be non-zero".into()));
        }
        Ok(())
    }
}
