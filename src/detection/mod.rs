pub mod baseline;
pub mod classifier;
pub mod detection_loop;
pub mod extrema;
pub mod thresholds;
mod types;

pub use baseline::{BatchPeakFinder, DerivativePeakFinder, seed};
pub use classifier::{Classification, classify};
pub use detection_loop::{DetectionLoop, Detector, SessionSummary, Step};
pub use extrema::{find_extrema, find_extrema_above, normalize};
pub use thresholds::{Estimate, Thresholds, estimate_thresholds};
pub use types::{DetectionKind, DetectionRecord, Extremum, History, Sample, Window};
