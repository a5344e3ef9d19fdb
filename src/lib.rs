pub mod config;
pub mod constants;
pub mod detection;
pub mod error;
pub mod io;
pub mod output;
pub mod pipeline;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use config::DetectorConfig;
pub use error::{PeakError, Result};
pub use pipeline::{Pipeline, detect_offline};
