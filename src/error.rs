use thiserror::Error;

#[derive(Error, Debug)]
pub enum PeakError {
    #[error("Input channel closed without a cancellation sentinel")]
    ChannelClosed,

    #[error("Output channel closed while {0} event(s) were pending")]
    OutputClosed(usize),

    #[error("Height threshold must be in [0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PeakError>;
