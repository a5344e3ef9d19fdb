use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rolling_stats::Stats;
use serde::Serialize;

use rtpeaks::config::{DetectionRate, DetectorConfig, SignalMode};
use rtpeaks::detection::SessionSummary;
use rtpeaks::io::{Outbound, read_csv_recording};
use rtpeaks::output::{EventLogger, OutputFormat, create_formatter};
use rtpeaks::pipeline::{Pipeline, recording_messages};

#[derive(Parser, Debug)]
#[command(name = "rtpeaks")]
#[command(about = "Replay a recording through the peak/trough detector", long_about = None)]
struct Args {
    /// CSV recording: timestamp in ms, then one column per channel
    recording: PathBuf,

    /// Zero-based channel column to watch
    #[arg(short, long)]
    channel: Option<usize>,

    /// Detection rate (e.g., "50", "50hz", "20ms")
    #[arg(short, long)]
    rate: Option<DetectionRate>,

    /// Calibration recording used to seed the detector
    #[arg(short, long)]
    baseline: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format: text, json, csv
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Signal mode: debug, live
    #[arg(short, long, value_enum)]
    mode: Option<SignalMode>,

    /// Write event log here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write one key code per signalled event ('p' / 't') to this file
    #[arg(long)]
    keys: Option<PathBuf>,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Serialize)]
struct StatsSummary {
    count: usize,
    mean: f64,
    std_dev: f64,
    min: f64,
    max: f64,
}

impl StatsSummary {
    fn from_stats(stats: &Stats<f64>) -> Option<Self> {
        if stats.count == 0 {
            return None;
        }
        Some(Self {
            count: stats.count,
            mean: stats.mean,
            std_dev: stats.std_dev,
            min: stats.min,
            max: stats.max,
        })
    }
}

#[derive(Debug, Serialize)]
struct Report {
    recording: String,
    samples: usize,
    session: SessionSummary,
    cycle_ms: Option<StatsSummary>,
    excursion: Option<StatsSummary>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = build_config(&args)?;

    let samples = read_csv_recording(&args.recording, config.pipeline.channel)
        .with_context(|| format!("Failed to read recording {}", args.recording.display()))?;
    let baseline = match &args.baseline {
        Some(path) => Some(
            read_csv_recording(path, config.pipeline.channel)
                .with_context(|| format!("Failed to read baseline {}", path.display()))?,
        ),
        None => None,
    };
    log::info!(
        "Loaded {} samples from {} (channel {})",
        samples.len(),
        args.recording.display(),
        config.pipeline.channel
    );

    let out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    let mut logger = EventLogger::new(out, create_formatter(args.format, args.verbose > 0))?;
    if let Some(path) = &args.keys {
        let device =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        logger = logger.with_signaller(Box::new(device));
    }

    let mut pipeline = Pipeline::spawn(&config).context("Failed to start detector")?;
    let sampler = pipeline.replay(recording_messages(baseline.as_deref(), &samples))?;
    let received = logger.drain(pipeline.events())?;

    sampler
        .join()
        .map_err(|_| anyhow::anyhow!("Sampler thread panicked"))??;
    let session = pipeline.join().context("Detection failed")?;

    let report = build_report(&args, samples.len(), session, &received);
    eprintln!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn build_config(args: &Args) -> Result<DetectorConfig> {
    let mut config = match &args.config {
        Some(path) => DetectorConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DetectorConfig::default(),
    };

    if let Some(rate) = args.rate {
        config.detection.rate = rate;
    }
    if let Some(mode) = args.mode {
        config.detection.signal_mode = mode;
    }
    if let Some(channel) = args.channel {
        config.pipeline.channel = channel;
    }
    config.baseline.enabled = args.baseline.is_some();
    config.validate()?;

    Ok(config)
}

fn build_report(
    args: &Args,
    samples: usize,
    session: SessionSummary,
    received: &[Outbound],
) -> Report {
    let mut cycle_stats: Stats<f64> = Stats::new();
    let mut excursion_stats: Stats<f64> = Stats::new();

    let confirmed: Vec<_> = received
        .iter()
        .filter_map(Outbound::detection)
        .filter(|e| !e.kind.is_forced())
        .collect();

    // peak-to-peak and trough-to-trough periods
    for pair in confirmed.windows(3) {
        if pair[0].kind == pair[2].kind {
            cycle_stats.update((pair[2].timestamp - pair[0].timestamp) as f64);
        }
    }
    for pair in confirmed.windows(2) {
        excursion_stats.update((pair[0].amplitude - pair[1].amplitude).abs());
    }

    Report {
        recording: args.recording.display().to_string(),
        samples,
        session,
        cycle_ms: StatsSummary::from_stats(&cycle_stats),
        excursion: StatsSummary::from_stats(&excursion_stats),
    }
}
