use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use rtpeaks::io::write_csv_recording;
use rtpeaks::simulation::{NoiseConfig, Waveform, apply_noise, generate_waveform, with_dropout};

#[derive(Parser, Debug)]
#[command(name = "generate_recording")]
#[command(about = "Generate synthetic physiological recordings for detector testing")]
struct Args {
    /// Output CSV file
    output: PathBuf,

    /// Waveform shape: sine, respiration, flat
    #[arg(short, long, value_enum, default_value = "respiration")]
    shape: Shape,

    /// Recording length in seconds
    #[arg(short, long, default_value_t = 60.0)]
    duration: f64,

    /// Sampling rate in Hz
    #[arg(long, default_value_t = 100.0)]
    sample_rate: f64,

    /// Cycle length in milliseconds
    #[arg(short, long, default_value_t = 4000.0)]
    period_ms: f64,

    /// Waveform scale
    #[arg(short, long, default_value_t = 1.0)]
    amplitude: f64,

    /// TOML noise configuration file
    #[arg(short, long)]
    noise: Option<PathBuf>,

    /// Gaussian noise standard deviation (CLI override)
    #[arg(long)]
    gaussian: Option<f64>,

    /// Remove samples in this range, e.g. "3000-9000" (ms)
    #[arg(long)]
    dropout: Option<String>,

    /// Seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Shape {
    Sine,
    Respiration,
    Flat,
}

impl From<Shape> for Waveform {
    fn from(shape: Shape) -> Self {
        match shape {
            Shape::Sine => Waveform::Sine,
            Shape::Respiration => Waveform::Respiration,
            Shape::Flat => Waveform::Flat,
        }
    }
}

fn parse_dropout(range: &str) -> Result<(i64, i64)> {
    let (start, end) = range
        .split_once('-')
        .context("Dropout must look like START-END")?;
    let start: i64 = start.trim().parse().context("Invalid dropout start")?;
    let end: i64 = end.trim().parse().context("Invalid dropout end")?;
    if end <= start {
        anyhow::bail!("Dropout end must be after its start");
    }
    Ok((start, end))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut noise = match &args.noise {
        Some(path) => {
            let content = fs::read_to_string(path).context("Failed to read noise config")?;
            toml::from_str::<NoiseConfig>(&content).context("Failed to parse noise config")?
        }
        None => NoiseConfig::default(),
    };
    if let Some(std_dev) = args.gaussian {
        noise = noise.with_gaussian(std_dev);
    }
    if let Some(seed) = args.seed {
        noise = noise.with_seed(seed);
    }

    let step_ms = (1000.0 / args.sample_rate).round().max(1.0) as i64;
    let duration_ms = (args.duration * 1000.0) as i64;
    let clean = generate_waveform(
        args.shape.into(),
        duration_ms,
        step_ms,
        args.period_ms,
        args.amplitude,
    );
    let mut samples = apply_noise(&clean, &noise);
    if let Some(range) = &args.dropout {
        let (start, end) = parse_dropout(range)?;
        samples = with_dropout(&samples, start, end);
    }

    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    write_csv_recording(BufWriter::new(file), &samples)?;

    println!(
        "Wrote {} samples ({:?}, {} ms step) to {}",
        samples.len(),
        args.shape,
        step_ms,
        args.output.display()
    );
    Ok(())
}
