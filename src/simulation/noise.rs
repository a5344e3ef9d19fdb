use std::f64::consts::PI;

use rand::RngExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::detection::Sample;

/// Disturbances layered on top of a clean waveform
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct NoiseConfig {
    pub seed: Option<u64>,
    pub additive: Option<AdditiveNoiseConfig>,
    pub wander: Option<BaselineWanderConfig>,
    pub impulse: Option<ImpulseNoiseConfig>,
}

impl NoiseConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_gaussian(mut self, std_dev: f64) -> Self {
        self.additive = Some(AdditiveNoiseConfig { std_dev });
        self
    }

    pub fn with_wander(mut self, amplitude: f64, period_ms: f64) -> Self {
        self.wander = Some(BaselineWanderConfig {
            amplitude,
            period_ms,
        });
        self
    }

    pub fn with_impulse(mut self, rate_hz: f64, amplitude: f64) -> Self {
        self.impulse = Some(ImpulseNoiseConfig { rate_hz, amplitude });
        self
    }
}

/// White gaussian noise
#[derive(Clone, Debug, serde::Deserialize)]
pub struct AdditiveNoiseConfig {
    pub std_dev: f64,
}

/// Slow sinusoidal drift of the signal baseline (e.g. posture changes)
#[derive(Clone, Debug, serde::Deserialize)]
pub struct BaselineWanderConfig {
    pub amplitude: f64,
    pub period_ms: f64,
}

/// Single-sample spikes (e.g. electrode pops)
#[derive(Clone, Debug, serde::Deserialize)]
pub struct ImpulseNoiseConfig {
    pub rate_hz: f64,
    pub amplitude: f64,
}

fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => rand::make_rng(),
    }
}

pub fn apply_noise(clean: &[Sample], config: &NoiseConfig) -> Vec<Sample> {
    let mut samples = clean.to_vec();
    let mut rng = create_rng(config.seed);

    if let Some(ref wander) = config.wander {
        apply_wander(&mut samples, wander);
    }
    if let Some(ref additive) = config.additive {
        apply_additive_noise(&mut samples, additive, &mut rng);
    }
    if let Some(ref impulse) = config.impulse {
        apply_impulse_noise(&mut samples, impulse, &mut rng);
    }

    samples
}

fn apply_additive_noise(
    samples: &mut [Sample],
    config: &AdditiveNoiseConfig,
    rng: &mut ChaCha8Rng,
) {
    let Ok(normal) = Normal::new(0.0, config.std_dev) else {
        log::warn!("Ignoring gaussian noise with std_dev {}", config.std_dev);
        return;
    };
    for sample in samples.iter_mut() {
        sample.amplitude += normal.sample(rng);
    }
}

fn apply_wander(samples: &mut [Sample], config: &BaselineWanderConfig) {
    if config.period_ms <= 0.0 {
        return;
    }
    for sample in samples.iter_mut() {
        let phase = 2.0 * PI * sample.timestamp as f64 / config.period_ms;
        sample.amplitude += config.amplitude * phase.sin();
    }
}

fn apply_impulse_noise(samples: &mut [Sample], config: &ImpulseNoiseConfig, rng: &mut ChaCha8Rng) {
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return;
    };
    let span_ms = (last.timestamp - first.timestamp) as f64;
    if config.rate_hz <= 0.0 || span_ms <= 0.0 {
        return;
    }

    let n = samples.len();
    let avg_samples_between = n as f64 / (config.rate_hz * span_ms / 1000.0);
    let mut pos = 0usize;
    loop {
        let interval = (rng.random::<f64>() * 2.0 * avg_samples_between) as usize;
        pos += interval.max(1);
        if pos >= n {
            break;
        }
        let sign = if rng.random::<bool>() { 1.0 } else { -1.0 };
        samples[pos].amplitude += sign * config.amplitude;
    }
}
