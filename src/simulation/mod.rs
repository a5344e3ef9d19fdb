mod noise;
mod waveform;

pub use noise::{
    AdditiveNoiseConfig, BaselineWanderConfig, ImpulseNoiseConfig, NoiseConfig, apply_noise,
};
pub use waveform::{
    Waveform, flat_line, generate_waveform, respiration_wave, sine_wave, with_dropout,
};
