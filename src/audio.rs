//! synthetic instrument spectra for the demo
//!
//! Each instrument is a moving bump in the spectrum pulsing on its own beat.
//! Keys 1‑3 mute / unmute instruments.

use std::f32::consts::TAU;

use bevy::input::ButtonInput;
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constants::*;
use crate::interfaces::SpectrumSource;

#[derive(Clone, Debug)]
struct Instrument {
    enabled: bool,
    /// bump centre in [0, 1] of the spectrum
    center: f32,
    /// bump half‑width
    spread: f32,
    /// pulses per second
    beat: f32,
    phase: f32,
}

#[derive(Resource, Clone, Debug)]
pub struct SpectrumFrames {
    instruments: Vec<Instrument>,
    time: f32,
    gain: f32,
}

impl SpectrumFrames {
    pub fn new(count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let instruments = (0..count)
            .map(|i| Instrument {
                enabled: true,
                center: (i as f32 + 0.5) / count.max(1) as f32,
                spread: rng.gen_range(0.03..0.12),
                beat: rng.gen_range(0.5..2.5),
                phase: rng.gen_range(0.0..TAU),
            })
            .collect();
        Self {
            instruments,
            time: 0.0,
            gain: DEMO_SPECTRUM_GAIN,
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.time += dt;
    }

    pub fn toggle(&mut self, channel: usize) -> Option<bool> {
        let inst = self.instruments.get_mut(channel)?;
        inst.enabled = !inst.enabled;
        Some(inst.enabled)
    }
}

impl Default for SpectrumFrames {
    fn default() -> Self {
        Self::new(DEMO_INSTRUMENTS, DEFAULT_SEED)
    }
}

impl SpectrumSource for SpectrumFrames {
    fn channel_count(&self) -> usize {
        self.instruments.len()
    }

    fn channel_enabled(&self, channel: usize) -> bool {
        self.instruments.get(channel).is_some_and(|i| i.enabled)
    }

    fn spectrum(&mut self, channel: usize, out: &mut [f32]) {
        let Some(inst) = self.instruments.get(channel) else {
            return;
        };
        let pulse = 0.5 + 0.5 * (self.time * inst.beat * TAU + inst.phase).sin();
        let drift = 0.1 * (self.time * 0.2 + inst.phase).sin();
        let center = (inst.center + drift).clamp(0.0, 1.0);
        let n = out.len().max(1) as f32;

        for (i, o) in out.iter_mut().enumerate() {
            let d = (i as f32 / n - center) / inst.spread;
            *o = self.gain * pulse * (-d * d).exp();
        }
    }
}

/* ===========================================================
   systems
   =========================================================== */
pub fn synth_spectrum_system(time: Res<Time>, mut frames: ResMut<SpectrumFrames>) {
    frames.advance(time.delta_secs());
}

pub fn instrument_toggle_system(keys: Res<ButtonInput<KeyCode>>, mut frames: ResMut<SpectrumFrames>) {
    for (channel, key) in [KeyCode::Digit1, KeyCode::Digit2, KeyCode::Digit3].into_iter().enumerate() {
        if keys.just_pressed(key) {
            if let Some(on) = frames.toggle(channel) {
                info!("instrument {} {}", channel + 1, if on { "on" } else { "muted" });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::FrequencyData;

    #[test]
    fn muted_instruments_drop_out_of_the_mix() {
        let mut frames = SpectrumFrames::new(2, 9);
        let mut data = FrequencyData::new(64);
        data.update(&mut frames);
        let both: f32 = data.bins().iter().sum();
        assert!(both > 0.0);

        assert_eq!(frames.toggle(1), Some(false));
        assert_eq!(frames.toggle(5), None);
        data.update(&mut frames);
        let one: f32 = data.bins().iter().sum();
        assert!(one < both);

        frames.toggle(0);
        data.update(&mut frames);
        assert!(data.bins().iter().all(|b| *b == 0.0));
    }
}
