//! live audio → height offset
//!
//! `FrequencyData` folds every enabled instrument's spectrum into one array
//! per cycle, and `LinInt` turns that array into a function over `[0, 1]`.

use bevy::log::warn;

use crate::interfaces::SpectrumSource;

/// Piecewise-linear interpolation over evenly spaced key points. The two
/// outermost segments fall back to the averaged endpoints so the curve
/// closes up when it is wrapped around the player.
#[derive(Clone, Debug, Default)]
pub struct LinInt {
    key_points: Vec<f32>,
    averaged_ends: f32,
}

impl LinInt {
    pub fn update(&mut self, data: &[f32]) {
        self.key_points.clear();
        self.key_points.extend_from_slice(data);
        self.averaged_ends = match (data.first(), data.last()) {
            (Some(a), Some(b)) => (a + b) * 0.5,
            _ => 0.0,
        };
    }

    pub fn len(&self) -> usize {
        self.key_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_points.is_empty()
    }

    /// value at `pos`, clamped into `[0, 1]`
    pub fn sample(&self, pos: f32) -> f32 {
        let pos = if (0.0..=1.0).contains(&pos) {
            pos
        } else {
            warn!("LinInt::sample: position {} outside [0, 1], clamping", pos);
            pos.clamp(0.0, 1.0)
        };

        let n = self.key_points.len();
        match n {
            0 => return 0.0,
            1 => return self.key_points[0],
            _ => {}
        }

        let bucket_width = 1.0 / (n - 1) as f32;
        let bucket = ((pos / bucket_width).floor() as usize).min(n - 2);

        let start = if bucket == 0 {
            self.averaged_ends
        } else {
            self.key_points[bucket]
        };
        let end = if bucket == n - 2 {
            self.averaged_ends
        } else {
            self.key_points[bucket + 1]
        };

        let t = (pos - bucket as f32 * bucket_width) / bucket_width;
        start + t * (end - start)
    }
}

/// Aggregated spectrum for the current cycle.
#[derive(Clone, Debug)]
pub struct FrequencyData {
    bins: Vec<f32>,
    scratch: Vec<f32>,
    curve: Option<LinInt>,
}

impl FrequencyData {
    pub fn new(size: usize) -> Self {
        Self {
            bins: vec![0.0; size],
            scratch: vec![0.0; size],
            curve: None,
        }
    }

    /// sum every enabled channel; NaNs and silent bins are skipped
    pub fn update(&mut self, source: &mut dyn SpectrumSource) {
        self.bins.iter_mut().for_each(|b| *b = 0.0);

        for channel in 0..source.channel_count() {
            if !source.channel_enabled(channel) {
                continue;
            }
            self.scratch.iter_mut().for_each(|s| *s = 0.0);
            source.spectrum(channel, &mut self.scratch);

            for (bin, &sample) in self.bins.iter_mut().zip(&self.scratch) {
                if sample.is_finite() && sample != 0.0 {
                    *bin += sample;
                }
            }
        }

        self.curve.get_or_insert_with(LinInt::default).update(&self.bins);
    }

    pub fn bins(&self) -> &[f32] {
        &self.bins
    }

    /// `None` until the first update
    pub fn curve(&self) -> Option<&LinInt> {
        self.curve.as_ref()
    }
}
