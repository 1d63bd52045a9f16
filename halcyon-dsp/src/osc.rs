//! Low-frequency sine oscillator
//!
//! Phase-accumulator sine used for auto-panning. It ticks at the block rate,
//! not the sample rate: one sample per audio block is plenty for a pan
//! position.

use std::f32::consts::TAU;

/// Sine LFO ticking at a fixed rate.
pub struct SineLfo {
    rate: f32,
    phase: f32,
    phase_inc: f32,
}

impl SineLfo {
    /// `rate` is the tick rate in Hz (the block rate for per-block use).
    pub fn new(rate: f32) -> Self {
        Self {
            rate,
            phase: 0.0,
            phase_inc: 0.0,
        }
    }

    /// Oscillation frequency, clamped to [0, rate / 2].
    pub fn set_frequency(&mut self, hz: f32) {
        let hz = hz.clamp(0.0, self.rate * 0.5);
        self.phase_inc = hz / self.rate;
    }

    /// Next sample in -1..1.
    #[allow(clippy::should_implement_trait)]
    #[inline]
    pub fn next(&mut self) -> f32 {
        let out = (self.phase * TAU).sin();
        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        out
    }
}
