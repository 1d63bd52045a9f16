//! Dynamics glue for the ambience network
//!
//! Envelope-follower ducking, DC blocking and a fixed-character compressor.
//! Together they keep the nonlinear feedback structure from piling up:
//! ducking holds the wet path down while it is already loud, the DC blocker
//! stops offset from recirculating, and the compressor evens out what the
//! diffusers hand back.

use crate::shape::db_to_amp;

/// Convert a time constant in ms to a one-pole smoothing coefficient.
#[inline]
fn time_to_coeff(time_ms: f32, sample_rate: f32) -> f32 {
    (-1.0 / (sample_rate * time_ms / 1000.0)).exp()
}

/// Peak envelope follower driving the wet-path ducking.
pub struct EnvFollower {
    env: f32,
    attack_coeff: f32,
    release_coeff: f32,
}

impl EnvFollower {
    /// Attack time constant in ms.
    const ATTACK_MS: f32 = 5.0;
    /// Release time constant in ms.
    const RELEASE_MS: f32 = 120.0;

    pub fn new(sample_rate: f32) -> Self {
        Self {
            env: 0.0,
            attack_coeff: time_to_coeff(Self::ATTACK_MS, sample_rate),
            release_coeff: time_to_coeff(Self::RELEASE_MS, sample_rate),
        }
    }

    /// Track |input|. Output is clamped to 0..1 so `1 - env` always stays a
    /// valid ducking gain.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let level = input.abs();
        let coeff = if level > self.env {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.env = coeff * self.env + (1.0 - coeff) * level;
        self.env.clamp(0.0, 1.0)
    }
}

/// One-zero/one-pole DC blocker.
pub struct DcBlocker {
    x1: f32,
    y1: f32,
}

impl DcBlocker {
    /// Pole radius; sets the highpass corner a few Hz up.
    const R: f32 = 0.995;

    pub fn new() -> Self {
        Self { x1: 0.0, y1: 0.0 }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let out = input - self.x1 + Self::R * self.y1;
        self.x1 = input;
        self.y1 = out;
        out
    }
}

impl Default for DcBlocker {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-character feedback-taming compressor.
///
/// Hard-knee gain computer in dB, smoothed in the gain domain with separate
/// attack and release coefficients. Makeup is left to the caller.
pub struct Compressor {
    threshold_db: f32,
    ratio: f32,
    attack_coeff: f32,
    release_coeff: f32,
    gain: f32,
}

impl Compressor {
    const ATTACK_MS: f32 = 10.0;
    const RELEASE_MS: f32 = 100.0;
    const RATIO: f32 = 4.0;

    pub fn new(sample_rate: f32) -> Self {
        Self {
            threshold_db: 0.0,
            ratio: Self::RATIO,
            attack_coeff: time_to_coeff(Self::ATTACK_MS, sample_rate),
            release_coeff: time_to_coeff(Self::RELEASE_MS, sample_rate),
            gain: 1.0,
        }
    }

    /// Threshold in dBFS.
    pub fn set_threshold(&mut self, db: f32) {
        self.threshold_db = db;
    }

    #[inline]
    fn linear_to_db(linear: f32) -> f32 {
        if linear > 1e-10 {
            20.0 * linear.log10()
        } else {
            -200.0
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let level_db = Self::linear_to_db(input.abs());
        let over = level_db - self.threshold_db;
        let target = if over > 0.0 {
            // Above threshold: reduce by the slope of the ratio
            db_to_amp(over / self.ratio - over)
        } else {
            1.0
        };

        let coeff = if target < self.gain {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.gain = coeff * self.gain + (1.0 - coeff) * target;

        input * self.gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_follower_rises_and_falls() {
        let mut ef = EnvFollower::new(48_000.0);

        let mut env = 0.0;
        for _ in 0..2000 {
            env = ef.process(0.8);
        }
        assert!(env > 0.7, "envelope must rise toward the level, got {env}");

        for _ in 0..48_000 {
            env = ef.process(0.0);
        }
        assert!(env < 0.01, "envelope must decay after the input stops");
    }

    #[test]
    fn test_env_follower_bounded_for_hot_input() {
        let mut ef = EnvFollower::new(48_000.0);
        for _ in 0..10_000 {
            let env = ef.process(3.0);
            assert!((0.0..=1.0).contains(&env));
        }
    }

    #[test]
    fn test_ducking_gain_stays_positive() {
        let mut ef = EnvFollower::new(48_000.0);
        for _ in 0..10_000 {
            let gain = 1.0 - ef.process(2.5);
            assert!((0.0..=1.0).contains(&gain));
        }
    }

    #[test]
    fn test_dc_blocker_removes_offset() {
        let mut dc = DcBlocker::new();
        let mut y = 1.0;
        for _ in 0..48_000 {
            y = dc.process(1.0);
        }
        assert!(y.abs() < 0.01);
    }

    #[test]
    fn test_dc_blocker_passes_audio() {
        let mut dc = DcBlocker::new();
        let mut energy = 0.0;
        for i in 0..4800 {
            let x = (i as f32 * 0.13).sin();
            energy += dc.process(x).abs();
        }
        assert!(energy / 4800.0 > 0.3);
    }

    #[test]
    fn test_compressor_reduces_loud_signal() {
        let mut comp = Compressor::new(48_000.0);
        comp.set_threshold(-20.0);

        let mut out = 0.0;
        for _ in 0..48_000 {
            out = comp.process(1.0);
        }
        // 20 dB over at 4:1 leaves 5 dB over: 15 dB of reduction
        let expected = db_to_amp(-15.0);
        assert!((out - expected).abs() < 0.01, "got {out}, expected {expected}");
    }

    #[test]
    fn test_compressor_passes_quiet_signal() {
        let mut comp = Compressor::new(48_000.0);
        comp.set_threshold(-20.0);

        let mut out = 0.0;
        for _ in 0..48_000 {
            out = comp.process(0.05); // -26 dB, below threshold
        }
        assert!((out - 0.05).abs() < 0.001);
    }

    #[test]
    fn test_compressor_attack_faster_than_release() {
        let mut comp = Compressor::new(48_000.0);
        comp.set_threshold(-20.0);

        // Hit it hard, then drop to quiet: gain recovers on the slower
        // release coefficient
        for _ in 0..4800 {
            comp.process(1.0);
        }
        let compressed_gain = comp.gain;
        for _ in 0..480 {
            comp.process(0.01);
        }
        assert!(comp.gain > compressed_gain);
        assert!(comp.gain < 1.0, "release is not instantaneous");
    }
}
