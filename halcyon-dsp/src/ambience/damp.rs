//! Feedback-path damping filters

use crate::shape::map;

/// One-pole damping pair for the diffusion feedback path.
///
/// [`set_hi`](Damp::set_hi) closes a lowpass over the signal (high-frequency
/// damping); [`set_lo`](Damp::set_lo) tunes a tracking filter whose
/// subtraction removes low content. The main chain runs the lowpass path
/// only (standard reverb damping); [`process_band`](Damp::process_band)
/// keeps the full band-limited variant available.
pub struct Damp {
    lp_coeff: f32,
    hp_coeff: f32,
    lp_state: f32,
    hp_state: f32,
}

impl Damp {
    pub fn new() -> Self {
        Self {
            lp_coeff: 0.0,
            hp_coeff: 0.0,
            lp_state: 0.0,
            hp_state: 0.0,
        }
    }

    /// High-frequency damping in dB: -40 (heavy, filter nearly closed) up to
    /// -0.5 (minimal, filter nearly open).
    pub fn set_hi(&mut self, db: f32) {
        let norm = map(db, -40.0, -0.5, 0.05, 0.9);
        self.lp_coeff = norm.clamp(0.001, 0.999);
    }

    /// Low-frequency damping in dB, same range. Heavy damping makes the
    /// tracking filter follow the lowpass closely, so the subtraction in
    /// [`process_band`](Damp::process_band) removes the lows.
    pub fn set_lo(&mut self, db: f32) {
        let norm = map(db, -40.0, -0.5, 0.9, 0.05);
        self.hp_coeff = norm.clamp(0.001, 0.999);
    }

    /// High-damping path: one-pole lowpass only.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.lp_state += self.lp_coeff * (input - self.lp_state);
        self.lp_state
    }

    /// Full band-limiting: lowpass, minus a tracking filter of the lowpassed
    /// signal to also damp the lows.
    #[inline]
    pub fn process_band(&mut self, input: f32) -> f32 {
        let lp = self.process(input);
        self.hp_state += self.hp_coeff * (lp - self.hp_state);
        lp - self.hp_state
    }
}

impl Default for Damp {
    fn default() -> Self {
        Self::new()
    }
}
