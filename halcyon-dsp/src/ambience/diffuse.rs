//! Diffusion network
//!
//! A chain of modulated delay lines smears the input into a dense decaying
//! tail; the last line feeds a decay-scaled tap back out for cross-channel
//! injection. Delay-time changes are staged and committed only at block
//! boundaries so interpolated reads never see a half-updated set.

use crate::delay_line::DelayLine;
use crate::shape::{db_to_amp, hard_clip, midi_to_samples};

/// Number of delay lines in the chain.
pub const AMBIENCE_DIFFUSERS: usize = 8;

/// Capacity of each diffusion delay line, and of the reverse buffers.
/// Covers the longest staged delay time with headroom.
pub const AMBIENCE_BUFFER_SIZE: usize = 1 << 16;

/// Modulated diffusion/feedback chain.
pub struct Diffuse {
    lines: [DelayLine; AMBIENCE_DIFFUSERS],
    delay_times: [f32; AMBIENCE_DIFFUSERS],
    new_delay_times: [f32; AMBIENCE_DIFFUSERS],
    outs: [f32; AMBIENCE_DIFFUSERS],
    sample_rate: f32,
    time: f32,
    rt: f32,
    df: f32,
    fb_out: f32,
    needs_update: bool,
}

impl Diffuse {
    pub fn new(sample_rate: f32) -> Self {
        let mut diffuse = Self {
            lines: std::array::from_fn(|_| DelayLine::new(AMBIENCE_BUFFER_SIZE)),
            delay_times: [0.0; AMBIENCE_DIFFUSERS],
            new_delay_times: [0.0; AMBIENCE_DIFFUSERS],
            outs: [0.0; AMBIENCE_DIFFUSERS],
            sample_rate,
            time: 0.0,
            rt: 0.0,
            df: 0.0,
            fb_out: 0.0,
            needs_update: false,
        };
        diffuse.set_size(1.0);
        diffuse.update_delay_times();
        diffuse.set_rt(0.0);
        diffuse
    }

    /// Stage new delay times as a musical progression of `size` (in MIDI
    /// note units): each stage sits two semitones above the previous, and
    /// the last stage is offset downward to decorrelate it from the chain.
    /// Staged times take effect at the next [`update_delay_times`].
    ///
    /// [`update_delay_times`]: Diffuse::update_delay_times
    pub fn set_size(&mut self, size: f32) {
        for i in 0..AMBIENCE_DIFFUSERS - 1 {
            self.new_delay_times[i] = midi_to_samples(size + 2.0 * (i + 1) as f32, self.sample_rate);
        }
        self.new_delay_times[AMBIENCE_DIFFUSERS - 1] =
            midi_to_samples(size - 7.0, self.sample_rate);
        self.set_rt(self.time);
        self.needs_update = true;
    }

    /// Derive the feedback gain from the ratio of the last stage's committed
    /// delay to the target decay time (also in MIDI note units), through a
    /// -60 dB reference. Capped at unity: the network must not diverge.
    pub fn set_rt(&mut self, time: f32) {
        self.time = time;
        let target = midi_to_samples(time, self.sample_rate);
        self.rt = db_to_amp(self.delay_times[AMBIENCE_DIFFUSERS - 1] / target * -60.0);
        if self.rt >= 1.0 {
            self.rt = 1.0;
        }
    }

    /// Diffusion coefficient: how much each stage folds back into itself.
    pub fn set_df(&mut self, df: f32) {
        self.df = df;
    }

    /// Feedback tap for cross-channel injection.
    #[inline]
    pub fn fb_out(&self) -> f32 {
        self.fb_out
    }

    /// Commit staged delay times. Called once per block, at the boundary,
    /// never mid-block.
    pub fn update_delay_times(&mut self) {
        if !self.needs_update {
            return;
        }
        self.delay_times = self.new_delay_times;
        self.needs_update = false;
    }

    /// Push one sample through the chain.
    ///
    /// `x` ramps 0..1 across the block, gliding each read tap from its
    /// committed toward its staged delay time. Every junction is hard-clipped
    /// so the feedback structure stays bounded by construction.
    pub fn process(&mut self, input: f32, x: f32) -> f32 {
        let mut out = input;

        for i in 0..AMBIENCE_DIFFUSERS - 1 {
            let prev = hard_clip(out - self.outs[i] * self.df, 1.0);
            self.lines[i].write(prev);
            out = hard_clip(prev * self.df + self.outs[i], 1.0);
            self.outs[i] = self.lines[i].read_morph(self.delay_times[i], self.new_delay_times[i], x);
        }

        let last = AMBIENCE_DIFFUSERS - 1;
        self.fb_out = self.outs[last] * self.rt;
        self.lines[last].write(out);
        self.outs[last] =
            self.lines[last].read_morph(self.delay_times[last], self.new_delay_times[last], x);

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_gain_never_exceeds_unity() {
        let mut diffuse = Diffuse::new(48_000.0);
        // Degenerate combinations: very short and very long targets against
        // small and large sizes
        for size in [-30.0, 0.0, 15.0, 29.9] {
            diffuse.set_size(size);
            diffuse.update_delay_times();
            for time in [-160.0, -60.0, -1.0, 0.0, 30.0, 120.0] {
                diffuse.set_rt(time);
                assert!(
                    diffuse.rt <= 1.0,
                    "rt {} for size {} time {}",
                    diffuse.rt,
                    size,
                    time
                );
            }
        }
    }

    #[test]
    fn test_longer_target_means_more_feedback() {
        let mut diffuse = Diffuse::new(48_000.0);
        diffuse.set_size(0.0);
        diffuse.update_delay_times();

        diffuse.set_rt(0.0);
        let short = diffuse.rt;
        diffuse.set_rt(-120.0);
        let long = diffuse.rt;
        assert!(long > short);
    }

    #[test]
    fn test_staged_times_commit_only_on_update() {
        let mut diffuse = Diffuse::new(48_000.0);
        let committed = diffuse.delay_times;

        diffuse.set_size(20.0);
        assert_eq!(diffuse.delay_times, committed, "staged, not applied");
        assert_ne!(diffuse.new_delay_times, committed);

        diffuse.update_delay_times();
        assert_eq!(diffuse.delay_times, diffuse.new_delay_times);
    }

    #[test]
    fn test_stage_progression_is_musical() {
        let mut diffuse = Diffuse::new(48_000.0);
        diffuse.set_size(10.0);
        diffuse.update_delay_times();

        // Two semitones per stage: each delay is shorter by 2^(1/6)
        let ratio = 2.0f32.powf(2.0 / 12.0);
        for i in 0..AMBIENCE_DIFFUSERS - 2 {
            let measured = diffuse.delay_times[i] / diffuse.delay_times[i + 1];
            assert!((measured - ratio).abs() < 0.001);
        }
        // The decorrelation stage sits below the first stage, not above the
        // chain
        let last = diffuse.delay_times[AMBIENCE_DIFFUSERS - 1];
        assert!(last > diffuse.delay_times[0]);
    }

    #[test]
    fn test_impulse_produces_tail() {
        let mut diffuse = Diffuse::new(48_000.0);
        diffuse.set_size(10.0);
        diffuse.set_df(0.6);
        diffuse.update_delay_times();
        diffuse.set_rt(-60.0);

        diffuse.process(1.0, 0.0);
        let mut energy = 0.0;
        for _ in 0..20_000 {
            energy += diffuse.process(0.0, 0.0).abs();
        }
        assert!(energy > 0.0, "impulse must smear into a tail");
    }

    #[test]
    fn test_output_bounded_under_sustained_input() {
        let mut diffuse = Diffuse::new(48_000.0);
        diffuse.set_size(5.0);
        diffuse.set_df(0.75);
        diffuse.update_delay_times();
        diffuse.set_rt(-160.0);

        for i in 0..50_000 {
            let out = diffuse.process(if i % 2 == 0 { 3.0 } else { -3.0 }, 0.0);
            assert!(out.is_finite());
            assert!(out.abs() <= 1.0, "junction clips bound the output");
        }
    }

    #[test]
    fn test_fb_out_scaled_by_decay_gain() {
        let mut diffuse = Diffuse::new(48_000.0);
        diffuse.set_size(10.0);
        diffuse.set_df(0.6);
        diffuse.update_delay_times();

        // Zero feedback gain forces a silent tap regardless of content
        diffuse.set_rt(f32::NEG_INFINITY);
        // rt of -inf db maps to 0 without poisoning the output
        diffuse.process(1.0, 0.0);
        assert_eq!(diffuse.fb_out(), 0.0);
    }
}
