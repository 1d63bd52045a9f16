//! Ambience effect
//!
//! Two channels of damping, diffusion and reverse texturing folded into one
//! stereo feedback network, with ducking, DC blocking and compression
//! keeping the loop under control.
//!
//! Signal flow per channel:
//! ```text
//! in → reverse blend → (+ other channel's feedback tap) → damp → clip
//!    → duck → dc-block → diffuse → compress → equal-power dry/wet → out
//! ```
//!
//! The cross-channel feedback injection is what makes this one stereo-wide
//! network instead of two mono reverbs running side by side.

mod damp;
mod diffuse;
mod dynamics;
mod reverse;

pub use damp::Damp;
pub use diffuse::{Diffuse, AMBIENCE_BUFFER_SIZE, AMBIENCE_DIFFUSERS};
pub use dynamics::{Compressor, DcBlocker, EnvFollower};
pub use reverse::ReversedBuffer;

use crate::config::EngineFormat;
use crate::osc::SineLfo;
use crate::shape::{center_map, equal_power_crossfade_boost, hard_clip, map, map_expo};

/// Compressor threshold for the wet path, dBFS.
const COMP_THRESHOLD_DB: f32 = -20.0;

/// Post-compressor makeup gain.
const MAKEUP_GAIN: f32 = 2.0;

/// Damping ranges in dB, minimal to heavy.
const HIGH_DAMP_MIN: f32 = -0.5;
const HIGH_DAMP_MAX: f32 = -40.0;
const LOW_DAMP_MIN: f32 = -0.5;
const LOW_DAMP_MAX: f32 = -40.0;

/// Wet drive range on the forward (bright) side of space-time.
const GAIN_MIN: f32 = 0.25;
const GAIN_MAX: f32 = 1.0;

/// Wet drive range on the reverse (dark) side.
const REV_GAIN_MIN: f32 = 0.25;
const REV_GAIN_MAX: f32 = 1.25;

/// Auto-pan rate ceiling in Hz (middle C).
const PAN_MAX_HZ: f32 = 261.63;

/// Clock multipliers selectable by the auto-pan amount.
const CLOCK_RATIOS: [f32; 9] = [
    1.0 / 16.0,
    1.0 / 8.0,
    1.0 / 4.0,
    1.0 / 2.0,
    1.0,
    2.0,
    4.0,
    8.0,
    16.0,
];

/// Steps in the quantized decay map.
const DECAY_STEPS: f32 = 32.0;

/// Boost exponent for the dry/wet volume crossfade.
const VOLUME_BOOST: f32 = 1.4;

/// Quantize a 0..1 value onto `steps` indices.
#[inline]
fn quantize_index(value: f32, steps: usize) -> usize {
    ((value.clamp(0.0, 1.0) * steps as f32) as usize).min(steps - 1)
}

/// Quantized squared map of the decay knob onto 0..-160 MIDI units (a lower
/// target note means a longer target period, so a longer tail). Quantizing
/// keeps the staged decay value stable against knob jitter.
#[inline]
fn quantized_expo_decay(value: f32) -> f32 {
    let q = (value.clamp(0.0, 1.0) * (DECAY_STEPS - 1.0)).round() / (DECAY_STEPS - 1.0);
    -160.0 * q * q
}

/// Per-block snapshot of the control values the voice feeds this effect.
///
/// The surrounding control layer owns smoothing and modulation; this struct
/// is plain data, copied in once per block, so no component aliases another's
/// parameters.
#[derive(Debug, Clone, Copy)]
pub struct AmbienceControls {
    /// Decay amount, 0..1.
    pub decay: f32,
    /// Space-time knob, 0..1 with a center detent (see `shape::center_map`).
    pub space_time: f32,
    /// Auto-pan amount, 0..1.
    pub auto_pan: f32,
    /// Dry/wet volume, 0..1.
    pub volume: f32,
    /// Clock frequency in Hz driving the pan LFO.
    pub tempo_hz: f32,
    /// False while the surrounding patch is still starting up; the audio
    /// path stays closed until it flips.
    pub startup_done: bool,
}

impl Default for AmbienceControls {
    fn default() -> Self {
        Self {
            decay: 0.5,
            space_time: 0.55,
            auto_pan: 0.0,
            volume: 0.5,
            tempo_hz: 2.0,
            startup_done: true,
        }
    }
}

/// Stereo ambience effect.
pub struct Ambience {
    panner: SineLfo,
    damps: [Damp; 2],
    diffusers: [Diffuse; 2],
    reversers: [ReversedBuffer; 2],
    followers: [EnvFollower; 2],
    blockers: [DcBlocker; 2],
    compressors: [Compressor; 2],
    amp: f32,
    pan: f32,
    decay: f32,
    reverse: f32,
}

impl Ambience {
    /// Build the effect for the given engine format. Everything is allocated
    /// here; processing is allocation-free.
    pub fn new(format: EngineFormat) -> Self {
        let sr = format.sample_rate();
        let mut compressors = [Compressor::new(sr), Compressor::new(sr)];
        for comp in &mut compressors {
            comp.set_threshold(COMP_THRESHOLD_DB);
        }

        Self {
            panner: SineLfo::new(format.block_rate()),
            damps: [Damp::new(), Damp::new()],
            diffusers: [Diffuse::new(sr), Diffuse::new(sr)],
            reversers: [
                ReversedBuffer::new(AMBIENCE_BUFFER_SIZE),
                ReversedBuffer::new(AMBIENCE_BUFFER_SIZE),
            ],
            followers: [EnvFollower::new(sr), EnvFollower::new(sr)],
            blockers: [DcBlocker::new(), DcBlocker::new()],
            compressors,
            amp: 1.0,
            pan: 0.5,
            decay: 0.0,
            reverse: 0.0,
        }
    }

    fn set_high_damp(&mut self, db: f32) {
        for damp in &mut self.damps {
            damp.set_hi(db);
        }
    }

    fn set_low_damp(&mut self, db: f32) {
        for damp in &mut self.damps {
            damp.set_lo(db);
        }
    }

    fn set_decay(&mut self, value: f32) {
        self.decay = value;
        let time = quantized_expo_decay(value);
        for diffuser in &mut self.diffusers {
            diffuser.set_rt(time);
        }
    }

    /// Map the derived room size onto staged delay times and the diffusion
    /// coefficient.
    fn set_size(&mut self, size: f32) {
        let sz = -(size - 30.0);
        let df = size / 240.0 + 0.5;
        for diffuser in &mut self.diffusers {
            diffuser.set_size(sz);
            diffuser.set_df(df);
        }
    }

    /// Recompute the pan LFO frequency from the clock and advance it one
    /// block-rate tick.
    fn set_pan(&mut self, controls: &AmbienceControls) {
        let ratio = CLOCK_RATIOS[quantize_index(controls.auto_pan, CLOCK_RATIOS.len())];
        let f = (ratio * controls.tempo_hz).clamp(0.0, PAN_MAX_HZ);
        self.panner.set_frequency(f);
        self.pan = 0.5 + self.panner.next() * controls.auto_pan * 0.5;
    }

    /// The asymmetric space-time mapping.
    ///
    /// Negative side: long reverse-heavy dark decay, with the reverse
    /// texture fading in as the knob falls. Positive side: bright short
    /// decay. Both sides use squared maps for an even feel.
    fn set_space_time(&mut self, value: f32) {
        let st = center_map(value);

        let mut low_damp = LOW_DAMP_MIN;
        let mut high_damp = HIGH_DAMP_MIN;
        let size;

        if st < 0.0 {
            if st < -0.4 {
                high_damp = map(st, -1.0, -0.4, HIGH_DAMP_MAX, HIGH_DAMP_MIN);
            } else {
                low_damp = map(st, -0.4, 0.0, LOW_DAMP_MIN, LOW_DAMP_MAX);
            }
            size = 60.1 - map_expo(st, -1.0, 0.0, 0.1, 60.0);
            self.amp = REV_GAIN_MAX + REV_GAIN_MIN - map_expo(st, -1.0, 0.0, REV_GAIN_MIN, REV_GAIN_MAX);
        } else {
            if st < 0.4 {
                low_damp = map(st, 0.0, 0.4, LOW_DAMP_MAX, LOW_DAMP_MIN);
            } else {
                high_damp = map(st, 0.4, 1.0, HIGH_DAMP_MIN, HIGH_DAMP_MAX);
            }
            size = map_expo(st, 0.0, 1.0, 0.1, 60.0);
            self.amp = map_expo(st, 0.0, 1.0, GAIN_MIN, GAIN_MAX);
        }

        self.set_low_damp(low_damp);
        self.set_high_damp(high_damp);
        self.set_size(size);

        self.reverse = if st < -0.2 {
            1.0
        } else if st > 0.2 {
            0.0
        } else {
            map(st, -0.2, 0.2, 1.0, 0.0)
        };
    }

    /// Process one interleaved stereo block.
    ///
    /// `input` and `output` must hold the same number of complete frames.
    /// Control values are refreshed first, so staged parameters keep
    /// tracking even while the startup gate holds the audio path closed.
    pub fn process(&mut self, input: &[f32], output: &mut [f32], controls: &AmbienceControls) {
        debug_assert_eq!(input.len(), output.len());

        self.set_pan(controls);
        self.set_decay(controls.decay.clamp(0.0, 1.0));
        self.set_space_time(controls.space_time);

        if !controls.startup_done {
            return;
        }

        let frames = input.len() / 2;
        if frames == 0 {
            return;
        }
        let xi = 1.0 / frames as f32;
        let dry_reverse = 1.0 - self.reverse;
        let mut x = 0.0f32;

        for (frame_in, frame_out) in input.chunks_exact(2).zip(output.chunks_exact_mut(2)) {
            let l_in = frame_in[0].clamp(-3.0, 3.0);
            let r_in = frame_in[1].clamp(-3.0, 3.0);

            // Reverse-texture blend ahead of the feedback network
            let left = self.reversers[0].last_out() * self.reverse + l_in * dry_reverse;
            let right = self.reversers[1].last_out() * self.reverse + r_in * dry_reverse;
            self.reversers[0].process(l_in);
            self.reversers[1].process(r_in);

            // Cross-feed: each channel is damped together with the other
            // channel's feedback tap, widening the network
            let mut left_fb = self.damps[0].process(left + self.diffusers[1].fb_out());
            let mut right_fb = self.damps[1].process(right + self.diffusers[0].fb_out());

            left_fb = hard_clip(left * (1.0 - self.pan) + left_fb, 1.0);
            right_fb = hard_clip(right * self.pan + right_fb, 1.0);

            // Self-ducking against the wet signal's own loudness
            left_fb *= 1.0 - self.followers[0].process(left_fb);
            right_fb *= 1.0 - self.followers[1].process(right_fb);

            left_fb = self.blockers[0].process(left_fb);
            right_fb = self.blockers[1].process(right_fb);

            let mut wet_l = self.diffusers[0].process(left_fb, x);
            let mut wet_r = self.diffusers[1].process(right_fb, x);
            x += xi;

            // Short decays get extra drive into the compressor
            let drive = map(self.decay, 0.0, 1.0, self.amp * 1.3, self.amp);
            wet_l = self.compressors[0].process(wet_l * drive) * MAKEUP_GAIN;
            wet_r = self.compressors[1].process(wet_r * drive) * MAKEUP_GAIN;

            frame_out[0] = equal_power_crossfade_boost(l_in, wet_l, controls.volume, VOLUME_BOOST);
            frame_out[1] = equal_power_crossfade_boost(r_in, wet_r, controls.volume, VOLUME_BOOST);
        }

        // Commit staged delay times at the block boundary, never mid-block
        for diffuser in &mut self.diffusers {
            diffuser.update_delay_times();
        }
    }
}
