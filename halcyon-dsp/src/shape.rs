//! Shaping and mapping utilities
//!
//! Stateless helpers shared across the DSP core: range mapping, clipping,
//! crossfades, musical unit conversions and modulation combination. These are
//! the vocabulary the rest of the crate is written in.

/// CV inputs below this magnitude are lifted to the floor value.
const CV_MIN_THRESHOLD: f32 = 0.007;

/// Linear range map. Output ranges may be inverted (`b_max < b_min`).
#[inline]
pub fn map(value: f32, a_min: f32, a_max: f32, b_min: f32, b_max: f32) -> f32 {
    let k = (b_max - b_min).abs() / (a_max - a_min).abs() * if b_max > b_min { 1.0 } else { -1.0 };
    b_min + k * (value - a_min)
}

/// Squared-curve range map, for perceptually even control feel.
#[inline]
pub fn map_expo(value: f32, a_min: f32, a_max: f32, b_min: f32, b_max: f32) -> f32 {
    let v = (value - a_min) / (a_max - a_min);
    b_min + v * v * (b_max - b_min)
}

/// Maps a 0..1 knob with a detent at 0.55 onto -1..1.
///
/// The physical center of the pot sits slightly above half travel, so the
/// detent is not at 0.5.
#[inline]
pub fn center_map(value: f32) -> f32 {
    if value < 0.55 {
        map(value, 0.0, 0.55, -1.0, 0.0)
    } else {
        map(value, 0.55, 0.99, 0.0, 1.0)
    }
}

/// Cubic soft limiter: linear near zero, saturating toward ±1 at |x| = 3.
#[inline]
pub fn soft_limit(x: f32) -> f32 {
    x * (27.0 + x * x) / (27.0 + 9.0 * x * x)
}

/// Soft clip: hard ±1 beyond |x| >= 3, [`soft_limit`] inside.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    if x <= -3.0 {
        -1.0
    } else if x >= 3.0 {
        1.0
    } else {
        soft_limit(x)
    }
}

/// Clamp to ±limit.
#[inline]
pub fn hard_clip(x: f32, limit: f32) -> f32 {
    x.clamp(-limit, limit)
}

/// Plain linear blend between `a` (pos = 0) and `b` (pos = 1).
#[inline]
pub fn linear_crossfade(a: f32, b: f32, pos: f32) -> f32 {
    a * (1.0 - pos) + b * pos
}

/// Cheap constant-power blend.
///
/// Quadratic weights that meet at 0.75 instead of a linear fade's 0.5, so
/// perceived loudness stays level across the blend. Exact at the endpoints:
/// pos 0 returns `a`, pos 1 returns `b`.
#[inline]
pub fn equal_power_crossfade(a: f32, b: f32, pos: f32) -> f32 {
    equal_power_crossfade_boost(a, b, pos, 1.0)
}

/// Constant-power blend with a midpoint lift.
///
/// `boost` > 1 raises both weights away from the endpoints; used for wet/dry
/// volume fades where the wet path needs a push to stay perceptually level.
/// `boost` = 1 is the plain [`equal_power_crossfade`] curve.
#[inline]
pub fn equal_power_crossfade_boost(a: f32, b: f32, pos: f32, boost: f32) -> f32 {
    let wa = (1.0 - pos) * (1.0 + boost * pos);
    let wb = pos * (1.0 + boost * (1.0 - pos));
    a * wa + b * wb
}

/// MIDI note number to frequency, 69 = A4 = 440 Hz.
#[inline]
pub fn midi_to_hz(note: f32) -> f32 {
    2.0f32.powf((note - 69.0) / 12.0) * 440.0
}

/// Period of `freq` in samples; 0 Hz maps to 0 samples.
#[inline]
pub fn hz_to_samples(freq: f32, sample_rate: f32) -> f32 {
    if freq == 0.0 {
        0.0
    } else {
        sample_rate / freq
    }
}

/// MIDI note number to period length in samples.
///
/// Lets delay times be tuned in musical intervals: one semitone up shortens
/// the delay by the same ratio it raises the pitch.
#[inline]
pub fn midi_to_samples(note: f32, sample_rate: f32) -> f32 {
    hz_to_samples(midi_to_hz(note), sample_rate)
}

/// Decibels to linear amplitude.
#[inline]
pub fn db_to_amp(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// Combine a base control value with modulation and CV contributions.
///
/// With attenuverter semantics enabled, the amount knob is re-centered via
/// [`center_map`] so its lower half inverts the source, with a ±0.1 dead zone
/// around the detent. CV values inside the noise floor are lifted to
/// [`CV_MIN_THRESHOLD`] so a patched-but-idle input still registers. The
/// result is clamped to [min, max].
#[allow(clippy::too_many_arguments)]
pub fn modulate(
    base: f32,
    mod_amount: f32,
    mod_value: f32,
    cv_amount: f32,
    cv_value: f32,
    min: f32,
    max: f32,
    mod_attenuverters: bool,
    cv_attenuverters: bool,
) -> f32 {
    let mut mod_amount = mod_amount;
    let mut cv_amount = cv_amount;
    let mut cv_value = cv_value;

    if mod_attenuverters {
        mod_amount = center_map(mod_amount);
        if (-0.1..=0.1).contains(&mod_amount) {
            mod_amount = 0.0;
        }
    }
    if cv_attenuverters {
        cv_amount = center_map(cv_amount);
        if (-0.1..=0.1).contains(&cv_amount) {
            cv_amount = 0.0;
        }
    }
    if (-CV_MIN_THRESHOLD..=CV_MIN_THRESHOLD).contains(&cv_value) {
        cv_value = CV_MIN_THRESHOLD;
    }

    (base + mod_amount * mod_value + cv_amount * cv_value).clamp(min, max)
}
