//! DSP core for the Halcyon stereo effect voice
//!
//! Real-time building blocks for a looper/ambience voice:
//! - Looper: long-form stereo loop recording with crossfaded overdubs and
//!   variable-speed, variable-direction Hermite playback
//! - Ambience: a modulated diffusion network with reverse texturing,
//!   self-ducking, DC blocking and compression
//! - Primitives: parameter ramps, fractional delay lines, a deterministic
//!   dither source and the stateless shaping helpers in [`shape`]
//!
//! Everything allocates at construction and runs allocation-free per block;
//! one `process` call per fixed-size block, single-threaded, with parameter
//! changes staged and committed only at block boundaries.

mod ambience;
mod config;
mod delay_line;
mod looper;
mod noise;
mod osc;
mod ramp;
pub mod shape;

pub use ambience::{
    Ambience, AmbienceControls, Compressor, Damp, DcBlocker, Diffuse, EnvFollower, ReversedBuffer,
    AMBIENCE_BUFFER_SIZE, AMBIENCE_DIFFUSERS,
};
pub use config::{ConfigError, EngineFormat};
pub use delay_line::DelayLine;
pub use looper::{
    LooperBuffer, PlaybackDirection, WriteHead, LOOPER_CHANNEL_LEN, LOOPER_FADE_SAMPLES,
    LOOPER_NOISE_LEVEL, LOOPER_TOTAL_LEN,
};
pub use noise::DitherNoise;
pub use osc::SineLfo;
pub use ramp::ParamRamp;
