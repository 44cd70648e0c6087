/// Numerator of the depth weight term `0.03 / (eps + (z / scale)^4)`.
pub const WEIGHT_NUMERATOR: f32 = 0.03;

/// View depth at which the depth weight term falls to roughly `WEIGHT_NUMERATOR`.
pub const DEPTH_SCALE: f32 = 200.0;

/// Keeps the depth weight finite at `z = 0`.
pub const DEPTH_EPSILON: f32 = 1e-5;

/// Lower clamp of the depth weight term.
pub const WEIGHT_MIN: f32 = 1e-2;

/// Upper clamp of the depth weight term.
pub const WEIGHT_MAX: f32 = 3e3;

/// Guards the resolve division when no fragment touched a sample.
pub const RESOLVE_EPSILON: f32 = 1e-5;

/// Clear value of the reveal (transmittance) channel.
pub const REVEAL_CLEAR: f32 = 1.0;

/// Largest finite value of the half-float colour accumulation target. Sums
/// past it saturate to infinity on the GPU, so the resolve clamps to it.
pub const ACCUMULATION_MAX: f32 = 65504.0;
