use std::f32::consts::PI;

pub const DEFAULT_DISTANCE_MIN: f32 = 0.0;
pub const DEFAULT_DISTANCE_MAX: f32 = 100.0;

/// Hue is expressed in radians around the colour wheel.
pub const DEFAULT_HUE_MIN: f32 = 0.0;
pub const DEFAULT_HUE_MAX: f32 = PI * 1.1;

/// Fixed output alpha of the distance-hue material.
pub const DISTANCE_HUE_ALPHA: f32 = 0.5;

/// Placeholder colour of the uniform material (opaque white, straight alpha).
pub const UNIFORM_PLACEHOLDER_COLOUR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
