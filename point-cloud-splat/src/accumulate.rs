//! Weighted-blended order-independent transparency accumulation.
//!
//! Every fragment adds a weighted premultiplied colour to its sample and
//! multiplies the sample's transmittance ("reveal") by `1 - alpha`. Both
//! combines are commutative and associative, so the result does not depend on
//! the order fragments arrive in.

use bevy::math::Vec4;
use constants::oit::{
    DEPTH_EPSILON, DEPTH_SCALE, REVEAL_CLEAR, WEIGHT_MAX, WEIGHT_MIN, WEIGHT_NUMERATOR,
};
use constants::render_settings::SUPPORTED_SAMPLE_COUNTS;

use crate::error::{SplatError, SplatResult};

/// Depth term of the weight. `z` is the positive view depth; the inverse
/// fourth power lets near fragments dominate the average.
pub fn depth_factor(z: f32) -> f32 {
    let scaled = z / DEPTH_SCALE;
    (WEIGHT_NUMERATOR / (DEPTH_EPSILON + scaled.powi(4))).clamp(WEIGHT_MIN, WEIGHT_MAX)
}

/// Weight of a straight-alpha fragment at view depth `z`. Zero whenever alpha is zero.
///
/// `z` is the linear distance from the camera along its forward axis in world
/// units, never the nonlinear device depth.
pub fn oit_weight(color: Vec4, z: f32) -> f32 {
    let intensity = color.x.max(color.y).max(color.z);
    let base_weight = (intensity * color.w).min(1.0).max(color.w);
    base_weight * depth_factor(z)
}

/// Both accumulation channels of one (pixel, sub-sample).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccumulationSample {
    /// `sum((rgb * a, a) * w)`.
    pub color_accum: Vec4,
    /// `prod(1 - a)`, starts at 1.
    pub reveal: f32,
}

impl Default for AccumulationSample {
    fn default() -> Self {
        Self {
            color_accum: Vec4::ZERO,
            reveal: REVEAL_CLEAR,
        }
    }
}

impl AccumulationSample {
    pub fn accumulate(&mut self, color: Vec4, z: f32) {
        let alpha = color.w.clamp(0.0, 1.0);
        let weight = oit_weight(color, z);
        self.color_accum += (color.truncate() * alpha).extend(alpha) * weight;
        self.reveal *= 1.0 - alpha;
    }

    /// Merges two partial accumulations of the same sample.
    pub fn combine(self, other: Self) -> Self {
        Self {
            color_accum: self.color_accum + other.color_accum,
            reveal: self.reveal * other.reveal,
        }
    }

    pub fn is_untouched(&self) -> bool {
        self.color_accum == Vec4::ZERO && self.reveal == REVEAL_CLEAR
    }
}

/// Per-frame multisampled accumulation storage.
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulationTarget {
    width: u32,
    height: u32,
    sample_count: u32,
    samples: Vec<AccumulationSample>,
}

impl AccumulationTarget {
    pub fn new(width: u32, height: u32, sample_count: u32) -> SplatResult<Self> {
        if !SUPPORTED_SAMPLE_COUNTS.contains(&sample_count) {
            return Err(SplatError::Config(format!(
                "unsupported sample count {sample_count}, expected one of {SUPPORTED_SAMPLE_COUNTS:?}"
            )));
        }
        if width == 0 || height == 0 {
            return Err(SplatError::Config(format!(
                "accumulation target must not be empty ({width}x{height})"
            )));
        }

        let len = width as usize * height as usize * sample_count as usize;
        Ok(Self {
            width,
            height,
            sample_count,
            samples: vec![AccumulationSample::default(); len],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Resets every sample before a new accumulation pass.
    pub fn clear(&mut self) {
        self.samples.fill(AccumulationSample::default());
    }

    fn index(&self, x: u32, y: u32, sample: u32) -> usize {
        ((y as usize * self.width as usize) + x as usize) * self.sample_count as usize
            + sample as usize
    }

    pub fn sample(&self, x: u32, y: u32, sample: u32) -> &AccumulationSample {
        &self.samples[self.index(x, y, sample)]
    }

    pub fn sample_mut(&mut self, x: u32, y: u32, sample: u32) -> &mut AccumulationSample {
        let index = self.index(x, y, sample);
        &mut self.samples[index]
    }

    pub fn samples(&self) -> &[AccumulationSample] {
        &self.samples
    }

    /// Length of one row in samples.
    pub fn row_stride(&self) -> usize {
        self.width as usize * self.sample_count as usize
    }

    pub fn samples_mut(&mut self) -> &mut [AccumulationSample] {
        &mut self.samples
    }
}
