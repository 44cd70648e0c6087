//! Turns accumulated samples into final colours.
//!
//! Runs once per (pixel, sub-sample) after every transparent draw of the frame
//! has landed. The result is straight alpha and is blended over whatever the
//! opaque passes left in the target.

use bevy::math::Vec4;
use constants::oit::{ACCUMULATION_MAX, RESOLVE_EPSILON};
use rayon::prelude::*;

use crate::accumulate::{AccumulationSample, AccumulationTarget};

/// `rgb = accum.rgb / max(accum.a, eps)`, `a = 1 - reveal`.
///
/// The colour sum is clamped to the half-float range first: a pile of near,
/// heavily weighted fragments can overflow it, and `inf / inf` must not reach
/// the view target.
pub fn resolve_sample(sample: &AccumulationSample) -> Vec4 {
    let accum = sample
        .color_accum
        .max(Vec4::ZERO)
        .min(Vec4::splat(ACCUMULATION_MAX));
    let weight_sum = accum.w.max(RESOLVE_EPSILON);
    let rgb = accum.truncate() / weight_sum;
    let alpha = (1.0 - sample.reveal).clamp(0.0, 1.0);
    rgb.extend(alpha)
}

/// Source-over with straight alpha: `src.rgb * a + dst.rgb * (1 - a)`.
pub fn composite_over(background: Vec4, resolved: Vec4) -> Vec4 {
    let alpha = resolved.w;
    let rgb = resolved.truncate() * alpha + background.truncate() * (1.0 - alpha);
    rgb.extend(alpha + background.w * (1.0 - alpha))
}

/// Resolved colour of every sample of a target.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFrame {
    width: u32,
    height: u32,
    sample_count: u32,
    samples: Vec<Vec4>,
}

impl ResolvedFrame {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn sample(&self, x: u32, y: u32, sample: u32) -> Vec4 {
        let index = ((y as usize * self.width as usize) + x as usize)
            * self.sample_count as usize
            + sample as usize;
        self.samples[index]
    }

    /// Final pixel colour: every sample is blended over `background`, then the
    /// samples are averaged the way a multisample resolve does.
    pub fn pixel_over(&self, x: u32, y: u32, background: Vec4) -> Vec4 {
        let sum: Vec4 = (0..self.sample_count)
            .map(|s| composite_over(background, self.sample(x, y, s)))
            .sum();
        sum / self.sample_count as f32
    }

    /// Pixel over transparent black.
    pub fn pixel(&self, x: u32, y: u32) -> Vec4 {
        self.pixel_over(x, y, Vec4::ZERO)
    }

    /// Row-major image of `pixel_over` for every pixel.
    pub fn to_image(&self, background: Vec4) -> Vec<Vec4> {
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .map(|(x, y)| self.pixel_over(x, y, background))
            .collect()
    }
}

pub fn resolve_target(target: &AccumulationTarget) -> ResolvedFrame {
    ResolvedFrame {
        width: target.width(),
        height: target.height(),
        sample_count: target.sample_count(),
        samples: target.samples().par_iter().map(resolve_sample).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn untouched_sample_is_transparent() {
        let resolved = resolve_sample(&AccumulationSample::default());
        assert_eq!(resolved, Vec4::ZERO);
    }

    #[test]
    fn single_opaque_fragment_round_trips_at_any_depth() {
        let color = Vec4::new(0.2, 0.6, 0.9, 1.0);
        for z in [0.0, 1.0, 50.0, 400.0, 10_000.0] {
            let mut sample = AccumulationSample::default();
            sample.accumulate(color, z);
            let resolved = resolve_sample(&sample);
            assert_abs_diff_eq!(resolved.distance(color), 0.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn two_half_transparent_layers_reveal_a_quarter() {
        let mut sample = AccumulationSample::default();
        sample.accumulate(Vec4::new(1.0, 0.0, 0.0, 0.5), 5.0);
        sample.accumulate(Vec4::new(1.0, 0.0, 0.0, 0.5), 5.0);
        let resolved = resolve_sample(&sample);
        assert_abs_diff_eq!(resolved.w, 0.75, epsilon = 1e-6);
        assert_abs_diff_eq!(resolved.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn nearer_fragment_dominates_colour() {
        let mut sample = AccumulationSample::default();
        sample.accumulate(Vec4::new(1.0, 0.0, 0.0, 0.5), 10.0);
        sample.accumulate(Vec4::new(0.0, 0.0, 1.0, 0.5), 300.0);
        let resolved = resolve_sample(&sample);
        assert!(resolved.x > resolved.z);
    }

    #[test]
    fn composite_over_respects_alpha() {
        let background = Vec4::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(composite_over(background, Vec4::ZERO), background);
        assert_eq!(composite_over(background, Vec4::new(1.0, 0.0, 0.0, 1.0)), Vec4::new(1.0, 0.0, 0.0, 1.0));
        let half = composite_over(background, Vec4::new(1.0, 0.0, 0.0, 0.5));
        assert_abs_diff_eq!(half.distance(Vec4::new(0.5, 0.0, 0.5, 1.0)), 0.0, epsilon = 1e-6);
    }

    /// Rounds up to infinity the way a half-float blend target saturates.
    fn saturate_to_half(v: Vec4) -> Vec4 {
        Vec4::from_array(v.to_array().map(|c| if c > ACCUMULATION_MAX { f32::INFINITY } else { c }))
    }

    #[test]
    fn overflowing_half_float_sum_resolves_finite() {
        let color = Vec4::new(1.0, 0.2, 0.2, 0.5);
        let mut sample = AccumulationSample::default();
        for _ in 0..200 {
            sample.accumulate(color, 3.0);
            sample.color_accum = saturate_to_half(sample.color_accum);
        }
        assert!(sample.color_accum.w.is_infinite());

        let resolved = resolve_sample(&sample);
        assert!(resolved.is_finite());
        assert!(resolved.cmpge(Vec4::ZERO).all() && resolved.cmple(Vec4::ONE).all());
        assert_abs_diff_eq!(resolved.x, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(resolved.w, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn infinite_sum_resolves_finite() {
        let sample = AccumulationSample {
            color_accum: Vec4::splat(f32::INFINITY),
            reveal: 0.0,
        };
        assert_eq!(resolve_sample(&sample), Vec4::ONE);
    }

    #[test]
    fn pixel_averages_samples() {
        let mut target = AccumulationTarget::new(1, 1, 2).unwrap();
        target.sample_mut(0, 0, 0).accumulate(Vec4::ONE, 1.0);
        let frame = resolve_target(&target);
        assert_eq!(frame.sample(0, 0, 1), Vec4::ZERO);
        assert_abs_diff_eq!(frame.pixel(0, 0).distance(Vec4::splat(0.5)), 0.0, epsilon = 1e-4);
        assert_eq!(frame.to_image(Vec4::ZERO).len(), 1);
    }
}
