//! Per-fragment colour policies.
//!
//! One draw is bound to exactly one material, so the policy is picked when the
//! draw is set up (a generic parameter here, a specialised pipeline on the GPU)
//! rather than branched on per fragment.

use std::f32::consts::TAU;

use bevy::math::{Vec2, Vec3, Vec4};
use constants::material::{
    DEFAULT_DISTANCE_MAX, DEFAULT_DISTANCE_MIN, DEFAULT_HUE_MAX, DEFAULT_HUE_MIN,
    DISTANCE_HUE_ALPHA, UNIFORM_PLACEHOLDER_COLOUR,
};
use serde::{Deserialize, Serialize};

use crate::camera::SplatView;
use crate::error::{SplatError, SplatResult};

/// Interpolated inputs of one covered sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplatFragment {
    pub world_position: Vec3,
    pub uv: Vec2,
    pub view_depth: f32,
}

/// Pure colour function of the declared fragment inputs. Returns straight
/// (non-premultiplied) RGBA.
pub trait MaterialColor: Sync {
    fn color(&self, view: &SplatView, fragment: &SplatFragment) -> Vec4;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformColor {
    pub color: Vec4,
}

impl Default for UniformColor {
    fn default() -> Self {
        Self {
            color: Vec4::from_array(UNIFORM_PLACEHOLDER_COLOUR),
        }
    }
}

impl MaterialColor for UniformColor {
    fn color(&self, _view: &SplatView, _fragment: &SplatFragment) -> Vec4 {
        self.color
    }
}

/// Cubic Hermite step, clamped to [0, 1]. Reversed edges mirror the curve and
/// equal edges degrade to a hard step at the edge.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge0 == edge1 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// HSV to linear RGB with hue in radians (wraps every full turn).
pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> Vec3 {
    let h = (hue / TAU).rem_euclid(1.0);
    let k = Vec3::new(h, h + 2.0 / 3.0, h + 1.0 / 3.0);
    let rgb = ((k.fract() * 6.0 - Vec3::splat(3.0)).abs() - Vec3::ONE).clamp(Vec3::ZERO, Vec3::ONE);
    value * Vec3::ONE.lerp(rgb, saturation)
}

/// Parameters of the distance-to-hue gradient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceHueParams {
    pub distance_min: f32,
    pub distance_max: f32,
    pub hue_min: f32,
    pub hue_max: f32,
}

impl Default for DistanceHueParams {
    fn default() -> Self {
        Self {
            distance_min: DEFAULT_DISTANCE_MIN,
            distance_max: DEFAULT_DISTANCE_MAX,
            hue_min: DEFAULT_HUE_MIN,
            hue_max: DEFAULT_HUE_MAX,
        }
    }
}

impl DistanceHueParams {
    pub fn hue_at(&self, distance: f32) -> f32 {
        let frac = smoothstep(self.distance_min, self.distance_max, distance);
        self.hue_min + (self.hue_max - self.hue_min) * frac
    }

    /// Reversed bounds are allowed; only non-finite values are rejected.
    pub fn validate(&self) -> SplatResult<()> {
        let all_finite = [self.distance_min, self.distance_max, self.hue_min, self.hue_max]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(SplatError::InvalidDistanceBounds {
                min: self.distance_min,
                max: self.distance_max,
            });
        }
        Ok(())
    }

    pub fn as_array(&self) -> [f32; 4] {
        [self.distance_min, self.distance_max, self.hue_min, self.hue_max]
    }
}

/// Source of the base-colour texture sample.
pub trait BaseColorTexture: Sync {
    fn sample(&self, uv: Vec2) -> Vec4;
}

/// Constant texture; white stands in when no texture is bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidTexture(pub Vec4);

impl Default for SolidTexture {
    fn default() -> Self {
        SolidTexture(Vec4::ONE)
    }
}

impl BaseColorTexture for SolidTexture {
    fn sample(&self, _uv: Vec2) -> Vec4 {
        self.0
    }
}

/// Linear RGBA texels, sampled nearest with clamp-to-edge addressing.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbaTexture {
    pub width: u32,
    pub height: u32,
    pub texels: Vec<Vec4>,
}

impl RgbaTexture {
    pub fn new(width: u32, height: u32, texels: Vec<Vec4>) -> SplatResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .filter(|&count| count > 0)
            .ok_or_else(|| SplatError::Config(format!("invalid texture size {width}x{height}")))?;
        if texels.len() != expected {
            return Err(SplatError::Config(format!(
                "texture of {width}x{height} needs {expected} texels, got {}",
                texels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            texels,
        })
    }
}

impl BaseColorTexture for RgbaTexture {
    fn sample(&self, uv: Vec2) -> Vec4 {
        let x = ((uv.x * self.width as f32).floor() as i64).clamp(0, self.width as i64 - 1);
        let y = ((uv.y * self.height as f32).floor() as i64).clamp(0, self.height as i64 - 1);
        self.texels[y as usize * self.width as usize + x as usize]
    }
}

/// Colours fragments by their distance to the camera, tinted by a base texture.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceHue<B = SolidTexture> {
    pub params: DistanceHueParams,
    pub base_color: B,
}

impl DistanceHue<SolidTexture> {
    pub fn new(params: DistanceHueParams) -> Self {
        Self {
            params,
            base_color: SolidTexture::default(),
        }
    }
}

impl<B: BaseColorTexture> DistanceHue<B> {
    pub fn with_texture(params: DistanceHueParams, base_color: B) -> Self {
        Self { params, base_color }
    }
}

impl<B: BaseColorTexture> MaterialColor for DistanceHue<B> {
    fn color(&self, view: &SplatView, fragment: &SplatFragment) -> Vec4 {
        let distance = fragment.world_position.distance(view.world_position);
        let hue = self.params.hue_at(distance);
        let base = self.base_color.sample(fragment.uv);
        (hsv_to_rgb(hue, 1.0, 1.0) * base.truncate()).extend(DISTANCE_HUE_ALPHA)
    }
}

/// Material selection as written in scene configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SplatMaterialConfig {
    Uniform {
        #[serde(default = "default_uniform_colour")]
        color: [f32; 4],
    },
    DistanceHue(DistanceHueParams),
}

fn default_uniform_colour() -> [f32; 4] {
    UNIFORM_PLACEHOLDER_COLOUR
}

impl Default for SplatMaterialConfig {
    fn default() -> Self {
        SplatMaterialConfig::Uniform {
            color: UNIFORM_PLACEHOLDER_COLOUR,
        }
    }
}

impl SplatMaterialConfig {
    pub fn validate(&self) -> SplatResult<()> {
        match self {
            SplatMaterialConfig::Uniform { color } => {
                if color.iter().all(|c| c.is_finite()) {
                    Ok(())
                } else {
                    Err(SplatError::Config(format!("non-finite uniform colour {color:?}")))
                }
            }
            SplatMaterialConfig::DistanceHue(params) => params.validate(),
        }
    }
}
