use bevy::prelude::*;
use bevy::render::render_asset::RenderAssets;
use bevy::render::render_resource::{AsBindGroup, AsBindGroupShaderType, ShaderRef, ShaderType};
use bevy::render::texture::GpuImage;
use constants::path::POINT_CLOUD_DISTANCE_SHADER_PATH;
use point_cloud_splat::DistanceHueParams;

use super::PointCloudMaterial;

/// Hue follows the smoothed distance from the camera, modulated by an
/// optional base-colour texture sampled at the splat uv. Alpha is fixed at 0.5.
///
/// Without a texture the fallback image (white) is bound, so the hue shows
/// unmodified.
#[derive(Asset, TypePath, AsBindGroup, Clone, Debug, Default)]
#[uniform(0, DistanceHueUniform)]
pub struct DistanceHueMaterial {
    pub params: DistanceHueParams,
    #[texture(1)]
    #[sampler(2)]
    pub base_color: Option<Handle<Image>>,
}

impl From<DistanceHueParams> for DistanceHueMaterial {
    fn from(params: DistanceHueParams) -> Self {
        Self {
            params,
            base_color: None,
        }
    }
}

/// `DistanceHueMaterial` in `point_cloud_distance.wgsl`.
#[derive(Clone, Copy, Default, ShaderType)]
pub struct DistanceHueUniform {
    pub distance_min: f32,
    pub distance_max: f32,
    pub hue_min: f32,
    pub hue_max: f32,
}

impl AsBindGroupShaderType<DistanceHueUniform> for DistanceHueMaterial {
    fn as_bind_group_shader_type(&self, _images: &RenderAssets<GpuImage>) -> DistanceHueUniform {
        DistanceHueUniform {
            distance_min: self.params.distance_min,
            distance_max: self.params.distance_max,
            hue_min: self.params.hue_min,
            hue_max: self.params.hue_max,
        }
    }
}

impl PointCloudMaterial for DistanceHueMaterial {
    fn fragment_shader() -> ShaderRef {
        POINT_CLOUD_DISTANCE_SHADER_PATH.into()
    }
}
