use bevy::prelude::*;
use bevy::render::render_resource::AsBindGroup;
use constants::material::UNIFORM_PLACEHOLDER_COLOUR;

use super::PointCloudMaterial;

/// Every splat gets the same colour. Opaque white unless configured.
#[derive(Asset, TypePath, AsBindGroup, Clone, Debug)]
pub struct UniformMaterial {
    #[uniform(0)]
    pub color: LinearRgba,
}

impl Default for UniformMaterial {
    fn default() -> Self {
        let [red, green, blue, alpha] = UNIFORM_PLACEHOLDER_COLOUR;
        Self {
            color: LinearRgba::new(red, green, blue, alpha),
        }
    }
}

impl From<[f32; 4]> for UniformMaterial {
    fn from(color: [f32; 4]) -> Self {
        Self {
            color: LinearRgba::from_f32_array(color),
        }
    }
}

impl PointCloudMaterial for UniformMaterial {}
