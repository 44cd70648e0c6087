use bevy::prelude::*;
use bevy::render::camera::ExtractedCamera;
use bevy::render::render_resource::{
    Extent3d, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages,
};
use bevy::render::renderer::RenderDevice;
use bevy::render::texture::{ColorAttachment, TextureCache};
use bevy::render::view::ExtractedView;

use crate::engine::render::pipeline::point_cloud_render_pipeline::{
    COLOUR_ACCUMULATION_FORMAT, REVEAL_ACCUMULATION_FORMAT,
};

/// Per-view accumulation targets, recreated each frame through the texture
/// cache so they follow window resizes and MSAA changes.
#[derive(Component)]
pub struct OitAccumulationTextures {
    /// Cleared to zero.
    pub colour: ColorAttachment,
    /// Cleared to one (nothing in front yet).
    pub reveal: ColorAttachment,
}

pub fn prepare_oit_textures(
    mut commands: Commands,
    mut texture_cache: ResMut<TextureCache>,
    render_device: Res<RenderDevice>,
    views: Query<(Entity, &ExtractedCamera, &Msaa), With<ExtractedView>>,
) {
    for (entity, camera, msaa) in &views {
        let Some(physical_target_size) = camera.physical_target_size else {
            continue;
        };

        let size = Extent3d {
            width: physical_target_size.x,
            height: physical_target_size.y,
            depth_or_array_layers: 1,
        };

        let mut accumulation_texture = |label: &'static str, format: TextureFormat| {
            texture_cache.get(
                &render_device,
                TextureDescriptor {
                    label: Some(label),
                    size,
                    mip_level_count: 1,
                    sample_count: msaa.samples(),
                    dimension: TextureDimension::D2,
                    format,
                    usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING,
                    view_formats: &[],
                },
            )
        };

        let colour = accumulation_texture("oit_colour_accumulation", COLOUR_ACCUMULATION_FORMAT);
        let reveal = accumulation_texture("oit_reveal_accumulation", REVEAL_ACCUMULATION_FORMAT);

        commands.entity(entity).insert(OitAccumulationTextures {
            colour: ColorAttachment::new(colour, None, Some(LinearRgba::NONE)),
            reveal: ColorAttachment::new(reveal, None, Some(LinearRgba::WHITE)),
        });
    }
}
