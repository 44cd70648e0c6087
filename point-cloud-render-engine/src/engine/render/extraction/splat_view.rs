use bevy::prelude::*;
use bevy::render::Extract;
use bevy::render::sync_world::RenderEntity;
use point_cloud_splat::SplatView;

/// Camera context of one view, built from camera state only.
#[derive(Component, Clone, Copy, Debug, Deref)]
pub struct ExtractedSplatView(pub SplatView);

pub fn extract_splat_views(
    mut commands: Commands,
    cameras: Extract<Query<(&RenderEntity, &Camera, &GlobalTransform), With<Camera3d>>>,
) {
    for (render_entity, camera, transform) in &cameras {
        if !camera.is_active {
            continue;
        }

        let view = SplatView::new(transform.affine(), camera.clip_from_view());
        commands
            .entity(render_entity.id())
            .insert(ExtractedSplatView(view));
    }
}
