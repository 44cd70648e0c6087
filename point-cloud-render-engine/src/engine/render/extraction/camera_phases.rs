use std::collections::HashSet;

use bevy::prelude::*;
use bevy::render::Extract;
use bevy::render::render_phase::ViewSortedRenderPhases;
use bevy::render::view::RetainedViewEntity;

use crate::engine::render::transparency::phase::OitPhase;

pub fn extract_camera_phases(
    mut oit_phases: ResMut<ViewSortedRenderPhases<OitPhase>>,
    cameras: Extract<Query<(Entity, &Camera), With<Camera3d>>>,
    mut live_entities: Local<HashSet<RetainedViewEntity>>,
) {
    live_entities.clear();
    for (main_entity, camera) in &cameras {
        if !camera.is_active {
            continue;
        }

        let retained_view_entity = RetainedViewEntity::new(main_entity.into(), None, 0);
        oit_phases.insert_or_clear(retained_view_entity);
        live_entities.insert(retained_view_entity);
    }
    oit_phases.retain(|camera_entity, _| live_entities.contains(camera_entity));
}
