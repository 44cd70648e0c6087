use std::collections::HashSet;
use std::sync::Arc;

use bevy::prelude::*;
use bevy::render::Extract;
use bevy::render::render_resource::{BindGroup, Buffer};
use bevy::render::sync_world::{MainEntity, MainEntityHashMap};
use point_cloud_splat::{PointCloudInstance, validate_instance};

use crate::engine::point_cloud::PointCloud;

/// GPU side of one uploaded cloud. Rebuilt whenever the points change.
pub struct PointCloudGpuData {
    pub points: Buffer,
    pub uniform: Buffer,
    pub bind_group: BindGroup,
    pub vertex_count: u32,
}

pub struct RenderPointCloud {
    pub instance: PointCloudInstance,
    pub visible: bool,
    pub gpu: Option<PointCloudGpuData>,
}

/// Every extracted point cloud keyed by its main world entity.
#[derive(Resource, Default, Deref, DerefMut)]
pub struct RenderPointClouds(pub MainEntityHashMap<RenderPointCloud>);

/// Point data that changed this frame and still has to be uploaded.
#[derive(Resource, Default)]
pub struct PendingPointClouds(pub Vec<(MainEntity, Arc<Vec<Vec4>>)>);

pub fn extract_point_clouds(
    mut render_point_clouds: ResMut<RenderPointClouds>,
    mut pending: ResMut<PendingPointClouds>,
    point_clouds: Extract<
        Query<(
            Entity,
            &ViewVisibility,
            &GlobalTransform,
            Ref<PointCloud>,
        )>,
    >,
    mut live_entities: Local<HashSet<MainEntity>>,
) {
    live_entities.clear();
    pending.0.clear();

    for (entity, view_visibility, transform, point_cloud) in &point_clouds {
        let main_entity = MainEntity::from(entity);
        let world_from_local = transform.affine();

        let (instance, newly_seen) = match render_point_clouds.get(&main_entity) {
            Some(existing) => (
                PointCloudInstance::new(world_from_local)
                    .with_previous(existing.instance.world_from_local),
                false,
            ),
            None => (PointCloudInstance::new(world_from_local), true),
        };

        if let Err(err) = validate_instance(entity.index() as usize, &instance) {
            warn_once!("Skipping point cloud {:?}: {}", entity, err);
            continue;
        }

        live_entities.insert(main_entity);
        if newly_seen || point_cloud.is_changed() {
            pending.0.push((main_entity, point_cloud.points.clone()));
        }

        render_point_clouds
            .entry(main_entity)
            .and_modify(|cloud| {
                cloud.instance = instance;
                cloud.visible = view_visibility.get();
            })
            .or_insert(RenderPointCloud {
                instance,
                visible: view_visibility.get(),
                gpu: None,
            });
    }

    render_point_clouds.retain(|main_entity, _| live_entities.contains(main_entity));
}
