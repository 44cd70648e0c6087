//! Main-world point cloud components.
//!
//! A point cloud is an entity carrying [`PointCloud`] plus a material handle
//! component. Its `Transform` is the instance transform; the points stay in
//! local space and are uploaded to the GPU only when they change.

use std::sync::Arc;

use bevy::prelude::*;
use bevy::render::sync_world::SyncToRenderWorld;
use bevy::render::view::{self, VisibilityClass};

/// Packed points: xyz local position, w world size. Shared behind an `Arc` so
/// extraction can hand the data to the render world without copying.
#[derive(Component, Clone, Debug, Default)]
#[require(Transform, Visibility, VisibilityClass, SyncToRenderWorld)]
#[component(on_add = view::add_visibility_class::<PointCloud>)]
pub struct PointCloud {
    pub points: Arc<Vec<Vec4>>,
}

impl PointCloud {
    pub fn new(points: Vec<Vec4>) -> Self {
        Self {
            points: Arc::new(points),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Copy-on-write access; the render world may still hold the old `Arc`.
    pub fn points_mut(&mut self) -> &mut Vec<Vec4> {
        Arc::make_mut(&mut self.points)
    }
}

/// Marks the cloud the scanner writes into; cleared with R.
#[derive(Component, Default)]
pub struct ScannedPointCloud;

/// Rotates an entity about its local Y axis.
#[derive(Component, Clone, Copy, Debug)]
pub struct Spin {
    pub radians_per_second: f32,
}

pub fn spin_point_clouds(time: Res<Time>, mut spinning: Query<(&Spin, &mut Transform)>) {
    for (spin, mut transform) in &mut spinning {
        transform.rotate_local_y(spin.radians_per_second * time.delta_secs());
    }
}
