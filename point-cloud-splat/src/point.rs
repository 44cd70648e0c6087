//! Point cloud data as supplied by the host.
//!
//! Points travel packed as `Vec4` (xyz = local position, w = world size) in a
//! flat, index-addressable sequence per instance. Nothing in this crate
//! mutates them.

use bevy::math::{Affine3A, Vec3, Vec4};
use bytemuck::{Pod, Zeroable};

/// A single splat centre and its diameter in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub local_position: Vec3,
    pub world_size: f32,
}

impl Point {
    pub fn new(local_position: Vec3, world_size: f32) -> Self {
        Self {
            local_position,
            world_size,
        }
    }

    pub fn from_packed(packed: Vec4) -> Self {
        Self {
            local_position: packed.truncate(),
            world_size: packed.w,
        }
    }

    pub fn packed(&self) -> Vec4 {
        self.local_position.extend(self.world_size)
    }
}

impl From<Vec4> for Point {
    fn from(packed: Vec4) -> Self {
        Point::from_packed(packed)
    }
}

/// Per-instance transform state, immutable for the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointCloudInstance {
    pub world_from_local: Affine3A,
    /// Last frame's transform. Uploaded alongside the current one but not read
    /// by any shader yet; reserved for motion vectors.
    pub previous_world_from_local: Affine3A,
}

impl PointCloudInstance {
    pub fn new(world_from_local: Affine3A) -> Self {
        Self {
            world_from_local,
            previous_world_from_local: world_from_local,
        }
    }

    pub fn with_previous(mut self, previous_world_from_local: Affine3A) -> Self {
        self.previous_world_from_local = previous_world_from_local;
        self
    }

    /// Transposed 3x4 rows, the layout the accumulation shader expects.
    pub fn uniform_rows(&self) -> [Vec4; 3] {
        affine_rows(&self.world_from_local)
    }

    pub fn previous_uniform_rows(&self) -> [Vec4; 3] {
        affine_rows(&self.previous_world_from_local)
    }

    pub fn uniform(&self) -> PointCloudUniform {
        PointCloudUniform {
            world_from_local: self.uniform_rows().map(|row| row.to_array()),
            previous_world_from_local: self.previous_uniform_rows().map(|row| row.to_array()),
        }
    }
}

/// GPU layout of one instance (`PointCloudUniform` in `point_cloud_types.wgsl`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointCloudUniform {
    pub world_from_local: [[f32; 4]; 3],
    pub previous_world_from_local: [[f32; 4]; 3],
}

impl Default for PointCloudInstance {
    fn default() -> Self {
        Self::new(Affine3A::IDENTITY)
    }
}

fn affine_rows(affine: &Affine3A) -> [Vec4; 3] {
    let m = affine.matrix3;
    let t = affine.translation;
    [
        Vec4::new(m.x_axis.x, m.y_axis.x, m.z_axis.x, t.x),
        Vec4::new(m.x_axis.y, m.y_axis.y, m.z_axis.y, t.y),
        Vec4::new(m.x_axis.z, m.y_axis.z, m.z_axis.z, t.z),
    ]
}

/// Read-only access to the instance transforms and point sequences of a frame.
pub trait PointCloudStore {
    fn instance_count(&self) -> usize;

    fn instance(&self, index: usize) -> &PointCloudInstance;

    fn points(&self, index: usize) -> &[Vec4];
}

/// In-memory store holding one frame's worth of instances.
#[derive(Debug, Clone, Default)]
pub struct PointCloudFrame {
    instances: Vec<(PointCloudInstance, Vec<Vec4>)>,
}

impl PointCloudFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, instance: PointCloudInstance, points: Vec<Vec4>) -> usize {
        self.instances.push((instance, points));
        self.instances.len() - 1
    }

    pub fn with_instance(mut self, instance: PointCloudInstance, points: Vec<Vec4>) -> Self {
        self.push(instance, points);
        self
    }

    pub fn total_points(&self) -> usize {
        self.instances.iter().map(|(_, points)| points.len()).sum()
    }
}

impl PointCloudStore for PointCloudFrame {
    fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn instance(&self, index: usize) -> &PointCloudInstance {
        &self.instances[index].0
    }

    fn points(&self, index: usize) -> &[Vec4] {
        &self.instances[index].1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::Quat;

    #[test]
    fn packed_point_keeps_size_in_w() {
        let point = Point::new(Vec3::new(1.0, 2.0, 3.0), 0.25);
        assert_eq!(point.packed(), Vec4::new(1.0, 2.0, 3.0, 0.25));
        assert_eq!(Point::from(point.packed()), point);
    }

    #[test]
    fn uniform_rows_reproduce_transform() {
        let affine = Affine3A::from_scale_rotation_translation(
            Vec3::new(2.0, 1.0, 0.5),
            Quat::from_rotation_y(0.7),
            Vec3::new(-3.0, 4.0, 1.5),
        );
        let rows = PointCloudInstance::new(affine).uniform_rows();
        let p = Vec3::new(0.3, -1.2, 2.0);
        let expected = affine.transform_point3(p);
        let p4 = p.extend(1.0);
        let rebuilt = Vec3::new(rows[0].dot(p4), rows[1].dot(p4), rows[2].dot(p4));
        assert!((rebuilt - expected).length() < 1e-5);
    }

    #[test]
    fn previous_transform_defaults_to_current() {
        let affine = Affine3A::from_translation(Vec3::X);
        let instance = PointCloudInstance::new(affine);
        assert_eq!(instance.previous_world_from_local, affine);

        let moved = instance.with_previous(Affine3A::IDENTITY);
        assert_eq!(moved.previous_uniform_rows()[0], Vec4::new(1.0, 0.0, 0.0, 0.0));
        assert_eq!(moved.uniform().world_from_local[0], [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(std::mem::size_of::<PointCloudUniform>(), 96);
    }

    #[test]
    fn uniform_packs_current_and_previous_rows() {
        let current = Affine3A::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::from_rotation_x(0.4),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let instance = PointCloudInstance::new(current).with_previous(Affine3A::IDENTITY);
        let uniform = instance.uniform();
        for (packed, row) in uniform.world_from_local.iter().zip(instance.uniform_rows()) {
            assert_eq!(*packed, row.to_array());
        }
        for (packed, row) in uniform
            .previous_world_from_local
            .iter()
            .zip(instance.previous_uniform_rows())
        {
            assert_eq!(*packed, row.to_array());
        }
    }

    #[test]
    fn frame_counts_points_across_instances() {
        let frame = PointCloudFrame::new()
            .with_instance(PointCloudInstance::default(), vec![Vec4::W; 3])
            .with_instance(PointCloudInstance::default(), vec![Vec4::W; 2]);
        assert_eq!(frame.instance_count(), 2);
        assert_eq!(frame.total_points(), 5);
        assert_eq!(frame.points(1).len(), 2);
    }
}
