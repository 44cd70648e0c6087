//! Per-frame camera context shared by every geometry and shading stage.
//!
//! Built once per frame from camera state only and threaded explicitly into
//! the billboard, material and accumulation stages.

use bevy::math::{Affine3A, Mat4, Vec3, Vec4};
use bytemuck::{Pod, Zeroable};

/// Camera right and up vectors in world space, taken from the camera's local
/// X and Y axes. Instance transforms never enter this.
pub fn billboard_basis(world_from_view: &Affine3A) -> (Vec3, Vec3) {
    let right = Vec3::from(world_from_view.matrix3.x_axis).normalize_or(Vec3::X);
    let up = Vec3::from(world_from_view.matrix3.y_axis).normalize_or(Vec3::Y);
    (right, up)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplatView {
    pub world_position: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    /// Direction the camera looks along (its local -Z).
    pub forward: Vec3,
    pub clip_from_world: Mat4,
}

impl SplatView {
    pub fn new(world_from_view: Affine3A, clip_from_view: Mat4) -> Self {
        let (right, up) = billboard_basis(&world_from_view);
        let forward = -Vec3::from(world_from_view.matrix3.z_axis).normalize_or(Vec3::Z);
        let view_from_world = Mat4::from(world_from_view.inverse());

        Self {
            world_position: world_from_view.translation.into(),
            right,
            up,
            forward,
            clip_from_world: clip_from_view * view_from_world,
        }
    }

    /// Reversed-Z infinite perspective, the projection Bevy's 3D cameras use.
    pub fn perspective(world_from_view: Affine3A, fov_y: f32, aspect: f32, near: f32) -> Self {
        Self::new(
            world_from_view,
            Mat4::perspective_infinite_reverse_rh(fov_y, aspect, near),
        )
    }

    /// Camera placed at `eye` looking at `target`.
    pub fn looking_at(eye: Vec3, target: Vec3, up: Vec3, fov_y: f32, aspect: f32) -> Self {
        let world_from_view = Affine3A::look_at_rh(eye, target, up).inverse();
        Self::perspective(world_from_view, fov_y, aspect, 0.1)
    }

    pub fn world_to_clip(&self, world_position: Vec3) -> Vec4 {
        self.clip_from_world * world_position.extend(1.0)
    }

    /// Positive distance along the view axis; the `z` the accumulation weight uses.
    pub fn view_depth(&self, world_position: Vec3) -> f32 {
        (world_position - self.world_position).dot(self.forward)
    }

    pub fn uniform(&self) -> SplatViewUniform {
        SplatViewUniform {
            clip_from_world: self.clip_from_world.to_cols_array_2d(),
            camera_position: self.world_position.extend(1.0).to_array(),
            right: self.right.extend(0.0).to_array(),
            up: self.up.extend(0.0).to_array(),
            forward: self.forward.extend(0.0).to_array(),
        }
    }
}

/// GPU layout of the camera context (`SplatView` in `point_cloud_types.wgsl`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SplatViewUniform {
    pub clip_from_world: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub right: [f32; 4],
    pub up: [f32; 4],
    pub forward: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use bevy::math::Quat;

    #[test]
    fn basis_follows_camera_axes() {
        let rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let world_from_view = Affine3A::from_rotation_translation(rotation, Vec3::ZERO);
        let (right, up) = billboard_basis(&world_from_view);
        assert_abs_diff_eq!(right.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(right.z, -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(up.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn basis_ignores_camera_scale() {
        let world_from_view =
            Affine3A::from_scale_rotation_translation(Vec3::splat(3.0), Quat::IDENTITY, Vec3::ONE);
        let (right, up) = billboard_basis(&world_from_view);
        assert_abs_diff_eq!(right.length(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(up.length(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn view_depth_grows_away_from_camera() {
        let view = SplatView::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, 1.0, 1.0);
        assert_abs_diff_eq!(view.view_depth(Vec3::ZERO), 5.0, epsilon = 1e-5);
        assert_abs_diff_eq!(view.view_depth(Vec3::new(3.0, 2.0, -5.0)), 10.0, epsilon = 1e-5);
        assert_abs_diff_eq!(view.forward.z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn reversed_depth_puts_near_plane_at_one() {
        let view = SplatView::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, 1.0, 1.0);
        let near = view.world_to_clip(Vec3::new(0.0, 0.0, 4.9));
        let far = view.world_to_clip(Vec3::new(0.0, 0.0, -100.0));
        assert_abs_diff_eq!(near.z / near.w, 1.0, epsilon = 1e-4);
        assert!(far.z / far.w < near.z / near.w);
    }

    #[test]
    fn target_projects_to_screen_centre() {
        let view = SplatView::looking_at(Vec3::new(4.0, 3.0, -2.0), Vec3::ONE, Vec3::Y, 1.0, 1.5);
        let clip = view.world_to_clip(Vec3::ONE);
        assert!(clip.w > 0.0);
        assert_abs_diff_eq!(clip.x / clip.w, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(clip.y / clip.w, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn uniform_packs_position_and_axes() {
        let view = SplatView::looking_at(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y, 1.0, 1.0);
        let uniform = view.uniform();
        let position = Vec4::from_array(uniform.camera_position);
        assert_abs_diff_eq!(position.distance(Vec4::new(1.0, 2.0, 3.0, 1.0)), 0.0, epsilon = 1e-5);
        assert_eq!(uniform.right[3], 0.0);
        assert_eq!(std::mem::size_of::<SplatViewUniform>(), 128);
        assert_eq!(uniform.clip_from_world, view.clip_from_world.to_cols_array_2d());
    }
}
