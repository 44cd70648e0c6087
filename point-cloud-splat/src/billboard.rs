//! Camera-facing quad expansion.
//!
//! Every point is drawn as six vertices (two triangles sharing a diagonal).
//! `vertex_index / 6` selects the point and `vertex_index % 6` the corner, so
//! no vertex buffer is needed; the vertex stage reads points by index.

use bevy::math::{Vec2, Vec3, Vec4};
use constants::render_settings::VERTICES_PER_POINT;

use crate::camera::SplatView;
use crate::point::{Point, PointCloudInstance};

/// Corner coordinates of triangles `(0, 1, 2)` and `(3, 4, 5)`. Both wind
/// counter-clockwise in uv space and meet along the `(1,0)-(0,1)` diagonal.
pub const CORNER_UVS: [Vec2; 6] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(0.0, 1.0),
    Vec2::new(0.0, 1.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(1.0, 1.0),
];

pub fn corner_uv(corner_index: u32) -> Vec2 {
    CORNER_UVS[(corner_index % VERTICES_PER_POINT) as usize]
}

/// Output of the vertex stage. Never stored; consumed by rasterisation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillboardVertex {
    pub clip_position: Vec4,
    pub uv: Vec2,
    pub world_position: Vec3,
    /// Points from the splat centre towards the camera; identical for all corners.
    pub world_normal: Vec3,
    pub world_size: f32,
}

/// Expands vertex `vertex_index` of an instance. Indices must already have been
/// validated against the point count.
pub fn generate_vertex(
    view: &SplatView,
    instance: &PointCloudInstance,
    points: &[Vec4],
    vertex_index: u32,
) -> BillboardVertex {
    let point_index = (vertex_index / VERTICES_PER_POINT) as usize;
    let corner_index = vertex_index % VERTICES_PER_POINT;
    expand_corner(
        view,
        instance,
        Point::from_packed(points[point_index]),
        corner_index,
    )
}

/// All six vertices of one point, in draw order.
pub fn generate_quad(
    view: &SplatView,
    instance: &PointCloudInstance,
    point: Point,
) -> [BillboardVertex; 6] {
    std::array::from_fn(|corner| expand_corner(view, instance, point, corner as u32))
}

fn expand_corner(
    view: &SplatView,
    instance: &PointCloudInstance,
    point: Point,
    corner_index: u32,
) -> BillboardVertex {
    let uv = corner_uv(corner_index);
    let transform = &instance.world_from_local;
    let point_world = transform.transform_point3(point.local_position);

    // Instance scale along its local X/Y stretches the splat; the direction is
    // discarded so rotation cannot tilt the quad away from the image plane.
    let instance_scale = Vec2::new(
        transform.transform_vector3(Vec3::X).length(),
        transform.transform_vector3(Vec3::Y).length(),
    );
    let offset = (uv - Vec2::splat(0.5)) * instance_scale * point.world_size;

    let world_position = point_world + view.right * offset.x + view.up * offset.y;
    let world_normal = (view.world_position - point_world).normalize_or(-view.forward);

    BillboardVertex {
        clip_position: view.world_to_clip(world_position),
        uv,
        world_position,
        world_normal,
        world_size: point.world_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use bevy::math::{Affine3A, Quat};
    use std::collections::HashSet;

    fn front_view() -> SplatView {
        SplatView::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, 1.0, 1.0)
    }

    fn signed_area(a: Vec2, b: Vec2, c: Vec2) -> f32 {
        (b - a).perp_dot(c - a) * 0.5
    }

    #[test]
    fn corners_cover_unit_square() {
        let distinct: HashSet<(u32, u32)> = (0..6)
            .map(|i| {
                let uv = corner_uv(i);
                (uv.x as u32, uv.y as u32)
            })
            .collect();
        assert_eq!(distinct.len(), 4);
        for corner in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            assert!(distinct.contains(&corner));
        }
    }

    #[test]
    fn triangles_share_winding_and_tile_square() {
        let first = signed_area(CORNER_UVS[0], CORNER_UVS[1], CORNER_UVS[2]);
        let second = signed_area(CORNER_UVS[3], CORNER_UVS[4], CORNER_UVS[5]);
        assert!(first > 0.0);
        assert!(second > 0.0);
        assert_abs_diff_eq!(first + second, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn vertex_index_selects_point_and_corner() {
        let view = front_view();
        let instance = PointCloudInstance::default();
        let points = [Vec4::new(0.0, 0.0, 0.0, 1.0), Vec4::new(2.0, 0.0, 0.0, 1.0)];

        let vertex = generate_vertex(&view, &instance, &points, 7);
        assert_eq!(vertex.uv, CORNER_UVS[1]);
        assert_abs_diff_eq!(vertex.world_position.x, 2.5, epsilon = 1e-5);
        assert_abs_diff_eq!(vertex.world_position.y, -0.5, epsilon = 1e-5);
    }

    #[test]
    fn quad_is_centred_and_coplanar() {
        let view = SplatView::looking_at(Vec3::new(3.0, 2.0, 4.0), Vec3::ZERO, Vec3::Y, 1.0, 1.0);
        let instance = PointCloudInstance::new(Affine3A::from_translation(Vec3::new(1.0, 0.0, -1.0)));
        let quad = generate_quad(&view, &instance, Point::new(Vec3::new(0.5, 0.5, 0.5), 0.4));

        let centre = Vec3::new(1.5, 0.5, -0.5);
        let mean = quad.iter().map(|v| v.world_position).sum::<Vec3>() / 6.0;
        assert_abs_diff_eq!(mean.distance(centre), 0.0, epsilon = 1e-5);

        let plane_normal = view.right.cross(view.up);
        for vertex in &quad {
            assert_abs_diff_eq!((vertex.world_position - centre).dot(plane_normal), 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn doubling_size_doubles_offset() {
        let view = front_view();
        let instance = PointCloudInstance::default();
        let small = generate_quad(&view, &instance, Point::new(Vec3::ZERO, 0.5));
        let large = generate_quad(&view, &instance, Point::new(Vec3::ZERO, 1.0));
        for (s, l) in small.iter().zip(large.iter()) {
            assert_abs_diff_eq!(l.world_position.length(), 2.0 * s.world_position.length(), epsilon = 1e-5);
        }
    }

    #[test]
    fn instance_rotation_does_not_turn_quad() {
        let view = SplatView::looking_at(Vec3::new(-2.0, 1.0, 6.0), Vec3::ZERO, Vec3::Y, 1.0, 1.0);
        let point = Point::new(Vec3::ZERO, 1.0);
        let plain = generate_quad(&view, &PointCloudInstance::default(), point);
        let rotated = generate_quad(
            &view,
            &PointCloudInstance::new(Affine3A::from_quat(Quat::from_euler(
                bevy::math::EulerRot::XYZ,
                0.4,
                1.3,
                -0.8,
            ))),
            point,
        );
        for (a, b) in plain.iter().zip(rotated.iter()) {
            assert_abs_diff_eq!(a.world_position.distance(b.world_position), 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn non_uniform_scale_stretches_splat() {
        let view = front_view();
        let instance = PointCloudInstance::new(Affine3A::from_scale(Vec3::new(2.0, 1.0, 1.0)));
        let quad = generate_quad(&view, &instance, Point::new(Vec3::ZERO, 1.0));
        // Corner (1,1) sits at +offset on both axes.
        assert_abs_diff_eq!(quad[5].world_position.x, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(quad[5].world_position.y, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn normal_faces_camera_for_every_corner() {
        let view = front_view();
        let quad = generate_quad(&view, &PointCloudInstance::default(), Point::new(Vec3::ZERO, 1.0));
        for vertex in &quad {
            assert_abs_diff_eq!(vertex.world_normal.distance(Vec3::Z), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn zero_size_collapses_quad() {
        let view = front_view();
        let quad = generate_quad(&view, &PointCloudInstance::default(), Point::new(Vec3::ONE, 0.0));
        for vertex in &quad {
            assert_eq!(vertex.world_position, Vec3::ONE);
        }
    }
}
