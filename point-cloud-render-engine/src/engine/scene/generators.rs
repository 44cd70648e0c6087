use std::f32::consts::TAU;

use bevy::prelude::*;

use crate::engine::assets::scene_config::PointGenerator;

/// Packed points (xyz local position, w size) for a generator recipe.
/// Seeded generators are deterministic.
pub fn generate_points(generator: &PointGenerator, point_size: f32) -> Vec<Vec4> {
    match *generator {
        PointGenerator::Sphere {
            count,
            radius,
            seed,
        } => sphere_points(count, radius, seed, point_size),
        PointGenerator::Box {
            count,
            half_extents,
            seed,
        } => box_points(count, Vec3::from_array(half_extents), seed, point_size),
        PointGenerator::Grid {
            columns,
            rows,
            spacing,
        } => grid_points(columns, rows, spacing, point_size),
    }
}

fn sphere_points(count: usize, radius: f32, seed: u64, point_size: f32) -> Vec<Vec4> {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..count)
        .map(|_| {
            // Uniform z and azimuth give a uniform density over the surface.
            let z = rng.f32() * 2.0 - 1.0;
            let azimuth = rng.f32() * TAU;
            let ring = (1.0 - z * z).max(0.0).sqrt();
            let direction = Vec3::new(ring * azimuth.cos(), z, ring * azimuth.sin());
            (direction * radius).extend(point_size)
        })
        .collect()
}

fn box_points(count: usize, half_extents: Vec3, seed: u64, point_size: f32) -> Vec<Vec4> {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..count)
        .map(|_| {
            let unit = Vec3::new(rng.f32(), rng.f32(), rng.f32()) * 2.0 - Vec3::ONE;
            (unit * half_extents).extend(point_size)
        })
        .collect()
}

fn grid_points(columns: usize, rows: usize, spacing: f32, point_size: f32) -> Vec<Vec4> {
    let origin = Vec2::new(
        (columns.saturating_sub(1)) as f32,
        (rows.saturating_sub(1)) as f32,
    ) * spacing
        * -0.5;

    (0..rows)
        .flat_map(|row| (0..columns).map(move |column| (column, row)))
        .map(|(column, row)| {
            let xz = origin + Vec2::new(column as f32, row as f32) * spacing;
            Vec4::new(xz.x, 0.0, xz.y, point_size)
        })
        .collect()
}
