//! Host-side checks run before a draw is issued.
//!
//! The GPU stages assume every index is in range and every value finite; these
//! functions are where that assumption is enforced.

use bevy::math::{Affine3A, Vec4};
use constants::render_settings::VERTICES_PER_POINT;

use crate::error::{SplatError, SplatResult};
use crate::point::PointCloudInstance;

/// Rejects points with non-finite components or a negative size. Zero-sized
/// points are allowed; they rasterise to nothing.
pub fn validate_points(instance: usize, points: &[Vec4]) -> SplatResult<()> {
    for (point, packed) in points.iter().enumerate() {
        if !packed.is_finite() {
            return Err(SplatError::NonFinitePoint { instance, point });
        }
        if packed.w < 0.0 {
            return Err(SplatError::NegativeSize {
                instance,
                point,
                size: packed.w,
            });
        }
    }
    Ok(())
}

pub fn validate_instance(index: usize, instance: &PointCloudInstance) -> SplatResult<()> {
    if !affine_is_finite(&instance.world_from_local)
        || !affine_is_finite(&instance.previous_world_from_local)
    {
        return Err(SplatError::NonFiniteTransform { instance: index });
    }
    Ok(())
}

fn affine_is_finite(affine: &Affine3A) -> bool {
    affine.matrix3.is_finite() && affine.translation.is_finite()
}

/// Number of vertices to draw for `point_count` points. Fails when the count
/// does not fit the 32-bit vertex index.
pub fn vertex_count(point_count: usize) -> SplatResult<u32> {
    u32::try_from(point_count)
        .ok()
        .and_then(|count| count.checked_mul(VERTICES_PER_POINT))
        .ok_or(SplatError::PointCountOverflow {
            points: point_count,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::Vec3;

    #[test]
    fn accepts_zero_size_points() {
        let points = [Vec4::new(0.0, 1.0, 2.0, 0.0), Vec4::new(1.0, 1.0, 1.0, 0.5)];
        assert_eq!(validate_points(0, &points), Ok(()));
        assert_eq!(validate_points(0, &[]), Ok(()));
    }

    #[test]
    fn reports_first_bad_point() {
        let points = [
            Vec4::new(0.0, 0.0, 0.0, 1.0),
            Vec4::new(f32::NAN, 0.0, 0.0, 1.0),
            Vec4::new(0.0, 0.0, 0.0, -1.0),
        ];
        assert_eq!(
            validate_points(3, &points),
            Err(SplatError::NonFinitePoint {
                instance: 3,
                point: 1
            })
        );
        assert_eq!(
            validate_points(3, &points[2..]),
            Err(SplatError::NegativeSize {
                instance: 3,
                point: 0,
                size: -1.0
            })
        );
    }

    #[test]
    fn rejects_infinite_transform() {
        let instance = PointCloudInstance::new(Affine3A::from_translation(Vec3::new(
            f32::INFINITY,
            0.0,
            0.0,
        )));
        assert_eq!(
            validate_instance(2, &instance),
            Err(SplatError::NonFiniteTransform { instance: 2 })
        );
        assert!(validate_instance(0, &PointCloudInstance::default()).is_ok());
    }

    #[test]
    fn vertex_count_is_six_per_point() {
        assert_eq!(vertex_count(0), Ok(0));
        assert_eq!(vertex_count(5), Ok(30));
        assert!(vertex_count(u32::MAX as usize / 6 + 1).is_err());
    }
}
