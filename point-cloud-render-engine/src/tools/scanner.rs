use std::f32::consts::{PI, TAU};

use bevy::color::palettes::css::SKY_BLUE;
use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use constants::render_settings::{SCANNED_POINT_SIZE, SCANNER_MAX_DISTANCE};

use crate::engine::point_cloud::{PointCloud, ScannedPointCloud};

/// Emission interval while boost is on.
const BOOST_INTERVAL: f32 = 1e-5;

/// Handheld emitter attached to the camera. Holding the left mouse button
/// casts random rays inside a cone and deposits a point wherever a ray
/// meets the ground plane.
#[derive(Component, Debug, Clone)]
pub struct Scanner {
    /// 0 = narrow and slow, 1 = wide and fast. Adjusted with the scroll wheel.
    pub size_setting: f32,
    /// Cone half-angle at `size_setting` 0 and 1, radians.
    pub angle_range: Vec2,
    /// Seconds between rays at `size_setting` 0 and 1.
    pub interval_range: Vec2,
    /// Time banked towards the next ray; negative while paused by a burst.
    pub progress: f32,
    /// Pause applied when the right mouse button triggers a burst.
    pub burst_duration: f32,
    pub active: bool,
    pub trigger_burst: bool,
    pub boosted: bool,
}

impl Default for Scanner {
    fn default() -> Self {
        Self {
            size_setting: 0.75,
            angle_range: Vec2::new(PI * 0.01, PI * 0.1),
            interval_range: Vec2::new(0.005, 0.003),
            progress: 0.0,
            burst_duration: 3.0,
            active: false,
            trigger_burst: false,
            boosted: false,
        }
    }
}

impl Scanner {
    pub fn interval(&self) -> f32 {
        if self.boosted {
            return BOOST_INTERVAL;
        }
        self.interval_range
            .x
            .lerp(self.interval_range.y, self.size_setting)
    }

    pub fn cone_angle(&self) -> f32 {
        self.angle_range.x.lerp(self.angle_range.y, self.size_setting)
    }
}

/// Direction inside a cone around local -Z. `azimuth` spins around the axis,
/// `polar` tilts away from it.
pub fn cone_direction(azimuth: f32, polar: f32) -> Vec3 {
    let (sin_azimuth, cos_azimuth) = azimuth.sin_cos();
    let (sin_polar, cos_polar) = polar.sin_cos();
    Vec3::new(sin_polar * cos_azimuth, sin_polar * sin_azimuth, -cos_polar)
}

/// Where a ray from `start` along unit `direction` crosses `y = 0`, if it
/// does so within `max_distance`.
pub fn ground_plane_hit(start: Vec3, direction: Vec3, max_distance: f32) -> Option<Vec3> {
    if start.y * direction.y >= 0.0 {
        return None;
    }
    let distance = -start.y / direction.y;
    (distance <= max_distance).then(|| start + direction * distance)
}

pub fn update_scan_input(
    mouse_input: Res<ButtonInput<MouseButton>>,
    mut scroll_events: EventReader<MouseWheel>,
    mut scanners: Query<&mut Scanner>,
) {
    let scroll: f32 = scroll_events
        .read()
        .map(|event| {
            event.y
                * match event.unit {
                    MouseScrollUnit::Line => 0.1,
                    MouseScrollUnit::Pixel => 0.005,
                }
        })
        .sum();

    for mut scanner in &mut scanners {
        scanner.active = mouse_input.pressed(MouseButton::Left);
        scanner.trigger_burst = mouse_input.pressed(MouseButton::Right);
        scanner.size_setting = (scanner.size_setting + scroll).clamp(0.0, 1.0);
    }
}

pub fn scan(
    time: Res<Time>,
    mut gizmos: Gizmos,
    mut scanners: Query<(&mut Scanner, &GlobalTransform)>,
    mut scanned: Query<&mut PointCloud, With<ScannedPointCloud>>,
) {
    let Ok(mut point_cloud) = scanned.single_mut() else {
        return;
    };

    for (mut scanner, transform) in &mut scanners {
        scanner.progress += time.delta_secs();
        if scanner.progress < 0.0 {
            continue;
        }

        if scanner.trigger_burst {
            scanner.progress -= scanner.burst_duration;
            continue;
        }

        if !scanner.active {
            scanner.progress = 0.0;
            continue;
        }

        let interval = scanner.interval();
        let cone_angle = scanner.cone_angle();
        let start = transform.translation();
        let mut hits = Vec::new();

        while scanner.progress > interval {
            let local = cone_direction(fastrand::f32() * TAU, fastrand::f32() * cone_angle);
            let direction = transform.affine().transform_vector3(local).normalize_or_zero();

            match ground_plane_hit(start, direction, SCANNER_MAX_DISTANCE) {
                Some(end) => {
                    gizmos.line(start, end, SKY_BLUE);
                    hits.push(end.extend(SCANNED_POINT_SIZE));
                }
                None => gizmos.line(start, start + direction * SCANNER_MAX_DISTANCE, SKY_BLUE),
            }
            scanner.progress -= interval;
        }

        // Touch the cloud only when something landed so extraction does not
        // re-upload unchanged points.
        if !hits.is_empty() {
            point_cloud.points_mut().extend(hits);
        }
    }
}

pub fn clear_scan(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut scanned: Query<&mut PointCloud, With<ScannedPointCloud>>,
) {
    if !keyboard.just_pressed(KeyCode::KeyR) {
        return;
    }
    for mut point_cloud in &mut scanned {
        point_cloud.points_mut().clear();
    }
    info!("Cleared scanned points");
}

pub fn toggle_boost(keyboard: Res<ButtonInput<KeyCode>>, mut scanners: Query<&mut Scanner>) {
    if !keyboard.just_pressed(KeyCode::KeyB) {
        return;
    }
    for mut scanner in &mut scanners {
        scanner.boosted = !scanner.boosted;
        info!("Scanner boost {}", if scanner.boosted { "on" } else { "off" });
    }
}

pub fn toggle_lights(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut lights: Query<
        &mut Visibility,
        Or<(With<PointLight>, With<SpotLight>, With<DirectionalLight>)>,
    >,
) {
    if !keyboard.just_pressed(KeyCode::KeyL) {
        return;
    }
    for mut visibility in &mut lights {
        *visibility = match *visibility {
            Visibility::Inherited | Visibility::Visible => Visibility::Hidden,
            Visibility::Hidden => Visibility::Inherited,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn cone_axis_is_forward() {
        let direction = cone_direction(1.3, 0.0);
        assert_abs_diff_eq!(direction.distance(Vec3::NEG_Z), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn cone_directions_respect_polar_angle() {
        for step in 0..16 {
            let azimuth = step as f32 / 16.0 * TAU;
            let direction = cone_direction(azimuth, 0.2);
            assert_abs_diff_eq!(direction.length(), 1.0, epsilon = 1e-5);
            assert_abs_diff_eq!(direction.angle_between(Vec3::NEG_Z), 0.2, epsilon = 1e-4);
        }
    }

    #[test]
    fn downward_ray_hits_ground() {
        let start = Vec3::new(1.0, 2.0, 0.0);
        let direction = Vec3::new(0.0, -1.0, -1.0).normalize();
        let hit = ground_plane_hit(start, direction, 100.0).unwrap();
        assert_abs_diff_eq!(hit.y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(hit.z, -2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(hit.x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn upward_or_distant_rays_miss() {
        let start = Vec3::new(0.0, 2.0, 0.0);
        assert!(ground_plane_hit(start, Vec3::Y, 100.0).is_none());
        assert!(ground_plane_hit(start, Vec3::NEG_Z, 100.0).is_none());
        let shallow = Vec3::new(0.0, -0.001, -1.0).normalize();
        assert!(ground_plane_hit(start, shallow, 200.0).is_none());
    }

    #[test]
    fn ray_from_below_hits_from_underneath() {
        let hit = ground_plane_hit(Vec3::new(0.0, -1.0, 0.0), Vec3::Y, 10.0).unwrap();
        assert_eq!(hit, Vec3::ZERO);
    }

    #[test]
    fn size_setting_interpolates_cone_and_rate() {
        let mut scanner = Scanner {
            size_setting: 0.0,
            ..default()
        };
        assert_abs_diff_eq!(scanner.cone_angle(), PI * 0.01);
        assert_abs_diff_eq!(scanner.interval(), 0.005);
        scanner.size_setting = 1.0;
        assert_abs_diff_eq!(scanner.cone_angle(), PI * 0.1);
        assert_abs_diff_eq!(scanner.interval(), 0.003);
        scanner.boosted = true;
        assert_eq!(scanner.interval(), BOOST_INTERVAL);
    }
}
