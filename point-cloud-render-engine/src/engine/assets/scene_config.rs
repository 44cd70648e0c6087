use std::f32::consts::PI;

use bevy::prelude::*;
use constants::material::DEFAULT_HUE_MAX;
use constants::render_settings::{DEFAULT_MSAA_SAMPLES, SUPPORTED_SAMPLE_COUNTS};
use point_cloud_splat::{
    DistanceHueParams, SplatError, SplatMaterialConfig, SplatResult, vertex_count,
};
use serde::{Deserialize, Serialize};

/// Complete demo scene as a Bevy asset. Mirrors the JSON structure exactly.
#[derive(Asset, Debug, Clone, Serialize, Deserialize, TypePath)]
pub struct SceneConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default = "default_clear_colour")]
    pub clear_color: [f32; 3],
    #[serde(default)]
    pub clouds: Vec<CloudConfig>,
    #[serde(default)]
    pub scanner: ScannerConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub look_at: [f32; 3],
    pub msaa_samples: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 3.0, 12.0],
            look_at: [0.0, 1.0, 0.0],
            msaa_samples: DEFAULT_MSAA_SAMPLES,
        }
    }
}

impl CameraConfig {
    pub fn transform(&self) -> Transform {
        Transform::from_translation(Vec3::from_array(self.position))
            .looking_at(Vec3::from_array(self.look_at), Vec3::Y)
    }

    pub fn msaa(&self) -> Msaa {
        match self.msaa_samples {
            1 => Msaa::Off,
            2 => Msaa::Sample2,
            8 => Msaa::Sample8,
            _ => Msaa::Sample4,
        }
    }
}

/// One point cloud instance and the recipe for its points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    pub name: String,
    pub generator: PointGenerator,
    #[serde(default = "default_point_size")]
    pub point_size: f32,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub material: SplatMaterialConfig,
    /// Radians per second about the local Y axis; zero keeps the cloud still.
    #[serde(default)]
    pub spin_speed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum PointGenerator {
    /// Points spread evenly over a sphere's surface.
    Sphere { count: usize, radius: f32, seed: u64 },
    /// Points uniformly inside an axis-aligned box centred on the origin.
    Box {
        count: usize,
        half_extents: [f32; 3],
        seed: u64,
    },
    /// Regular grid in the local XZ plane, centred on the origin.
    Grid {
        columns: usize,
        rows: usize,
        spacing: f32,
    },
}

impl PointGenerator {
    pub fn point_count(&self) -> usize {
        match *self {
            PointGenerator::Sphere { count, .. } | PointGenerator::Box { count, .. } => count,
            PointGenerator::Grid { columns, rows, .. } => columns.saturating_mul(rows),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub translation: [f32; 3],
    /// Euler XYZ, degrees.
    pub rotation_degrees: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            rotation_degrees: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl TransformConfig {
    pub fn to_transform(&self) -> Transform {
        let [x, y, z] = self.rotation_degrees.map(f32::to_radians);
        Transform {
            translation: Vec3::from_array(self.translation),
            rotation: Quat::from_euler(EulerRot::XYZ, x, y, z),
            scale: Vec3::from_array(self.scale),
        }
    }

    fn is_finite(&self) -> bool {
        self.translation
            .iter()
            .chain(&self.rotation_degrees)
            .chain(&self.scale)
            .all(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub enabled: bool,
    pub material: SplatMaterialConfig,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            material: SplatMaterialConfig::DistanceHue(DistanceHueParams {
                distance_min: 0.0,
                distance_max: 30.0,
                hue_min: 0.0,
                hue_max: DEFAULT_HUE_MAX,
            }),
        }
    }
}

fn default_clear_colour() -> [f32; 3] {
    [0.02, 0.02, 0.03]
}

fn default_point_size() -> f32 {
    0.1
}

impl Default for SceneConfig {
    /// Scene used when the configuration file is missing or invalid.
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            clear_color: default_clear_colour(),
            clouds: vec![
                CloudConfig {
                    name: "sphere".into(),
                    generator: PointGenerator::Sphere {
                        count: 20_000,
                        radius: 2.0,
                        seed: 7,
                    },
                    point_size: 0.08,
                    transform: TransformConfig {
                        translation: [-3.0, 2.0, 0.0],
                        ..default()
                    },
                    material: SplatMaterialConfig::DistanceHue(DistanceHueParams {
                        distance_min: 8.0,
                        distance_max: 16.0,
                        ..default()
                    }),
                    spin_speed: 0.3,
                },
                CloudConfig {
                    name: "box".into(),
                    generator: PointGenerator::Box {
                        count: 10_000,
                        half_extents: [1.5, 1.5, 1.5],
                        seed: 11,
                    },
                    point_size: 0.12,
                    transform: TransformConfig {
                        translation: [3.0, 1.5, 0.0],
                        rotation_degrees: [0.0, 30.0, 0.0],
                        scale: [1.0, 1.0, 2.0],
                    },
                    material: SplatMaterialConfig::Uniform {
                        color: [0.3, 0.6, 1.0, 0.4],
                    },
                    spin_speed: -PI / 8.0,
                },
            ],
            scanner: ScannerConfig::default(),
        }
    }
}

impl SceneConfig {
    /// Rejects anything the renderer would have to skip later.
    pub fn validate(&self) -> SplatResult<()> {
        if !SUPPORTED_SAMPLE_COUNTS.contains(&self.camera.msaa_samples) {
            return Err(SplatError::Config(format!(
                "unsupported msaa sample count {} (expected one of {:?})",
                self.camera.msaa_samples, SUPPORTED_SAMPLE_COUNTS
            )));
        }

        let camera_finite = self
            .camera
            .position
            .iter()
            .chain(&self.camera.look_at)
            .all(|v| v.is_finite());
        if !camera_finite || self.camera.position == self.camera.look_at {
            return Err(SplatError::Config(
                "camera position and look_at must be finite and distinct".into(),
            ));
        }

        for cloud in &self.clouds {
            if !(cloud.point_size.is_finite() && cloud.point_size >= 0.0) {
                return Err(SplatError::Config(format!(
                    "cloud '{}' has invalid point size {}",
                    cloud.name, cloud.point_size
                )));
            }
            if !cloud.transform.is_finite() || !cloud.spin_speed.is_finite() {
                return Err(SplatError::Config(format!(
                    "cloud '{}' has a non-finite transform",
                    cloud.name
                )));
            }
            vertex_count(cloud.generator.point_count())?;
            cloud.material.validate()?;
        }

        self.scanner.material.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scene_is_valid() {
        assert!(SceneConfig::default().validate().is_ok());
    }

    #[test]
    fn parses_minimal_scene() {
        let json = r#"{
            "clouds": [
                { "name": "g", "generator": { "shape": "grid", "columns": 4, "rows": 3, "spacing": 0.5 } }
            ]
        }"#;
        let scene: SceneConfig = serde_json::from_str(json).unwrap();
        assert_eq!(scene.camera.msaa_samples, DEFAULT_MSAA_SAMPLES);
        assert_eq!(scene.clouds[0].generator.point_count(), 12);
        assert_eq!(scene.clouds[0].point_size, 0.1);
        assert!(matches!(
            scene.clouds[0].material,
            SplatMaterialConfig::Uniform { .. }
        ));
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn parses_distance_hue_material() {
        let json = r#"{
            "name": "s",
            "generator": { "shape": "sphere", "count": 10, "radius": 1.0, "seed": 3 },
            "material": { "type": "distance_hue", "distance_min": 2.0, "distance_max": 9.0 }
        }"#;
        let cloud: CloudConfig = serde_json::from_str(json).unwrap();
        let SplatMaterialConfig::DistanceHue(params) = cloud.material else {
            panic!("expected distance hue material");
        };
        assert_eq!(params.distance_min, 2.0);
        assert_eq!(params.distance_max, 9.0);
        assert_eq!(params.hue_max, DEFAULT_HUE_MAX);
    }

    #[test]
    fn bundled_demo_scene_is_valid() {
        let json = include_str!("../../../assets/scenes/demo.scene.json");
        let scene: SceneConfig = serde_json::from_str(json).unwrap();
        assert_eq!(scene.clouds.len(), 3);
        assert!(scene.scanner.enabled);
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn rejects_unsupported_msaa() {
        let mut scene = SceneConfig::default();
        scene.camera.msaa_samples = 3;
        assert!(matches!(scene.validate(), Err(SplatError::Config(_))));
    }

    #[test]
    fn rejects_negative_point_size() {
        let mut scene = SceneConfig::default();
        scene.clouds[0].point_size = -1.0;
        assert!(scene.validate().is_err());
    }

    #[test]
    fn rotation_is_read_in_degrees() {
        let transform = TransformConfig {
            rotation_degrees: [0.0, 90.0, 0.0],
            ..default()
        }
        .to_transform();
        let x = transform.rotation * Vec3::X;
        assert!((x - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn msaa_maps_sample_counts() {
        let mut camera = CameraConfig::default();
        camera.msaa_samples = 1;
        assert_eq!(camera.msaa(), Msaa::Off);
        camera.msaa_samples = 8;
        assert_eq!(camera.msaa(), Msaa::Sample8);
    }
}
