use bevy::ecs::system::{EntityCommands, SystemParam};
use bevy::prelude::*;
use point_cloud_splat::SplatMaterialConfig;

use crate::engine::assets::scene_config::SceneConfig;
use crate::engine::camera::free_cam::FreeCam;
use crate::engine::point_cloud::{PointCloud, ScannedPointCloud, Spin};
use crate::engine::render::material::PointCloudMaterial3d;
use crate::engine::render::material::distance_material::DistanceHueMaterial;
use crate::engine::render::material::uniform_material::UniformMaterial;
use crate::engine::scene::generators::generate_points;
use crate::tools::scanner::Scanner;

/// Asset stores touched while spawning a scene.
#[derive(SystemParam)]
pub struct SceneAssets<'w> {
    pub meshes: ResMut<'w, Assets<Mesh>>,
    pub standard_materials: ResMut<'w, Assets<StandardMaterial>>,
    pub uniform_materials: ResMut<'w, Assets<UniformMaterial>>,
    pub distance_materials: ResMut<'w, Assets<DistanceHueMaterial>>,
}

impl SceneAssets<'_> {
    /// Adds the material component matching a configuration entry.
    fn insert_material(&mut self, entity: &mut EntityCommands, material: &SplatMaterialConfig) {
        match material {
            SplatMaterialConfig::Uniform { color } => {
                let handle = self.uniform_materials.add(UniformMaterial::from(*color));
                entity.insert(PointCloudMaterial3d(handle));
            }
            SplatMaterialConfig::DistanceHue(params) => {
                let handle = self
                    .distance_materials
                    .add(DistanceHueMaterial::from(*params));
                entity.insert(PointCloudMaterial3d(handle));
            }
        }
    }
}

/// Spawns camera, lighting, ground and every configured point cloud.
pub fn spawn_scene(commands: &mut Commands, assets: &mut SceneAssets, config: &SceneConfig) {
    let [red, green, blue] = config.clear_color;
    commands.insert_resource(ClearColor(Color::linear_rgb(red, green, blue)));

    let camera_transform = config.camera.transform();
    let mut camera = commands.spawn((
        Camera3d::default(),
        camera_transform,
        config.camera.msaa(),
        FreeCam::from_transform(&camera_transform),
        Name::new("Splat Camera"),
    ));
    if config.scanner.enabled {
        // Held low and to the right so rays are visible from the eye.
        camera.with_child((
            Scanner::default(),
            Transform::from_xyz(0.2, -0.1, 0.1),
            Name::new("Scanner"),
        ));
    }

    commands.spawn((
        DirectionalLight {
            illuminance: 8_000.0,
            ..default()
        },
        Transform::from_xyz(4.0, 10.0, 6.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    // Opaque ground: splats behind it are depth rejected and the scanner hits it.
    commands.spawn((
        Mesh3d(assets.meshes.add(Plane3d::default().mesh().size(60.0, 60.0))),
        MeshMaterial3d(assets.standard_materials.add(StandardMaterial {
            base_color: Color::srgb(0.18, 0.18, 0.2),
            perceptual_roughness: 0.9,
            ..default()
        })),
        Transform::IDENTITY,
        Name::new("Ground"),
    ));

    let mut total_points = 0;
    for cloud in &config.clouds {
        let points = generate_points(&cloud.generator, cloud.point_size);
        total_points += points.len();

        let mut entity = commands.spawn((
            PointCloud::new(points),
            cloud.transform.to_transform(),
            Name::new(cloud.name.clone()),
        ));
        if cloud.spin_speed != 0.0 {
            entity.insert(Spin {
                radians_per_second: cloud.spin_speed,
            });
        }
        assets.insert_material(&mut entity, &cloud.material);
    }

    if config.scanner.enabled {
        let mut scanned = commands.spawn((
            PointCloud::default(),
            ScannedPointCloud,
            Name::new("Scanned Points"),
        ));
        assets.insert_material(&mut scanned, &config.scanner.material);
    }

    info!(
        "Spawned {} point clouds ({} points)",
        config.clouds.len(),
        total_points
    );
}
