use bevy::asset::AssetMetaCheck;
use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;
use bevy_common_assets::json::JsonAssetPlugin;

// Crate engine modules
use crate::engine::assets::scene_config::SceneConfig;
use crate::engine::camera::free_cam::{free_cam_controller, toggle_cursor_grab, toggle_fullscreen};
use crate::engine::core::app_state::{AppState, log_running};
use crate::engine::core::window_config::create_window_config;
use crate::engine::loading::scene_loader::{SceneLoader, spawn_scene_when_ready, start_loading};
use crate::engine::point_cloud::spin_point_clouds;
use crate::engine::render::material::PointCloudMaterialPlugin;
use crate::engine::render::material::distance_material::DistanceHueMaterial;
use crate::engine::render::material::uniform_material::UniformMaterial;
use crate::engine::render::pipeline::point_cloud_render_pipeline::PointCloudRenderPlugin;
use crate::engine::render::transparency::OrderIndependentTransparencyPlugin;
use crate::engine::systems::fps_tracking::{debug_text_update_system, spawn_debug_text};
// Crate tools modules
use crate::tools::scanner::{
    clear_scan, scan, toggle_boost, toggle_lights, update_scan_input,
};

pub fn create_app() -> App {
    let mut app = App::new();

    app.add_plugins(create_default_plugins())
        .add_plugins(FrameTimeDiagnosticsPlugin::default())
        // Registers SceneConfig as a loadable asset type from `.scene.json` files.
        .add_plugins(JsonAssetPlugin::<SceneConfig>::new(&["scene.json"]))
        .add_plugins(PointCloudRenderPlugin)
        .add_plugins(OrderIndependentTransparencyPlugin)
        // Material plugins register their draw functions on the OIT phase, so
        // they go after the pipeline plugins above.
        .add_plugins(PointCloudMaterialPlugin::<UniformMaterial>::default())
        .add_plugins(PointCloudMaterialPlugin::<DistanceHueMaterial>::default())
        .init_state::<AppState>()
        .init_resource::<SceneLoader>();

    app.add_systems(Startup, (start_loading, spawn_debug_text))
        .add_systems(
            Update,
            spawn_scene_when_ready.run_if(in_state(AppState::Loading)),
        )
        .add_systems(OnEnter(AppState::Running), log_running);

    let runtime_systems = (
        free_cam_controller,
        toggle_cursor_grab,
        toggle_fullscreen,
        spin_point_clouds,
        // Scanner: input first so this frame's buttons drive emission
        (update_scan_input, scan).chain(),
        clear_scan,
        toggle_boost,
        toggle_lights,
        debug_text_update_system,
    );

    app.add_systems(Update, runtime_systems.run_if(in_state(AppState::Running)));

    app
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    DefaultPlugins.set(window_config).set(asset_config)
}
