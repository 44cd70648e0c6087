use bevy::asset::LoadState;
use bevy::prelude::*;
use constants::path::DEFAULT_SCENE_PATH;

use crate::engine::assets::scene_config::SceneConfig;
use crate::engine::core::app_state::AppState;
use crate::engine::scene::spawn::{SceneAssets, spawn_scene};

#[derive(Resource, Default)]
pub struct SceneLoader {
    handle: Option<Handle<SceneConfig>>,
}

// Start the loading process
pub fn start_loading(mut scene_loader: ResMut<SceneLoader>, asset_server: Res<AssetServer>) {
    info!("Loading scene configuration from {}", DEFAULT_SCENE_PATH);
    scene_loader.handle = Some(asset_server.load(DEFAULT_SCENE_PATH));
}

/// Spawns the scene once its configuration resolves. A missing, unreadable or
/// invalid file falls back to the built-in scene instead of stalling in
/// `Loading`.
pub fn spawn_scene_when_ready(
    scene_loader: Res<SceneLoader>,
    scenes: Res<Assets<SceneConfig>>,
    asset_server: Res<AssetServer>,
    mut commands: Commands,
    mut scene_assets: SceneAssets,
    mut next_state: ResMut<NextState<AppState>>,
) {
    let Some(handle) = scene_loader.handle.as_ref() else {
        return;
    };

    let config = if let Some(config) = scenes.get(handle) {
        match config.validate() {
            Ok(()) => config.clone(),
            Err(err) => {
                error!("Scene configuration rejected: {}; using built-in scene", err);
                SceneConfig::default()
            }
        }
    } else if let Some(LoadState::Failed(err)) = asset_server.get_load_state(handle) {
        error!("Scene configuration failed to load: {}; using built-in scene", err);
        SceneConfig::default()
    } else {
        return;
    };

    spawn_scene(&mut commands, &mut scene_assets, &config);
    next_state.set(AppState::Running);
}
