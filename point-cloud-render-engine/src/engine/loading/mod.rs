//! Scene loading and the transition out of `AppState::Loading`.

/// Scene configuration loading, validation and fallback handling.
///
/// Spawns the scene and moves the app to `Running` once the configuration
/// resolves either way.
pub mod scene_loader;
