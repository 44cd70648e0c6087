//! Core application setup and state management.
//!
//! Handles application lifecycle, window configuration, state transitions,
//! and plugin initialisation for both native and WASM targets.

/// Application setup and plugin configuration for the Bevy engine.
///
/// Creates the main app with the splat render pipeline, the scene loader,
/// and platform-specific configurations.
pub mod app_setup;

/// Application state machine from scene loading to runtime.
pub mod app_state;

/// Platform-specific window configuration for native and WASM builds.
pub mod window_config;
