//! Asset definitions for the demo scene.
//!
//! The scene is described in JSON and loaded through `bevy_common_assets`, so
//! camera placement, MSAA, point cloud recipes and materials can change
//! without recompiling.

/// Scene configuration asset: camera, point cloud generators, transforms
/// and materials, with validation before anything is spawned.
pub mod scene_config;
