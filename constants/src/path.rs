pub const POINT_CLOUD_TYPES_SHADER_PATH: &str = "shaders/point_cloud_types.wgsl";
pub const POINT_CLOUD_SHADER_PATH: &str = "shaders/point_cloud.wgsl";
pub const POINT_CLOUD_DISTANCE_SHADER_PATH: &str = "shaders/point_cloud_distance.wgsl";
pub const OIT_RESOLVE_SHADER_PATH: &str = "shaders/oit_resolve.wgsl";

/// Scene configuration loaded at startup, relative to the asset root.
pub const DEFAULT_SCENE_PATH: &str = "scenes/demo.scene.json";
