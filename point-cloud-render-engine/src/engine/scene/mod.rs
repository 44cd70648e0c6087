//! Scene construction from the loaded configuration.

/// Deterministic point generators (sphere surface, box volume, flat grid).
pub mod generators;

/// Camera, light, ground plane and point cloud entity spawning.
pub mod spawn;
