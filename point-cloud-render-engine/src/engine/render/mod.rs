//! Rendering systems for camera-facing point splats.
//!
//! Implements the accumulation pipeline, per-material specialisation, the
//! order-independent transparency textures and resolve pass, and the
//! extraction that feeds them from the main world.

/// Main world to render world transfer of point clouds, camera phases and
/// the per-frame splat camera context.
pub mod extraction;

/// Point cloud materials: a generic plugin plus the uniform-colour and
/// distance-hue variants.
pub mod material;

/// Accumulation pipeline expanding each point into a camera-facing quad
/// on the GPU.
pub mod pipeline;

/// Weighted-blended order-independent transparency: accumulation targets,
/// the sorted phase and the resolve node.
pub mod transparency;
