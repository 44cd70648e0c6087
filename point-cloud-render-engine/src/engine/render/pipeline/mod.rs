//! Accumulation pipeline for camera-facing point splats.
//!
//! Points are not meshes. Each cloud owns a storage buffer of packed points
//! (xyz local position, w world size) and a uniform holding its current and
//! previous instance transforms. The draw issues `6 * point_count` vertices
//! with no vertex buffer; the vertex shader uses `vertex_index / 6` to fetch
//! the point and `vertex_index % 6` to pick the quad corner.
//!
//! ## Bind Groups
//!
//! - **@group(0)**: `SplatView` camera context (clip-from-world, position, right, up, forward)
//! - **@group(1)**: `PointCloudUniform` + `array<vec4<f32>>` points
//! - **@group(2)**: material parameters, laid out by the material's `AsBindGroup`
//!
//! ## Targets
//!
//! The fragment stage writes two targets instead of the view's colour:
//!
//! - colour accumulation (`Rgba16Float`), blended `One + One`
//! - reveal (`R16Float`), blended `Zero + OneMinusSrc` so it holds `prod(1 - a)`
//!
//! Depth is tested against the opaque pass (reversed-Z, `GreaterEqual`) but
//! never written, so transparent splats do not occlude one another.
//!
//! ## Upload
//!
//! Point data is validated on the CPU before any buffer is created. Clouds
//! that fail validation are logged and left without GPU data, which makes
//! their draw commands skip.

/// Accumulation pipeline, point upload and the shared render commands.
pub mod point_cloud_render_pipeline;
