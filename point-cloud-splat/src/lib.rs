//! CPU implementation of the camera-facing splat pipeline with weighted-blended
//! order-independent transparency.
//!
//! The GPU renderer in `point-cloud-render-engine` runs the same formulas in
//! WGSL. This crate is what the host uses to build per-frame uniforms and
//! validate data before a draw, and it carries a software compositor that
//! executes a whole frame on the CPU.
//!
//! ## Frame Pipeline
//!
//! 1. **Camera**: [`SplatView`] is captured once per frame from camera state
//! 2. **Billboard**: each `(point, corner)` pair becomes a world-space quad vertex
//! 3. **Material**: a [`MaterialColor`] chosen per draw shades each fragment
//! 4. **Accumulate**: fragments add commutative contributions to each sample
//! 5. **Resolve**: once every draw has landed, samples become final colours

pub mod accumulate;
pub mod billboard;
pub mod camera;
pub mod compositor;
pub mod error;
pub mod material;
pub mod point;
pub mod resolve;
pub mod validation;

pub use accumulate::{AccumulationSample, AccumulationTarget, depth_factor, oit_weight};
pub use billboard::{BillboardVertex, CORNER_UVS, corner_uv, generate_quad, generate_vertex};
pub use camera::{SplatView, SplatViewUniform, billboard_basis};
pub use compositor::SoftwareCompositor;
pub use error::{SplatError, SplatResult};
pub use material::{
    BaseColorTexture, DistanceHue, DistanceHueParams, MaterialColor, RgbaTexture, SolidTexture,
    SplatFragment, SplatMaterialConfig, UniformColor, hsv_to_rgb, smoothstep,
};
pub use point::{Point, PointCloudFrame, PointCloudInstance, PointCloudStore, PointCloudUniform};
pub use resolve::{ResolvedFrame, composite_over, resolve_sample, resolve_target};
pub use validation::{validate_instance, validate_points, vertex_count};
