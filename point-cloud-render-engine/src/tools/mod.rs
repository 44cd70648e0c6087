//! Interactive tools operating on the splat scene.
//!
//! ## Scanner
//!
//! - **Left mouse**: emit rays inside a cone from the camera-mounted scanner;
//!   each ray that meets the ground plane `y = 0` within 200 units adds a
//!   point of size 0.1 to the scanned cloud
//! - **Scroll wheel**: widen or narrow the cone (and emission rate)
//! - **Right mouse**: pause emission for the burst duration
//! - **R**: clear scanned points, **B**: toggle boost rate, **L**: toggle lights

/// Camera-mounted ray emitter writing into the scanned point cloud.
pub mod scanner;
