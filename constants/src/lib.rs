//! Shared constants for the splat renderer.
//!
//! Kept free of logic so the CPU library, the Bevy plugins and the WGSL
//! shaders can agree on a single set of numbers.

pub mod material;
pub mod oit;
pub mod path;
pub mod render_settings;
