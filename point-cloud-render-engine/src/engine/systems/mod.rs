//! Runtime diagnostics systems.

/// On-screen overlay with the frame rate and the scanned point count.
pub mod fps_tracking;
