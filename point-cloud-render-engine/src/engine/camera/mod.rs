//! Camera navigation for the splat scene.
//!
//! A free-fly controller with keyboard movement and mouse look, plus window
//! toggles for cursor grab and fullscreen.

/// Free-fly camera component and its input systems.
pub mod free_cam;
