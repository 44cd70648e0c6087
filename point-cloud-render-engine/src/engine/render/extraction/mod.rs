//! Resource extraction systems for render world synchronisation.
//!
//! Transfers main world state to the render world each frame during Bevy's
//! extract schedule.

/// Order-independent transparency phases per active camera with entity
/// lifecycle tracking.
pub mod camera_phases;

/// Point cloud instances and pending uploads.
pub mod point_clouds;

/// Camera context captured once per frame for the billboard stage.
pub mod splat_view;
