/// Each point expands to two triangles.
pub const VERTICES_PER_POINT: u32 = 6;

/// Default multisample count for the accumulation targets.
pub const DEFAULT_MSAA_SAMPLES: u32 = 4;

/// Sample counts the accumulation targets and the reference compositor accept.
pub const SUPPORTED_SAMPLE_COUNTS: &[u32] = &[1, 2, 4, 8];

/// Size given to points deposited by the scanner.
pub const SCANNED_POINT_SIZE: f32 = 0.1;

/// Maximum ray length for the scanner ground-plane hit.
pub const SCANNER_MAX_DISTANCE: f32 = 200.0;
