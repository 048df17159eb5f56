// Constants module - centralized default values for configuration
//
// This module defines all default values used throughout the codebase.
// Using constants instead of magic numbers improves maintainability
// and makes it easier to understand and modify defaults.

// =============================================================================
// Watermark defaults
// =============================================================================

/// Default watermark text for a user who never changed it
pub const DEFAULT_TEXT: &str = "Watermark";

/// Default font size in pixels
pub const DEFAULT_FONT_SIZE: u32 = 48;

/// Default opacity as an alpha byte (~70%)
pub const DEFAULT_OPACITY: u8 = 180;

/// Default outline stroke radius in pixels
pub const DEFAULT_OUTLINE_WIDTH: u32 = 2;

/// Font size presets offered to users, in pixels
pub const FONT_SIZE_PRESETS: [u32; 4] = [32, 48, 64, 80];

/// Opacity steps offered to users, in percent
pub const OPACITY_STEPS_PERCENT: [u8; 5] = [0, 25, 50, 75, 100];

/// Largest accepted outline stroke radius
pub const MAX_OUTLINE_WIDTH: u32 = 5;

/// Maximum watermark text length in characters
pub const MAX_TEXT_CHARS: usize = 50;

/// Distance between the text box and the canvas edges in pixels
pub const EDGE_MARGIN: i32 = 30;

// =============================================================================
// Video defaults
// =============================================================================

/// Font size at which the video stroke scale is 1.0
pub const VIDEO_SCALE_BASELINE: f32 = 40.0;

/// Minimum foreground stroke thickness for video frames
pub const MIN_VIDEO_THICKNESS: u32 = 2;

/// Default ceiling for inbound video size (50 MiB)
pub const DEFAULT_MAX_VIDEO_BYTES: u64 = 50 * 1024 * 1024;

/// Default video codec for re-encoding
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";

/// Default constant rate factor for the video encoder
pub const DEFAULT_VIDEO_CRF: u8 = 23;

// =============================================================================
// Photo defaults
// =============================================================================

/// Default JPEG quality for watermarked photos
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

// =============================================================================
// Session defaults
// =============================================================================

/// Idle time after which a user's session is evicted (1 day)
pub const DEFAULT_SESSION_IDLE_TTL_SECS: u64 = 86_400;

/// Maximum number of live sessions kept in memory
pub const DEFAULT_MAX_SESSIONS: u64 = 100_000;
