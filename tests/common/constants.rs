//! Shared constants for end-to-end tests

// ============================================================================
// Test Artists & Tracks
// ============================================================================

/// Artist with two tracks and a busy week of plays
pub const ARTIST_1_ID: &str = "artist-1";

/// Artist with one lightly played track
pub const ARTIST_2_ID: &str = "artist-2";

/// Artist with no tracks at all
pub const ARTIST_3_ID: &str = "artist-3";

pub const TRACK_1_ID: &str = "track-1";
pub const TRACK_2_ID: &str = "track-2";
pub const TRACK_3_ID: &str = "track-3";

// ============================================================================
// Fixture Dates
// ============================================================================

/// Monday opening the seeded week
pub const WEEK_START: &str = "2024-03-04";

/// Sunday closing the seeded week
pub const WEEK_END: &str = "2024-03-10";

/// Following Monday, whose run also rolls the seeded week up
pub const NEXT_MONDAY: &str = "2024-03-11";

// ============================================================================
// Timeouts
// ============================================================================

pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

pub const REQUEST_TIMEOUT_SECS: u64 = 30;
