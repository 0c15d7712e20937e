//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `ggroup` exit codes.
//! Scripts and CI jobs rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                              |
//! |---------|------------|------------------------------------------|
//! | 0       | Universal  | Success                                  |
//! | 1       | Universal  | General error (unspecified)              |
//! | 2       | Universal  | CLI usage error (bad args, missing file) |
//! | 3-9     | replay     | Script replay codes                      |
//! | 10-19   | check      | Saved state checks                       |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable input file.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Replay (3-9)
// =============================================================================

/// Script could not be parsed (bad JSON/TOML, unknown op).
pub const EXIT_REPLAY_SCRIPT_ERROR: u8 = 3;

/// Script referred to a group name that does not exist at that step.
pub const EXIT_REPLAY_UNKNOWN_GROUP: u8 = 4;

/// `--strict` and at least one step was rejected by the engine.
pub const EXIT_REPLAY_REJECTED: u8 = 5;

/// Settings file could not be read or parsed.
pub const EXIT_SETTINGS_ERROR: u8 = 6;

// =============================================================================
// Check (10-19)
// =============================================================================

/// State file is not valid JSON for a group model.
pub const EXIT_STATE_PARSE: u8 = 10;

/// State parsed but breaks a model invariant for the given axis length.
pub const EXIT_STATE_INVALID: u8 = 11;
