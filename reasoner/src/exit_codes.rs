//! Stable exit codes for the wizard CLI.

/// Command succeeded; for `run`, the session reached Complete.
pub const OK: i32 = 0;
/// Invalid catalog/config or any other error.
pub const INVALID: i32 = 1;
/// `run` ended (quit or input closed) before the session completed.
pub const INCOMPLETE: i32 = 2;
