//! Process exit codes. Sink delivery failures never change the exit code.

pub const EXIT_SUCCESS: i32 = 0;
/// Unreadable or malformed event stream, bad flags, lifecycle misuse.
pub const EXIT_CONFIG_ERROR: i32 = 2;
