//! Lua scripts for atomic Redis operations.
//!
//! Rate limit counters must be incremented and given a TTL in one atomic
//! step. Splitting INCR and EXPIRE into two round trips leaves a window
//! where the process dies between them and the counter never expires,
//! permanently consuming a client's budget. A Lua script executes both as
//! a single unit on the server.

/// Lua script for the fixed-window rate limit counter.
///
/// Arguments:
/// - KEYS[1]: Window counter key (e.g., `ratelimit:general:1.2.3.4:28761234`)
/// - ARGV[1]: Window length in seconds (counter TTL)
///
/// Returns:
/// - The count after this increment
///
/// The TTL is set only on the first increment of a window, so the counter
/// expires a fixed interval after the window opens regardless of how many
/// requests land in it.
pub const RATE_LIMIT_INCR: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
"#;
