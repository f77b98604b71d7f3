//! Clock helpers for envelope timestamps.

/// Returns the current Unix timestamp in milliseconds.
pub fn now_timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// True if `expires_at` (Unix millis) lies strictly before `now`.
pub fn is_past(expires_at: i64, now: i64) -> bool {
    expires_at < now
}
