//! Unix-time helpers.
//!
//! Rows are stamped with unix seconds (`i64`) throughout the workspace.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in seconds.
pub fn now_ts() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Current unix time in milliseconds, for event frames.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_and_millis_agree() {
        let s = now_ts();
        let ms = now_ms();
        assert!(ms / 1000 >= s - 1);
        assert!(ms / 1000 <= s + 1);
    }
}
