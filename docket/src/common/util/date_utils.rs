use chrono::{DateTime, Utc};

/// Returns the time a store uses when it resolves a server timestamp.
#[inline]
pub fn server_now() -> DateTime<Utc> {
    Utc::now()
}
