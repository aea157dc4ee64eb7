//! Poll expiry. There is no background job closing polls; every read and
//! every vote evaluates this comparison against its own clock reading.

use chrono::{DateTime, Utc};

/// A poll without an expiry never closes. A poll is still open at the exact
/// instant of `expires_at`.
pub fn is_expired(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|expires_at| now > expires_at)
}
