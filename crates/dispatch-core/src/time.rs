use chrono::{DateTime, Utc};

/// ISO-8601 instant as stored in `created_at` / `updated_at`.
pub type Timestamp = DateTime<Utc>;

pub fn now() -> Timestamp {
    Utc::now()
}
