/// Database primary key type (SQLite INTEGER PRIMARY KEY).
pub type DbId = i64;

/// Timestamp type used across all layers (persisted as UTC).
pub type Timestamp = chrono::DateTime<chrono::Utc>;
