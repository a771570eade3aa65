//! Local store schema and well-known keys

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// Identity string of the signed-in patient
pub const KEY_USER_IDENTITY: &str = "userIdentity";

/// Email the patient signed in with
pub const KEY_USER_EMAIL: &str = "userEmail";

/// Whether the backend reported an existing patient profile
pub const KEY_PROFILE_COMPLETE: &str = "profileComplete";

/// Cached history for one identity
pub fn history_key(identity: &str) -> String {
    format!("symptomEntries:{identity}")
}
