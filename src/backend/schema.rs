//! Database schema definitions

/// SQL to create the durable tier table
pub const CREATE_DURABLE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS durable_entries (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
"#;

/// SQL to create the session tier table
pub const CREATE_SESSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS session_entries (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
"#;

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![CREATE_DURABLE_TABLE, CREATE_SESSION_TABLE]
}
