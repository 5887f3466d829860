pub const SCHEMA: &str = r#"
-- Key-value entries: one row per stored collection, setting, note or document
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

/// Additive migrations, each safe to re-run.
pub const MIGRATIONS: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_kv_updated_at ON kv(updated_at)",
];
