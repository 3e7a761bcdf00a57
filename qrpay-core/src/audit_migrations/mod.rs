//! Audit database migrations - embedded SQL files
//!
//! Migrations are compiled into the binary with include_str!.
//! Each migration is a tuple of (name, sql_content), applied in order.

/// All audit migrations, embedded at compile time.
/// Format: (filename, sql_content)
///
/// When adding a migration, create NNN_description.sql and append it here.
pub const AUDIT_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_audit_events.sql", include_str!("001_audit_events.sql")),
];
