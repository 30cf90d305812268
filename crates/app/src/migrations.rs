//! Embedded schema migrations
//!
//! Migrations are applied in name order and recorded in a `migrations` table
//! (`id`, `migration`, `batch`). Each `migrate` call that applies anything gets
//! the next batch number; re-running against an up-to-date schema is a no-op.

use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::db::Database;
use crate::{Error, Result};

/// A single named schema change
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub name: &'static str,
    pub sql: &'static str,
}

macro_rules! migration {
    ($name:literal) => {
        Migration {
            name: $name,
            sql: include_str!(concat!("../migrations/", $name, ".sql")),
        }
    };
}

/// All migrations shipped with the harness, in application order
pub const MIGRATIONS: &[Migration] = &[
    migration!("2015_11_23_074600_create_users_table"),
    migration!("2015_11_23_074709_create_artists_and_albums_tables"),
    migration!("2015_11_23_074723_create_songs_table"),
    migration!("2015_11_23_074733_create_playlists_tables"),
    migration!("2015_11_23_082854_create_interactions_table"),
    migration!("2015_12_22_092542_create_settings_table"),
];

/// Applies pending migrations to a database
pub struct Migrator<'a> {
    db: &'a Database,
    migrations: &'a [Migration],
}

impl<'a> Migrator<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self::with_migrations(db, MIGRATIONS)
    }

    pub fn with_migrations(db: &'a Database, migrations: &'a [Migration]) -> Self {
        Self { db, migrations }
    }

    /// Run every migration not yet recorded. Returns the names applied.
    pub fn run(&self) -> Result<Vec<&'static str>> {
        let conn = self.db.connection();
        let mut conn = conn.lock();

        ensure_repository(&conn)?;
        let batch = next_batch(&conn)?;

        let mut applied = Vec::new();
        for migration in self.migrations {
            if has_ran(&conn, migration.name)? {
                debug!("Skipping migration {} (already ran)", migration.name);
                continue;
            }

            let tx = conn.transaction()?;
            tx.execute_batch(migration.sql).map_err(|source| Error::Migration {
                name: migration.name.to_string(),
                source,
            })?;
            tx.execute(
                "INSERT INTO migrations (migration, batch) VALUES (?1, ?2)",
                params![migration.name, batch],
            )?;
            tx.commit()?;

            info!("Migrated: {}", migration.name);
            applied.push(migration.name);
        }

        if applied.is_empty() {
            info!("Nothing to migrate");
        }
        Ok(applied)
    }

    /// Names of migrations already recorded, in the order they ran
    pub fn ran(&self) -> Result<Vec<String>> {
        let conn = self.db.connection();
        let conn = conn.lock();
        ensure_repository(&conn)?;

        let mut stmt = conn.prepare("SELECT migration FROM migrations ORDER BY id")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }
}

fn ensure_repository(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            migration TEXT NOT NULL,
            batch INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn next_batch(conn: &Connection) -> Result<i64> {
    let last: Option<i64> =
        conn.query_row("SELECT MAX(batch) FROM migrations", [], |row| row.get(0))?;
    Ok(last.unwrap_or(0) + 1)
}

fn has_ran(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM migrations WHERE migration = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
