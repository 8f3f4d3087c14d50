//! File-based schema migrations for the graph database.
//!
//! Files in the migrations directory are named `NNN_description.sql` and
//! applied in version order, each inside its own transaction. Applied
//! migrations are recorded in `schema_migrations` and skipped on later runs.

use rusqlite::{Connection, params};
use std::fs;
use std::path::Path;
use crate::error::{Result, KgragError};

struct Migration {
    version: u32,
    name: String,
    sql: String,
}

fn ensure_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Names of applied migrations, oldest first
pub fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY version")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(names)
}

/// Parse "003_add_indexes.sql" into (3, "003_add_indexes")
fn parse_migration_filename(filename: &str) -> Result<(u32, String)> {
    let stem = filename
        .strip_suffix(".sql")
        .ok_or_else(|| KgragError::Config(format!("Invalid migration filename: {}", filename)))?;
    let version_str = stem.split('_').next().unwrap_or_default();
    let version = version_str
        .parse()
        .map_err(|_| KgragError::Config(format!("Invalid migration version: {}", version_str)))?;
    Ok((version, stem.to_string()))
}

fn load_migrations(migrations_dir: &Path) -> Result<Vec<Migration>> {
    let mut migrations = Vec::new();

    for entry in fs::read_dir(migrations_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) != Some("sql") {
            continue;
        }
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| KgragError::Config("Invalid migration filename".to_string()))?;
        let (version, name) = parse_migration_filename(filename)?;
        let sql = fs::read_to_string(&path)?;
        migrations.push(Migration { version, name, sql });
    }

    migrations.sort_by_key(|m| m.version);

    if let Some(pair) = migrations.windows(2).find(|w| w[0].version == w[1].version) {
        return Err(KgragError::Config(format!(
            "Duplicate migration version {}: {} and {}",
            pair[0].version, pair[0].name, pair[1].name
        )));
    }

    Ok(migrations)
}

/// Apply every migration in `migrations_dir` that has not been applied yet
pub fn run_migrations(conn: &mut Connection, migrations_dir: &Path) -> Result<()> {
    ensure_migrations_table(conn)?;

    let applied = get_applied_migrations(conn)?;
    let pending: Vec<Migration> = load_migrations(migrations_dir)?
        .into_iter()
        .filter(|m| !applied.contains(&m.name))
        .collect();

    if pending.is_empty() {
        log::debug!("Graph schema up to date ({} migrations applied)", applied.len());
        return Ok(());
    }

    for migration in pending {
        log::info!("Applying migration: {} (version {})", migration.name, migration.version);

        let tx = conn.transaction()?;
        tx.execute_batch(&migration.sql).map_err(|e| {
            KgragError::Config(format!("Failed to execute migration {}: {}", migration.name, e))
        })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;
    }

    log::info!("All migrations completed");
    Ok(())
}
