use kgrag::Config;
use kgrag::db::{Db, migrate};
use kgrag::domain::DomainConfig;
use kgrag::error::KgragError;
use std::path::Path;
use anyhow::{Context, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // RUST_LOG wins over the configured log_level
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.kgrag.log_level.as_str())
    ).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "check-domain" => {
            check_domain_config(&config)?;
        }
        "verify" | _ => {
            // Default: verify database schema
            run_schema_verification(&config).await?;
        }
    }

    Ok(())
}

/// Load the domain config and report every intent and its pattern status
fn check_domain_config(config: &Config) -> Result<()> {
    let domain = DomainConfig::from_path(config.domain_config())
        .with_context(|| format!("Failed to load {}", config.domain_config().display()))?;

    for intent in domain.classifier.all_intents() {
        match domain.registry.get(intent) {
            Ok(Some(pattern)) => println!("  ✓ {:<24} {}", intent, pattern.kind()),
            Ok(None) => println!("  ? {:<24} general", intent),
            Err(e) => println!("  ✗ {:<24} {}", intent, e),
        }
    }

    let invalid = domain.registry.invalid_intents();
    if !invalid.is_empty() {
        anyhow::bail!("{} invalid traversal pattern(s): {}", invalid.len(), invalid.join(", "));
    }
    log::info!("✓ Domain config OK");
    Ok(())
}

/// Run database schema verification
async fn run_schema_verification(config: &Config) -> Result<()> {
    log::info!("Starting kgrag v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Configuration loaded successfully");
    log::info!("Database path: {}", config.db_path().display());
    log::info!("Domain config: {}", config.domain_config().display());

    let db = Db::new(config.db_path());

    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| {
        migrate::run_migrations(conn, migrations_dir)
    }).await?;

    log::info!("Database initialized successfully");

    verify_database_schema(&db).await?;

    Ok(())
}

/// Verify that all expected database objects exist and report graph size
async fn verify_database_schema(db: &Db) -> Result<()> {
    let (nodes, edges) = db.with_connection(|conn| {
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables: Vec<String> = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let expected_tables = ["graph_edges", "graph_nodes", "schema_migrations"];
        let mut all_tables_exist = true;

        for table in &expected_tables {
            if !tables.iter().any(|t| t == table) {
                log::error!("Missing table: {}", table);
                all_tables_exist = false;
            } else {
                log::debug!("✓ Table exists: {}", table);
            }
        }

        if !all_tables_exist {
            return Err(KgragError::Config("Not all required tables exist".to_string()));
        }

        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_graph_%' ORDER BY name")?;
        let indexes: Vec<String> = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        for index_name in ["idx_graph_edges_source", "idx_graph_edges_target", "idx_graph_nodes_label"] {
            if indexes.iter().any(|i| i == index_name) {
                log::debug!("✓ Index exists: {}", index_name);
            } else {
                log::warn!("Index not found: {} (traversals will scan)", index_name);
            }
        }

        let applied = migrate::get_applied_migrations(conn)?;
        log::debug!("✓ {} migrations applied", applied.len());

        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            return Err(KgragError::Config(format!("Journal mode is not WAL: {}", journal_mode)));
        }
        log::debug!("✓ Journal mode: WAL");

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(KgragError::Config(format!("Database integrity check failed: {}", integrity)));
        }
        log::info!("✓ Database integrity: OK");

        let nodes: i64 = conn.query_row("SELECT COUNT(*) FROM graph_nodes", [], |row| row.get(0))?;
        let edges: i64 = conn.query_row("SELECT COUNT(*) FROM graph_edges", [], |row| row.get(0))?;
        Ok((nodes, edges))
    }).await?;

    log::info!("✓ Graph contains {} nodes and {} relationships", nodes, edges);
    if nodes == 0 {
        log::warn!("Graph is empty. Load a graph document with the import binary.");
    }
    Ok(())
}
