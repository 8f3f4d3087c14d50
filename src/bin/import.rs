use clap::Parser;
use kgrag::Config;
use kgrag::db::{Db, migrate};
use kgrag::graph::{import_graph, GraphDocument};
use std::path::{Path, PathBuf};
use std::time::Instant;
use anyhow::{Context, Result};

#[derive(Parser, Debug)]
#[command(name = "import")]
#[command(about = "Load a graph document (JSON or YAML) into the kgrag database")]
struct Args {
    /// Graph document with `nodes` and `relationships`
    document: PathBuf,

    /// Database to write to (defaults to db_path from config.toml)
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // config.toml is optional when --db is given
    let config = Config::load();
    let log_level = config
        .as_ref()
        .map(|c| c.kgrag.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", log_level)
    ).init();

    let db_path = match args.db {
        Some(path) => path,
        None => config?.db_path().to_path_buf(),
    };
    let db = Db::new(&db_path);

    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| {
        migrate::run_migrations(conn, migrations_dir)
    }).await?;

    let document = GraphDocument::from_path(&args.document)
        .with_context(|| format!("Failed to read graph document {}", args.document.display()))?;
    log::info!(
        "Importing {} nodes and {} relationships from {}",
        document.nodes.len(),
        document.relationships.len(),
        args.document.display()
    );

    let start = Instant::now();
    let stats = import_graph(&db, document).await?;

    println!(
        "Imported {} nodes and {} new relationships into {} in {:.2?}",
        stats.nodes,
        stats.relationships,
        db_path.display(),
        start.elapsed()
    );
    Ok(())
}
