use clap::Parser;
use kgrag::Config;
use kgrag::db::Db;
use kgrag::domain::DomainConfig;
use kgrag::{Pipeline, SqliteGraphStore};
use anyhow::{Context, Result};

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Retrieve knowledge-graph context for a natural-language question")]
struct Args {
    /// The question to answer
    query: String,

    /// Force an intent instead of classifying the query
    #[arg(long)]
    intent: Option<String>,

    /// Print the retrieval (entry nodes, subgraph, context) as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.kgrag.log_level.as_str())
    ).init();

    if args.query.trim().is_empty() {
        anyhow::bail!("Query cannot be empty");
    }

    let domain = DomainConfig::from_path(config.domain_config())
        .with_context(|| format!("Failed to load {}", config.domain_config().display()))?;

    let store = SqliteGraphStore::new(Db::new(config.db_path()));
    let pipeline = Pipeline::new(store, domain, config.resolver.clone(), config.traversal);

    let retrieval = pipeline
        .retrieve_as(&args.query, args.intent.as_deref())
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&retrieval)?);
        return Ok(());
    }

    println!("Intent: {}", retrieval.intent);
    println!(
        "Entry nodes: {}",
        retrieval
            .entry_nodes
            .iter()
            .map(|n| format!("{} [{}]", n.name, n.label))
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("\n{}", retrieval.context);
    Ok(())
}
