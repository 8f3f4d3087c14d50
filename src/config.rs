use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub kgrag: KgragConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub traversal: TraversalLimits,
}

/// Locations of the graph database and the domain configuration
#[derive(Debug, Clone, Deserialize)]
pub struct KgragConfig {
    pub db_path: PathBuf,
    /// Domain config (JSON or YAML): intent patterns and relationship templates
    pub domain_config: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Entry-node resolution settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Node properties compared against query phrases; the first is used for fuzzy matching
    pub search_properties: Vec<String>,
    /// Restrict lookups to these labels; empty searches every label
    pub node_labels: Vec<String>,
    /// Domain words to ignore in addition to the built-in English stop-words
    pub extra_stop_words: Vec<String>,
    pub fuzzy_enabled: bool,
    pub fuzzy_threshold: f64,
    /// Row cap for exact and partial lookups
    pub lookup_limit: usize,
    /// Row cap for the length-window prefetch of the fuzzy stage
    pub fuzzy_candidate_limit: usize,
    pub fuzzy_top_k: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            search_properties: vec!["name".to_string()],
            node_labels: Vec::new(),
            extra_stop_words: Vec::new(),
            fuzzy_enabled: true,
            fuzzy_threshold: 0.85,
            lookup_limit: 10,
            fuzzy_candidate_limit: 200,
            fuzzy_top_k: 5,
        }
    }
}

/// Row and path caps applied by the traversal strategies
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TraversalLimits {
    pub targeted_row_limit: usize,
    pub chained_path_limit: usize,
    pub variable_hop_path_limit: usize,
    pub shortest_path_limit: usize,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self {
            targeted_row_limit: 50,
            chained_path_limit: 100,
            variable_hop_path_limit: 60,
            shortest_path_limit: 20,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in KGRAG_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("KGRAG_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        Self::from_path(&config_path)
    }

    /// Load and validate a specific config file
    pub fn from_path(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.kgrag.domain_config.is_file() {
            anyhow::bail!(
                "domain_config does not exist: {}. Set domain_config in config.toml to your intent pattern file.",
                self.kgrag.domain_config.display()
            );
        }

        if self.kgrag.log_level.trim().is_empty() {
            anyhow::bail!("log_level must be a level or env_logger filter, e.g. \"info\"");
        }

        self.resolver.validate()?;
        self.traversal.validate()?;

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.kgrag.db_path
    }

    /// Get the domain config path
    pub fn domain_config(&self) -> &Path {
        &self.kgrag.domain_config
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.search_properties.is_empty() {
            anyhow::bail!("resolver.search_properties must name at least one property");
        }

        if let Some(bad) = self
            .search_properties
            .iter()
            .find(|p| p.trim().is_empty() || p.contains('"'))
        {
            anyhow::bail!("resolver.search_properties contains an invalid property name: {:?}", bad);
        }

        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            anyhow::bail!("resolver.fuzzy_threshold must be between 0.0 and 1.0");
        }

        if self.lookup_limit == 0 || self.fuzzy_candidate_limit == 0 || self.fuzzy_top_k == 0 {
            anyhow::bail!("resolver limits must be greater than 0");
        }

        Ok(())
    }
}

impl TraversalLimits {
    pub fn validate(&self) -> Result<()> {
        if self.targeted_row_limit == 0
            || self.chained_path_limit == 0
            || self.variable_hop_path_limit == 0
            || self.shortest_path_limit == 0
        {
            anyhow::bail!("traversal limits must be greater than 0");
        }
        Ok(())
    }
}
