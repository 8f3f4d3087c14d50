use thiserror::Error;

/// Main error type for kgrag
#[derive(Error, Debug)]
pub enum KgragError {
    /// Database-related errors (the graph store failed to run a query)
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors for stored properties and documents
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors: malformed traversal patterns, bad templates, bad settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Parse errors for domain config and graph documents
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using KgragError
pub type Result<T> = std::result::Result<T, KgragError>;
