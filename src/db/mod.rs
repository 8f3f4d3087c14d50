use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tokio::task;
use crate::error::{Result, KgragError};

/// Handle to the SQLite file backing the property graph.
///
/// Holds only the path: every operation acquires its own connection and
/// releases it when the operation finishes, whichever way it exits.
#[derive(Debug, Clone)]
pub struct Db {
    path: PathBuf,
}

/// Open a connection with the pragmas every graph connection uses.
///
/// WAL mode lets readers run alongside an import; foreign keys keep edges
/// pointing at existing nodes; a 64MB page cache helps the repeated
/// adjacency lookups of path traversals.
fn open_with_pragmas(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).map_err(KgragError::Database)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL; \
         PRAGMA synchronous = NORMAL; \
         PRAGMA foreign_keys = ON; \
         PRAGMA temp_store = MEMORY; \
         PRAGMA cache_size = -65536;"
    )?;
    Ok(conn)
}

impl Db {
    /// Create a new database connection manager
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Path of the underlying database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Execute a closure with a database connection in a blocking task.
    ///
    /// The connection lives only for the duration of the closure.
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let mut conn = open_with_pragmas(&path)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| {
            KgragError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("database task failed: {}", e),
            ))
        })?
    }
}

pub mod migrate;
