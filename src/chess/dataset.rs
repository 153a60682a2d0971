use super::error::{Error, Result};

use duckdb::{Connection, params};
use std::io;
use std::path::{Path, PathBuf};

/// Table holding the labeled positions in every dataset file.
pub const TABLE_NAME: &str = "positions";

const CREATE_TABLE_SQL: &str =
    "CREATE TABLE IF NOT EXISTS positions (fen VARCHAR PRIMARY KEY, evaluation DOUBLE)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The key existed; the stored label was left untouched.
    AlreadyPresent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub fen: String,
    pub evaluation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableStats {
    pub rows: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

/// One dataset file and its `positions` table.
///
/// Inserts accumulate in an open transaction until `checkpoint` or
/// `finalize`; dropping the table without either discards them.
pub struct DatasetTable {
    conn: Connection,
    path: Option<PathBuf>,
    in_transaction: bool,
}

impl DatasetTable {
    /// Opens or creates the dataset at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, Some(path.to_path_buf()))
    }

    /// Opens a dataset that must already exist.
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Open {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "dataset does not exist"),
            });
        }
        Self::open(path)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch(CREATE_TABLE_SQL)?;
        Ok(Self {
            conn,
            path,
            in_transaction: false,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn begin(&mut self) -> Result<()> {
        if !self.in_transaction {
            self.conn.execute_batch("BEGIN TRANSACTION")?;
            self.in_transaction = true;
        }
        Ok(())
    }

    /// Adds a row unless `fen` is already a key. First write wins.
    pub fn insert(&mut self, fen: &str, evaluation: f64) -> Result<InsertOutcome> {
        self.begin()?;

        if self.contains(fen)? {
            return Ok(InsertOutcome::AlreadyPresent);
        }

        self.conn.execute(
            "INSERT INTO positions (fen, evaluation) VALUES (?, ?)",
            params![fen, evaluation],
        )?;
        Ok(InsertOutcome::Inserted)
    }

    pub fn contains(&self, fen: &str) -> Result<bool> {
        Ok(self.evaluation(fen)?.is_some())
    }

    pub fn evaluation(&self, fen: &str) -> Result<Option<f64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT evaluation FROM positions WHERE fen = ?")?;
        let mut rows = stmt.query(params![fen])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Commits pending inserts and keeps the table open.
    pub fn checkpoint(&mut self) -> Result<()> {
        if self.in_transaction {
            self.conn.execute_batch("COMMIT")?;
            self.in_transaction = false;
        }
        Ok(())
    }

    /// Commits pending inserts and closes the file.
    pub fn finalize(mut self) -> Result<()> {
        self.checkpoint()?;
        if let Some(path) = self.path() {
            log::info!("Closing dataset '{}'", path.display());
        }
        self.conn.close().map_err(|(_, err)| Error::Database(err))
    }

    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM positions", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Every row in scan order.
    pub fn rows(&self) -> Result<Vec<Row>> {
        let mut stmt = self.conn.prepare("SELECT fen, evaluation FROM positions")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Row {
                    fen: row.get(0)?,
                    evaluation: row.get(1)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn stats(&self) -> Result<TableStats> {
        let stats = self.conn.query_row(
            "SELECT COUNT(*), MIN(evaluation), MAX(evaluation), AVG(evaluation) FROM positions",
            [],
            |row| {
                let rows: i64 = row.get(0)?;
                Ok(TableStats {
                    rows: usize::try_from(rows).unwrap_or_default(),
                    min: row.get(1)?,
                    max: row.get(2)?,
                    mean: row.get(3)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// Deletes every row, then appends `rows` in the given order.
    ///
    /// Not atomic: the delete is committed before the first append, so an
    /// interruption leaves the table empty or partially filled.
    pub fn rewrite(&mut self, rows: &[Row]) -> Result<()> {
        self.checkpoint()?;
        self.conn.execute("DELETE FROM positions", [])?;

        let mut appender = self.conn.appender(TABLE_NAME)?;
        for row in rows {
            appender.append_row(params![row.fen.as_str(), row.evaluation])?;
        }
        appender.flush()?;
        Ok(())
    }
}
