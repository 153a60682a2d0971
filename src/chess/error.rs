use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to open file '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Illegal move at ply {ply}: {san}")]
    IllegalMove { ply: usize, san: String },

    #[error("Invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("No input files match '{0}'")]
    NoInput(String),
}

impl Error {
    /// Errors that end the current game but not the run.
    pub fn is_game_local(&self) -> bool {
        matches!(self, Self::IllegalMove { .. } | Self::InvalidFen { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Collects per-game diagnostics for the end-of-run summary.
#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulator {
    messages: Option<String>,
    count: usize,
}

impl ErrorAccumulator {
    pub fn push(&mut self, msg: &str) {
        match &mut self.messages {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(msg);
            }
            None => {
                self.messages = Some(msg.to_string());
            }
        }
        self.count += 1;
    }

    pub fn take(&mut self) -> Option<String> {
        self.count = 0;
        self.messages.take()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_none()
    }
}
