use super::types::Perspective;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable naming the UCI engine executable.
pub const ENGINE_ENV: &str = "CHESS_ENGINE";
pub const DEFAULT_ENGINE: &str = "stockfish";

pub const DEFAULT_SPLIT_PREFIX: &str = "chess_db";
pub const DEFAULT_COMBINED_PATH: &str = "chess_db.db";

/// Search depth used by the single-position `eval` command.
pub const EVAL_DEPTH: u32 = 8;

pub const PROGRESS_INTERVAL: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl EngineConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// `CHESS_ENGINE` if set and non-empty, otherwise `stockfish` from `PATH`.
    pub fn from_env() -> Self {
        Self::from_env_value(env::var_os(ENGINE_ENV))
    }

    fn from_env_value(value: Option<OsString>) -> Self {
        match value {
            Some(program) if !program.is_empty() => Self::new(program),
            _ => Self::new(DEFAULT_ENGINE),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE)
    }
}

/// Where labeled positions go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLayout {
    /// Every position in one dataset file.
    Combined { path: PathBuf },
    /// Positions routed by side to move in the resulting position.
    Split { white: PathBuf, black: PathBuf },
}

impl OutputLayout {
    pub fn split_with_prefix(prefix: impl AsRef<Path>) -> Self {
        let with_suffix = |suffix: &str| {
            let mut name = prefix.as_ref().as_os_str().to_owned();
            name.push(suffix);
            PathBuf::from(name)
        };

        Self::Split {
            white: with_suffix("_white.db"),
            black: with_suffix("_black.db"),
        }
    }
}

/// Everything a dataset build needs, fixed before the pipeline starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetConfig {
    pub max_games: usize,
    pub depth: u32,
    pub perspective: Perspective,
    pub layout: OutputLayout,
    pub engine: EngineConfig,
    pub progress_interval: usize,
}

impl DatasetConfig {
    pub const SPLIT_MAX_GAMES: usize = 10_000;
    pub const SPLIT_DEPTH: u32 = 10;
    pub const COMBINED_MAX_GAMES: usize = 5_000;
    pub const COMBINED_DEPTH: u32 = 8;

    /// Two tables, White and Black to move, labeled from White's side.
    pub fn split(prefix: impl AsRef<Path>) -> Self {
        Self {
            max_games: Self::SPLIT_MAX_GAMES,
            depth: Self::SPLIT_DEPTH,
            perspective: Perspective::White,
            layout: OutputLayout::split_with_prefix(prefix),
            engine: EngineConfig::from_env(),
            progress_interval: PROGRESS_INTERVAL,
        }
    }

    /// One table holding every position.
    pub fn combined(path: impl Into<PathBuf>) -> Self {
        Self {
            max_games: Self::COMBINED_MAX_GAMES,
            depth: Self::COMBINED_DEPTH,
            perspective: Perspective::White,
            layout: OutputLayout::Combined { path: path.into() },
            engine: EngineConfig::from_env(),
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}
