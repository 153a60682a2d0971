use super::config::{DatasetConfig, OutputLayout};
use super::dataset::{DatasetTable, InsertOutcome};
use super::error::{Error, ErrorAccumulator, Result};
use super::label::normalize;
use super::oracle::Evaluator;
use super::replay::{ReplayStep, Replayer};
use super::types::{Game, RunStats};

use shakmaty::Color;

/// Aborted games named in the end-of-run summary; the rest are only counted.
pub const ABORT_SUMMARY_LIMIT: usize = 10;

/// Destination tables of a build.
pub enum DatasetSink {
    Combined(DatasetTable),
    Split {
        white: DatasetTable,
        black: DatasetTable,
    },
}

impl DatasetSink {
    pub fn open(layout: &OutputLayout) -> Result<Self> {
        Ok(match layout {
            OutputLayout::Combined { path } => Self::Combined(DatasetTable::open(path)?),
            OutputLayout::Split { white, black } => Self::Split {
                white: DatasetTable::open(white)?,
                black: DatasetTable::open(black)?,
            },
        })
    }

    /// Table for a position with `turn` to move.
    fn table_for(&mut self, turn: Color) -> &mut DatasetTable {
        match self {
            Self::Combined(table) => table,
            Self::Split { white, .. } if turn == Color::White => white,
            Self::Split { black, .. } => black,
        }
    }

    pub fn insert(&mut self, fen: &str, turn: Color, label: f64) -> Result<InsertOutcome> {
        self.table_for(turn).insert(fen, label)
    }

    pub fn checkpoint(&mut self) -> Result<()> {
        match self {
            Self::Combined(table) => table.checkpoint(),
            Self::Split { white, black } => {
                white.checkpoint()?;
                black.checkpoint()
            }
        }
    }

    pub fn finalize(self) -> Result<()> {
        match self {
            Self::Combined(table) => table.finalize(),
            Self::Split { white, black } => {
                white.finalize()?;
                black.finalize()
            }
        }
    }
}

/// Decoder -> replayer -> oracle -> normalizer -> writer, one game at a time.
///
/// The oracle is owned for the whole run and released when the pipeline is
/// dropped, on success and on every error path alike.
pub struct Pipeline<E: Evaluator> {
    config: DatasetConfig,
    oracle: E,
    sink: DatasetSink,
    stats: RunStats,
    aborted: ErrorAccumulator,
}

impl<E: Evaluator> Pipeline<E> {
    pub fn new(config: DatasetConfig, oracle: E, sink: DatasetSink) -> Self {
        Self {
            config,
            oracle,
            sink,
            stats: RunStats::default(),
            aborted: ErrorAccumulator::default(),
        }
    }

    /// Processes games until the stream ends or `max_games` is reached, then
    /// commits and closes the dataset.
    pub fn run<I>(mut self, games: I) -> Result<RunStats>
    where
        I: IntoIterator<Item = Result<Game>>,
    {
        for game in games.into_iter().take(self.config.max_games) {
            let game = game?;
            self.process_game(&game)?;
            self.stats.games += 1;

            if self.config.progress_interval > 0
                && self.stats.games.is_multiple_of(self.config.progress_interval)
            {
                log::info!("Done {} games...", self.stats.games);
                self.sink.checkpoint()?;
            }
        }

        let Self {
            sink,
            stats,
            mut aborted,
            ..
        } = self;
        sink.finalize()?;

        let unlisted = stats.games_aborted.saturating_sub(aborted.len());
        if let Some(summary) = aborted.take() {
            if unlisted > 0 {
                log::warn!(
                    "{} games aborted: {}; and {} more",
                    stats.games_aborted,
                    summary,
                    unlisted
                );
            } else {
                log::warn!("{} games aborted: {}", stats.games_aborted, summary);
            }
        }
        Ok(stats)
    }

    fn process_game(&mut self, game: &Game) -> Result<()> {
        let replayer = match Replayer::new(game) {
            Ok(replayer) => replayer,
            Err(err) => return self.abort_game(game, err),
        };

        self.oracle.new_game()?;
        for step in replayer {
            match step {
                Ok(step) => self.label_position(&step)?,
                Err(err) => return self.abort_game(game, err),
            }
        }
        Ok(())
    }

    /// Game-local failures end the game; anything else ends the run.
    fn abort_game(&mut self, game: &Game, err: Error) -> Result<()> {
        if !err.is_game_local() {
            return Err(err);
        }

        log::debug!("Skipping rest of game {}: {}", game.index, err);
        if self.aborted.len() < ABORT_SUMMARY_LIMIT {
            self.aborted.push(&format!("game {}: {}", game.index, err));
        }
        self.stats.games_aborted += 1;
        Ok(())
    }

    fn label_position(&mut self, step: &ReplayStep) -> Result<()> {
        let raw = self.oracle.evaluate(&step.fen, self.config.depth)?;
        let label = normalize(raw.for_perspective(step.turn, self.config.perspective));

        match self.sink.insert(&step.fen, step.turn, label)? {
            InsertOutcome::Inserted => self.stats.inserted += 1,
            InsertOutcome::AlreadyPresent => self.stats.duplicates += 1,
        }
        self.stats.positions += 1;
        Ok(())
    }
}
