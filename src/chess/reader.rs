use super::error::{Error, Result};
use super::types::Game;
use super::visitor::GameVisitor;

use pgn_reader::Reader;
use std::collections::VecDeque;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zstd::stream::read::Decoder as ZstdDecoder;

pub type PgnInput = Box<dyn Read + Send>;

/// Expands a source argument into the files to read.
///
/// Patterns containing `*` or `?` go through `glob` and must match at least
/// one file; anything else is taken as a literal path.
pub fn expand_sources(pattern: &str) -> Result<Vec<PathBuf>> {
    if pattern.contains('*') || pattern.contains('?') {
        let mut paths: Vec<PathBuf> = glob::glob(pattern)?
            .filter_map(|entry| entry.ok())
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(Error::NoInput(pattern.to_string()));
        }
        Ok(paths)
    } else {
        Ok(vec![PathBuf::from(pattern)])
    }
}

fn is_zstd(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("zst"))
}

/// Opens a PGN file, decompressing `.zst` files on the fly.
///
/// No `BufReader` on top: pgn-reader buffers internally.
pub fn open_input_stream(path: &Path) -> Result<PgnInput> {
    let file = File::open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;

    if is_zstd(path) {
        let decoder = ZstdDecoder::new(file).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Box::new(decoder))
    } else {
        Ok(Box::new(file))
    }
}

struct PgnReaderState {
    pgn_reader: Reader<PgnInput>,
    source: String,
}

/// Lazy sequence of games over one or more PGN sources.
///
/// Yields `Err` for I/O failures; the reader that failed is abandoned and the
/// stream moves on to the next file. Only restartable by building a new
/// stream.
pub struct GameStream {
    pending: VecDeque<PathBuf>,
    single_source: bool,
    current: Option<PgnReaderState>,
    visitor: GameVisitor,
    next_game_index: usize,
}

impl GameStream {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            single_source: paths.len() == 1,
            pending: paths.into(),
            current: None,
            visitor: GameVisitor::new(),
            next_game_index: 1,
        }
    }

    /// Stream over an already opened input.
    pub fn from_input(input: PgnInput, source: impl Into<String>) -> Self {
        Self {
            pending: VecDeque::new(),
            single_source: true,
            current: Some(PgnReaderState {
                pgn_reader: Reader::new(input),
                source: source.into(),
            }),
            visitor: GameVisitor::new(),
            next_game_index: 1,
        }
    }

    /// Next reader to pull from. With several sources an unopenable file is
    /// logged and skipped; with a single source it is an error.
    fn acquire_reader(&mut self) -> Result<bool> {
        while self.current.is_none() {
            let Some(path) = self.pending.pop_front() else {
                return Ok(false);
            };

            match open_input_stream(&path) {
                Ok(input) => {
                    log::debug!("Reading games from '{}'", path.display());
                    self.current = Some(PgnReaderState {
                        pgn_reader: Reader::new(input),
                        source: path.display().to_string(),
                    });
                }
                Err(err) if !self.single_source => log::warn!("{err}"),
                Err(err) => return Err(err),
            }
        }

        Ok(true)
    }
}

impl Iterator for GameStream {
    type Item = Result<Game>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let game_index = self.next_game_index;
            match self.acquire_reader() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(err) => return Some(Err(err)),
            }
            let Some(reader) = self.current.as_mut() else {
                return None;
            };

            match reader.pgn_reader.read_game(&mut self.visitor) {
                Ok(Some(mut game)) => {
                    self.next_game_index += 1;
                    game.index = game_index;
                    return Some(Ok(game));
                }
                Ok(None) => {
                    self.current = None;
                }
                Err(error) => {
                    log::warn!(
                        "Parser-stage error: stage=read_game; file='{}'; game_index={}; error={}",
                        reader.source,
                        game_index,
                        error
                    );
                    self.current = None;
                    return Some(Err(Error::Io(error)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;

    const TWO_GAMES: &str = r#"[Event "One"]
1. e4 e5 1-0

[Event "Two"]
1. d4 d5 2. c4 0-1
"#;

    fn stream_of(pgn: &'static str) -> GameStream {
        GameStream::from_input(Box::new(Cursor::new(pgn.as_bytes())), "memory")
    }

    #[test]
    fn test_stream_yields_each_game_then_ends() {
        let games: Vec<Game> = stream_of(TWO_GAMES).map(|g| g.unwrap()).collect();

        assert_eq!(games.len(), 2);
        assert_eq!(games[0].index, 1);
        assert_eq!(games[0].moves.len(), 2);
        assert_eq!(games[1].index, 2);
        assert_eq!(games[1].moves.len(), 3);
    }

    #[test]
    fn test_stream_empty_input() {
        assert_eq!(stream_of("").count(), 0);
    }

    #[test]
    fn test_expand_sources_literal_path() {
        let paths = expand_sources("games/lichess.pgn").unwrap();
        assert_eq!(paths, vec![PathBuf::from("games/lichess.pgn")]);
    }

    #[test]
    fn test_expand_sources_glob_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.pgn"), "1. d4 *\n").unwrap();
        fs::write(dir.path().join("a.pgn"), "1. e4 *\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let pattern = format!("{}/*.pgn", dir.path().display());
        let paths = expand_sources(&pattern).unwrap();

        assert_eq!(
            paths,
            vec![dir.path().join("a.pgn"), dir.path().join("b.pgn")]
        );
    }

    #[test]
    fn test_expand_sources_glob_without_matches() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.pgn", dir.path().display());

        assert!(matches!(expand_sources(&pattern), Err(Error::NoInput(_))));
    }

    #[test]
    fn test_stream_over_multiple_files_numbers_games_globally() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.pgn"), TWO_GAMES).unwrap();
        fs::write(dir.path().join("b.pgn"), "1. c4 *\n").unwrap();

        let stream = GameStream::new(vec![dir.path().join("a.pgn"), dir.path().join("b.pgn")]);
        let indexes: Vec<usize> = stream.map(|g| g.unwrap().index).collect();

        assert_eq!(indexes, vec![1, 2, 3]);
    }

    #[test]
    fn test_stream_skips_missing_file_among_several() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.pgn"), "1. e4 *\n").unwrap();

        let stream = GameStream::new(vec![
            dir.path().join("missing.pgn"),
            dir.path().join("a.pgn"),
        ]);
        let games: Vec<Game> = stream.map(|g| g.unwrap()).collect();

        assert_eq!(games.len(), 1);
    }

    #[test]
    fn test_stream_missing_single_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut stream = GameStream::new(vec![dir.path().join("missing.pgn")]);

        assert!(matches!(stream.next(), Some(Err(Error::Open { .. }))));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_stream_reads_zstd_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("games.pgn.zst");
        let compressed = zstd::stream::encode_all(TWO_GAMES.as_bytes(), 3).unwrap();
        fs::write(&path, compressed).unwrap();

        let games: Vec<Game> = GameStream::new(vec![path]).map(|g| g.unwrap()).collect();

        assert_eq!(games.len(), 2);
        assert_eq!(games[1].moves[2].to_string(), "c4");
    }
}
