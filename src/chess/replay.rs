use super::error::{Error, Result};
use super::types::Game;

use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position};

/// Position after one replayed move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayStep {
    /// 1-based ply within the game.
    pub ply: usize,
    pub fen: String,
    pub turn: Color,
}

/// Canonical FEN of a position; en passant squares only when a capture is legal.
pub fn fen_string(pos: &Chess) -> String {
    let fen = Fen::from_position(pos, EnPassantMode::Legal);
    fen.to_string()
}

pub fn position_from_fen(fen: &str) -> Result<Chess> {
    let invalid = |reason: String| Error::InvalidFen {
        fen: fen.to_string(),
        reason,
    };

    let parsed = Fen::from_ascii(fen.trim().as_bytes()).map_err(|e| invalid(e.to_string()))?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| invalid(e.to_string()))
}

/// Replays a game's mainline, yielding one `ReplayStep` per move.
///
/// An illegal move yields `Error::IllegalMove` once and ends the sequence.
pub struct Replayer<'a> {
    game: &'a Game,
    pos: Chess,
    ply: usize,
}

impl<'a> Replayer<'a> {
    pub fn new(game: &'a Game) -> Result<Self> {
        let pos = match &game.start_fen {
            Some(fen) => position_from_fen(fen)?,
            None => Chess::default(),
        };

        Ok(Self { game, pos, ply: 0 })
    }
}

impl Iterator for Replayer<'_> {
    type Item = Result<ReplayStep>;

    fn next(&mut self) -> Option<Self::Item> {
        let san = self.game.moves.get(self.ply)?;

        let m = match san.san.to_move(&self.pos) {
            Ok(m) => m,
            Err(_) => {
                let ply = self.ply + 1;
                self.ply = self.game.moves.len();
                return Some(Err(Error::IllegalMove {
                    ply,
                    san: san.to_string(),
                }));
            }
        };

        self.pos.play_unchecked(m);
        self.ply += 1;

        Some(Ok(ReplayStep {
            ply: self.ply,
            fen: fen_string(&self.pos),
            turn: self.pos.turn(),
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.game.moves.len() - self.ply))
    }
}
