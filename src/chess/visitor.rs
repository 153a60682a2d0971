use super::types::Game;

use pgn_reader::{RawTag, SanPlus, Skip, Visitor};
use std::ops::ControlFlow;

/// Streaming PGN visitor (pgn-reader).
///
/// Keeps the `FEN` tag and the mainline SANs; comments, NAGs and variations
/// are dropped. Legality is not checked here, that happens during replay.
#[derive(Debug, Default)]
pub struct GameVisitor;

impl GameVisitor {
    pub fn new() -> Self {
        Self
    }
}

impl Visitor for GameVisitor {
    type Tags = Option<String>;
    type Movetext = Game;
    type Output = Game;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(None)
    }

    fn tag(
        &mut self,
        start_fen: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        // First FEN tag wins, like every other duplicated header.
        if key == b"FEN" && start_fen.is_none() {
            let fen = String::from_utf8_lossy(value.as_bytes());
            let fen = fen.trim();
            if !fen.is_empty() {
                *start_fen = Some(fen.to_string());
            }
        }
        ControlFlow::Continue(())
    }

    fn begin_movetext(
        &mut self,
        start_fen: Self::Tags,
    ) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(Game {
            index: 0,
            start_fen,
            moves: Vec::with_capacity(128),
        })
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn san(&mut self, game: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        game.moves.push(san);
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, game: Self::Movetext) -> Self::Output {
        game
    }
}
