use shakmaty::Color;
use shakmaty::san::SanPlus;

/// One PGN record reduced to what replay needs: where the game starts and
/// its mainline.
#[derive(Debug, Clone, Default)]
pub struct Game {
    /// 1-based position of the record in the input stream.
    pub index: usize,
    /// Value of the `FEN` tag; `None` means the standard starting position.
    pub start_fen: Option<String>,
    pub moves: Vec<SanPlus>,
}

/// Score reported by the evaluation oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawScore {
    Centipawns(i32),
    /// Forced mate. `winning` is false when the evaluated side gets mated
    /// (including `mate 0`, i.e. already checkmated).
    Mate { moves: u32, winning: bool },
}

impl RawScore {
    pub fn flipped(self) -> Self {
        match self {
            Self::Centipawns(cp) => Self::Centipawns(-cp),
            Self::Mate { moves, winning } => Self::Mate {
                moves,
                winning: !winning,
            },
        }
    }

    /// Re-expresses a score the engine reported for `turn` (UCI scores are
    /// relative to the side to move) from the requested perspective.
    pub fn for_perspective(self, turn: Color, perspective: Perspective) -> Self {
        match perspective.color() {
            Some(color) if color != turn => self.flipped(),
            _ => self,
        }
    }
}

/// Reference side for evaluation labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Perspective {
    #[default]
    White,
    Black,
    SideToMove,
}

impl Perspective {
    fn color(self) -> Option<Color> {
        match self {
            Self::White => Some(Color::White),
            Self::Black => Some(Color::Black),
            Self::SideToMove => None,
        }
    }
}

/// Counters reported at the end of a dataset build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub games: usize,
    pub games_aborted: usize,
    pub positions: usize,
    pub inserted: usize,
    pub duplicates: usize,
}
