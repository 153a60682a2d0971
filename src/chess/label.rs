use super::types::RawScore;

/// Centipawn value standing in for any forced mate.
pub const MATE_SCORE_CP: i32 = 10_000;

/// Labels are clamped to `[-LABEL_LIMIT, LABEL_LIMIT]` pawns.
pub const LABEL_LIMIT: f64 = 25.0;

/// Converts an oracle score into a label in pawns.
///
/// Mates count as `±MATE_SCORE_CP`, everything is divided by 100 and clamped
/// to `[-25.0, 25.0]`. The sign follows whatever perspective `score` is
/// already expressed in.
pub fn normalize(score: RawScore) -> f64 {
    let centipawns = match score {
        RawScore::Centipawns(cp) => cp,
        RawScore::Mate { winning: true, .. } => MATE_SCORE_CP,
        RawScore::Mate { winning: false, .. } => -MATE_SCORE_CP,
    };

    clamp_label(f64::from(centipawns) / 100.0)
}

pub fn clamp_label(value: f64) -> f64 {
    (-LABEL_LIMIT).max(LABEL_LIMIT.min(value))
}
