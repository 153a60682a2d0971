use super::dataset::DatasetTable;
use super::error::Result;

use rand::Rng;
use rand::seq::SliceRandom;
use std::path::Path;

/// Rewrites the table with its rows in a uniformly random order.
///
/// Loads the whole table into memory, shuffles (Fisher-Yates), deletes every
/// row and appends them back. The set of rows is unchanged. Returns the
/// number of rows written.
pub fn shuffle_table<R: Rng + ?Sized>(table: &mut DatasetTable, rng: &mut R) -> Result<usize> {
    let mut rows = table.rows()?;
    rows.shuffle(rng);
    table.rewrite(&rows)?;
    Ok(rows.len())
}

/// Shuffles the dataset file at `path` with a thread-local RNG.
pub fn shuffle_dataset(path: &Path) -> Result<usize> {
    let mut table = DatasetTable::open_existing(path)?;
    let rows = shuffle_table(&mut table, &mut rand::rng())?;
    table.finalize()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::dataset::Row;
    use crate::chess::replay::Replayer;
    use crate::chess::types::Game;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use shakmaty::san::SanPlus;

    /// Distinct positions from a short opening line.
    fn fill(table: &mut DatasetTable) -> Vec<Row> {
        let game = Game {
            index: 1,
            start_fen: None,
            moves: ["e4", "e5", "Nf3", "Nc6", "Bb5", "a6", "Ba4", "Nf6", "O-O", "Be7"]
                .iter()
                .map(|m| m.parse::<SanPlus>().unwrap())
                .collect(),
        };

        for (i, step) in Replayer::new(&game).unwrap().enumerate() {
            table.insert(&step.unwrap().fen, i as f64 / 4.0).unwrap();
        }
        table.checkpoint().unwrap();
        table.rows().unwrap()
    }

    fn sorted(mut rows: Vec<Row>) -> Vec<Row> {
        rows.sort_by(|a, b| a.fen.cmp(&b.fen));
        rows
    }

    #[test]
    fn test_shuffle_preserves_rows() {
        let mut table = DatasetTable::open_in_memory().unwrap();
        let before = fill(&mut table);

        let written = shuffle_table(&mut table, &mut StdRng::seed_from_u64(7)).unwrap();
        let after = table.rows().unwrap();

        assert_eq!(written, before.len());
        assert_eq!(sorted(after), sorted(before));
    }

    #[test]
    fn test_shuffle_changes_order() {
        let mut table = DatasetTable::open_in_memory().unwrap();
        let before = fill(&mut table);

        // 10! orderings; every seed below leaving the order intact is implausible.
        let mut changed = false;
        for seed in 0..4 {
            shuffle_table(&mut table, &mut StdRng::seed_from_u64(seed)).unwrap();
            changed |= table.rows().unwrap() != before;
        }
        assert!(changed);
    }

    #[test]
    fn test_shuffle_empty_table() {
        let mut table = DatasetTable::open_in_memory().unwrap();
        let written = shuffle_table(&mut table, &mut StdRng::seed_from_u64(1)).unwrap();

        assert_eq!(written, 0);
        assert!(table.is_empty().unwrap());
    }

    #[test]
    fn test_shuffle_dataset_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chess_db_white.db");

        let mut table = DatasetTable::open(&path).unwrap();
        let before = fill(&mut table);
        table.finalize().unwrap();

        assert_eq!(shuffle_dataset(&path).unwrap(), before.len());

        let reopened = DatasetTable::open(&path).unwrap();
        assert_eq!(sorted(reopened.rows().unwrap()), sorted(before));
    }

    #[test]
    fn test_shuffle_missing_dataset() {
        let dir = tempfile::tempdir().unwrap();
        assert!(shuffle_dataset(&dir.path().join("nope.db")).is_err());
        assert!(!dir.path().join("nope.db").exists());
    }
}
