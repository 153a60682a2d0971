pub mod chess;

pub use chess::{
    config::{DatasetConfig, EngineConfig, OutputLayout},
    dataset::{DatasetTable, InsertOutcome},
    error::{Error, Result},
    label::normalize,
    oracle::{Evaluator, UciEngine},
    pipeline::Pipeline,
    types::{Game, Perspective, RawScore, RunStats},
};
