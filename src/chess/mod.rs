pub mod config;
pub mod dataset;
pub mod error;
pub mod label;
pub mod log;
pub mod oracle;
pub mod pipeline;
pub mod reader;
pub mod replay;
pub mod shuffle;
pub mod types;
pub mod visitor;

pub use error::ErrorAccumulator;
