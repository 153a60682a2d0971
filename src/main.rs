use chess_dataset::chess::config::{
    DEFAULT_COMBINED_PATH, DEFAULT_SPLIT_PREFIX, EVAL_DEPTH, EngineConfig,
};
use chess_dataset::chess::dataset::DatasetTable;
use chess_dataset::chess::pipeline::DatasetSink;
use chess_dataset::chess::reader::{GameStream, expand_sources};
use chess_dataset::chess::replay::{fen_string, position_from_fen};
use chess_dataset::chess::{log as logging, shuffle};
use chess_dataset::{
    DatasetConfig, Evaluator, Perspective, Pipeline, Result, UciEngine, normalize,
};

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use log::{error, info};
use shakmaty::Position;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "chess-dataset",
    version,
    about = "Label chess positions from PGN games with a UCI engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Label up to 10000 games at depth 10 into <prefix>_white.db and <prefix>_black.db
    Build {
        /// PGN file or glob pattern (.zst files are decompressed)
        source: String,
        output_prefix: Option<PathBuf>,
    },
    /// Label up to 5000 games at depth 8 into a single dataset
    BuildCombined {
        /// PGN file or glob pattern (.zst files are decompressed)
        source: String,
        output: Option<PathBuf>,
    },
    /// Randomly reorder the rows of a dataset in place
    Shuffle { dataset: PathBuf },
    /// Print the labels of one position from White's and Black's side
    Eval { fen: String },
    /// Print row count and label range of a dataset
    Info { dataset: PathBuf },
}

fn main() -> ExitCode {
    logging::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return usage(err),
    };

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Bad arguments are reported but still exit with status 0.
fn usage(err: clap::Error) -> ExitCode {
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            let _ = err.print();
        }
        _ => {
            println!("Invalid number of arguments!");
            println!("{}", Cli::command().render_usage());
        }
    }
    ExitCode::SUCCESS
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Build {
            source,
            output_prefix,
        } => {
            let prefix = output_prefix.unwrap_or_else(|| PathBuf::from(DEFAULT_SPLIT_PREFIX));
            build(&source, DatasetConfig::split(prefix))
        }
        Commands::BuildCombined { source, output } => {
            let path = output.unwrap_or_else(|| PathBuf::from(DEFAULT_COMBINED_PATH));
            build(&source, DatasetConfig::combined(path))
        }
        Commands::Shuffle { dataset } => {
            let rows = shuffle::shuffle_dataset(&dataset)?;
            info!("Shuffled {rows} rows of '{}'", dataset.display());
            Ok(())
        }
        Commands::Eval { fen } => eval(&fen),
        Commands::Info { dataset } => dataset_info(&dataset),
    }
}

fn build(source: &str, config: DatasetConfig) -> Result<()> {
    let games = GameStream::new(expand_sources(source)?);
    let sink = DatasetSink::open(&config.layout)?;
    let engine = UciEngine::spawn(&config.engine)?;

    info!(
        "Labeling up to {} games from '{}' at depth {} with {}",
        config.max_games,
        source,
        config.depth,
        engine.name().unwrap_or("engine")
    );

    let stats = Pipeline::new(config, engine, sink).run(games)?;

    info!("Database finished...");
    info!(
        "{} games ({} aborted), {} positions, {} new rows, {} duplicates",
        stats.games, stats.games_aborted, stats.positions, stats.inserted, stats.duplicates
    );
    Ok(())
}

fn eval(fen: &str) -> Result<()> {
    let pos = position_from_fen(fen)?;
    let fen = fen_string(&pos);

    let mut engine = UciEngine::spawn(&EngineConfig::from_env())?;
    let raw = engine.evaluate(&fen, EVAL_DEPTH)?;

    let white = normalize(raw.for_perspective(pos.turn(), Perspective::White));
    let black = normalize(raw.for_perspective(pos.turn(), Perspective::Black));
    println!("{white}");
    println!("{black}");
    Ok(())
}

fn dataset_info(path: &Path) -> Result<()> {
    let table = DatasetTable::open_existing(path)?;
    let stats = table.stats()?;

    println!("rows: {}", stats.rows);
    if let (Some(min), Some(max), Some(mean)) = (stats.min, stats.max, stats.mean) {
        println!("evaluation: min {min:.2}, max {max:.2}, mean {mean:.3}");
    }
    Ok(())
}
