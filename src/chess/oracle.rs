use super::config::EngineConfig;
use super::error::{Error, Result};
use super::types::RawScore;

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Blocking position evaluator.
///
/// Scores are relative to the side to move in `fen`.
pub trait Evaluator {
    /// Called before the first position of each game.
    fn new_game(&mut self) -> Result<()> {
        Ok(())
    }

    fn evaluate(&mut self, fen: &str, depth: u32) -> Result<RawScore>;
}

impl<E: Evaluator + ?Sized> Evaluator for &mut E {
    fn new_game(&mut self) -> Result<()> {
        (**self).new_game()
    }

    fn evaluate(&mut self, fen: &str, depth: u32) -> Result<RawScore> {
        (**self).evaluate(fen, depth)
    }
}

const QUIT_GRACE: Duration = Duration::from_millis(500);

/// UCI engine running as a child process for the lifetime of this value.
///
/// Reads block without a timeout: an engine that stops answering stalls
/// the caller. Dropping the client sends `quit`, kills the process if it is
/// still alive after a short grace period, and reaps it.
pub struct UciEngine {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    name: Option<String>,
}

impl UciEngine {
    /// Spawns the engine and waits for `uciok` and `readyok`.
    pub fn spawn(config: &EngineConfig) -> Result<Self> {
        let mut child = Command::new(&config.program)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                Error::Engine(format!(
                    "Failed to spawn engine '{}': {e}",
                    config.program.display()
                ))
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::Engine("Failed to capture engine stdio".to_string()));
        };

        let mut engine = Self {
            child,
            stdin: BufWriter::new(stdin),
            stdout: BufReader::new(stdout),
            name: None,
        };

        engine.send("uci")?;
        loop {
            let line = engine.read_line()?;
            if let Some(name) = line.strip_prefix("id name ") {
                engine.name = Some(name.trim().to_string());
            } else if line.trim() == "uciok" {
                break;
            }
        }
        engine.sync()?;

        log::debug!(
            "Engine '{}' ready",
            engine.name.as_deref().unwrap_or("unknown")
        );
        Ok(engine)
    }

    /// Name from the engine's `id name` line.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn send(&mut self, cmd: &str) -> Result<()> {
        log::trace!(">> {cmd}");
        writeln!(self.stdin, "{cmd}")
            .and_then(|()| self.stdin.flush())
            .map_err(|e| Error::Engine(format!("Failed to write to engine: {e}")))
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .map_err(|e| Error::Engine(format!("Failed to read from engine: {e}")))?;
        if read == 0 {
            return Err(Error::Engine("Engine closed its output".to_string()));
        }

        let line = line.trim_end().to_string();
        log::trace!("<< {line}");
        Ok(line)
    }

    fn sync(&mut self) -> Result<()> {
        self.send("isready")?;
        while self.read_line()?.trim() != "readyok" {}
        Ok(())
    }
}

impl Evaluator for UciEngine {
    fn new_game(&mut self) -> Result<()> {
        self.send("ucinewgame")?;
        self.sync()
    }

    fn evaluate(&mut self, fen: &str, depth: u32) -> Result<RawScore> {
        self.send(&format!("position fen {fen}"))?;
        self.send(&format!("go depth {depth}"))?;

        let mut last = InfoScore::default();
        loop {
            let line = self.read_line()?;
            if line.starts_with("bestmove") {
                break;
            }
            last.update_from_line(&line);
        }

        last.best()
            .ok_or_else(|| Error::Engine(format!("No score reported for '{fen}'")))
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        let _ = self.send("quit");

        let deadline = Instant::now() + QUIT_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(10)),
                _ => break,
            }
        }

        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Latest scores seen in `info` lines of one search.
#[derive(Debug, Clone, Copy, Default)]
struct InfoScore {
    exact: Option<RawScore>,
    bound: Option<RawScore>,
}

impl InfoScore {
    fn update_from_line(&mut self, line: &str) {
        if let Some((score, is_bound)) = parse_info_score(line) {
            if is_bound {
                self.bound = Some(score);
            } else {
                self.exact = Some(score);
            }
        }
    }

    fn best(self) -> Option<RawScore> {
        self.exact.or(self.bound)
    }
}

/// Extracts `score cp <n>` / `score mate <n>` from an `info` line.
///
/// The flag is true for `lowerbound`/`upperbound` scores.
pub fn parse_info_score(line: &str) -> Option<(RawScore, bool)> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("info") {
        return None;
    }

    let tokens: Vec<&str> = tokens.collect();
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            // Free text until end of line.
            "string" => return None,
            "score" => {
                let kind = *tokens.get(i + 1)?;
                let value: i32 = tokens.get(i + 2)?.parse().ok()?;
                let score = match kind {
                    "cp" => RawScore::Centipawns(value),
                    "mate" => RawScore::Mate {
                        moves: value.unsigned_abs(),
                        winning: value > 0,
                    },
                    _ => return None,
                };
                let is_bound = matches!(
                    tokens.get(i + 3).copied(),
                    Some("lowerbound" | "upperbound")
                );
                return Some((score, is_bound));
            }
            _ => {}
        }
        i += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_centipawn_score() {
        let line = "info depth 10 seldepth 14 multipv 1 score cp 35 nodes 12000 nps 600000 pv e2e4";
        assert_eq!(
            parse_info_score(line),
            Some((RawScore::Centipawns(35), false))
        );
    }

    #[test]
    fn test_parse_negative_mate_score() {
        let line = "info depth 12 score mate -3 nodes 100 pv h7h6";
        assert_eq!(
            parse_info_score(line),
            Some((
                RawScore::Mate {
                    moves: 3,
                    winning: false
                },
                false
            ))
        );
    }

    #[test]
    fn test_parse_mate_zero_is_mated() {
        assert_eq!(
            parse_info_score("info depth 0 score mate 0"),
            Some((
                RawScore::Mate {
                    moves: 0,
                    winning: false
                },
                false
            ))
        );
    }

    #[test]
    fn test_parse_bound_score() {
        assert_eq!(
            parse_info_score("info depth 9 score cp -20 upperbound nodes 10"),
            Some((RawScore::Centipawns(-20), true))
        );
    }

    #[test]
    fn test_parse_ignores_lines_without_score() {
        assert_eq!(parse_info_score("info depth 3 currmove e2e4 currmovenumber 1"), None);
        assert_eq!(parse_info_score("info string score cp 100 from nnue"), None);
        assert_eq!(parse_info_score("bestmove e2e4 ponder e7e5"), None);
        assert_eq!(parse_info_score("info score cp"), None);
    }

    #[test]
    fn test_exact_score_preferred_over_later_bound() {
        let mut last = InfoScore::default();
        last.update_from_line("info depth 5 score cp 12");
        last.update_from_line("info depth 6 score cp 40 lowerbound");
        assert_eq!(last.best(), Some(RawScore::Centipawns(12)));

        last.update_from_line("info depth 6 score cp 44");
        assert_eq!(last.best(), Some(RawScore::Centipawns(44)));
    }

    #[test]
    fn test_spawn_missing_engine_fails() {
        let config = EngineConfig::new("/nonexistent/definitely-not-an-engine");
        assert!(matches!(UciEngine::spawn(&config), Err(Error::Engine(_))));
    }

    #[cfg(unix)]
    mod stub_engine {
        use super::*;

        const STUB: &str = r#"
while read -r line; do
  case "$line" in
    uci) echo "id name Stub Engine"; echo "uciok" ;;
    isready) echo "readyok" ;;
    "position fen"*) pos="$line" ;;
    "go depth"*)
      echo "info depth 1 score cp 10 pv e2e4"
      case "$pos" in
        *" b "*) echo "info depth 2 score mate 3 pv a7a6" ;;
        *) echo "info depth 2 score cp 150 pv e2e4" ;;
      esac
      echo "bestmove e2e4" ;;
    quit) exit 0 ;;
  esac
done
"#;

        const SILENT: &str = r#"
while read -r line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    "go depth"*) echo "bestmove 0000" ;;
    quit) exit 0 ;;
  esac
done
"#;

        const STUBBORN: &str = r#"
trap '' TERM
while read -r line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
  esac
done
"#;

        fn spawn(script: &str) -> UciEngine {
            UciEngine::spawn(&EngineConfig::new("sh").with_args(["-c", script])).unwrap()
        }

        #[test]
        fn test_handshake_reads_engine_name() {
            let engine = spawn(STUB);
            assert_eq!(engine.name(), Some("Stub Engine"));
        }

        #[test]
        fn test_evaluate_returns_last_score() {
            let mut engine = spawn(STUB);
            engine.new_game().unwrap();

            let white = engine
                .evaluate("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", 10)
                .unwrap();
            assert_eq!(white, RawScore::Centipawns(150));

            let black = engine
                .evaluate("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1", 10)
                .unwrap();
            assert_eq!(
                black,
                RawScore::Mate {
                    moves: 3,
                    winning: true
                }
            );
        }

        #[test]
        fn test_evaluate_without_score_is_an_error() {
            let mut engine = spawn(SILENT);
            let result = engine.evaluate("8/8/8/8/8/8/8/K6k w - - 0 1", 1);
            assert!(matches!(result, Err(Error::Engine(_))));
        }

        #[test]
        fn test_engine_exit_is_an_error() {
            let err = UciEngine::spawn(&EngineConfig::new("sh").with_args(["-c", "exit 0"]));
            assert!(matches!(err, Err(Error::Engine(_))));
        }

        #[cfg(target_os = "linux")]
        fn is_running(pid: u32) -> bool {
            std::path::Path::new(&format!("/proc/{pid}")).exists()
        }

        #[cfg(target_os = "linux")]
        #[test]
        fn test_drop_reaps_engine_that_honors_quit() {
            let engine = spawn(STUB);
            let pid = engine.child.id();
            assert!(is_running(pid));

            drop(engine);
            assert!(!is_running(pid));
        }

        #[cfg(target_os = "linux")]
        #[test]
        fn test_drop_kills_engine_that_ignores_quit() {
            let engine = spawn(STUBBORN);
            let pid = engine.child.id();
            assert!(is_running(pid));

            let started = Instant::now();
            drop(engine);

            assert!(started.elapsed() >= QUIT_GRACE);
            assert!(!is_running(pid));
        }
    }
}
