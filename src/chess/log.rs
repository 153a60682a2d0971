use env_logger::Env;

/// Environment variable holding the log filter (`error`, `warn`, `info`, ...).
pub const LOG_ENV: &str = "CHESS_LOG";

const DEFAULT_FILTER: &str = "info";

/// Installs the process-wide logger. Calling it twice is harmless.
pub fn init() {
    let _ = env_logger::Builder::from_env(Env::default().filter_or(LOG_ENV, DEFAULT_FILTER))
        .format_timestamp_secs()
        .try_init();
}
