//! Logging bootstrap for applications embedding lectern.
//!
//! The library itself only emits through the `log` facade, using stable
//! `event=<name> module=<module> key=value` lines. Host applications that do
//! not already install a logger can call [`init_logging`] once at startup.
//!
//! # Invariants
//! - Initialization happens at most once per process.
//! - Repeating the call with the same arguments is a no-op.
//! - A call with a different level or destination is rejected.

use crate::error::{LecternError, Result};
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "lectern";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();

struct LoggingState {
    level: String,
    log_dir: Option<PathBuf>,
    _logger: LoggerHandle,
}

/// Start a logger at `level` (a `log` spec such as `"info"` or
/// `"lectern=debug"`). Logs go to stderr, or to rotating files in `log_dir`.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<()> {
    let level = level.trim();
    if level.is_empty() {
        return Err(LecternError::Logging("log level must not be empty".to_string()));
    }
    let log_dir = log_dir.map(Path::to_path_buf);

    let state = LOGGING_STATE.get_or_try_init(|| start_logger(level, log_dir.clone()))?;

    if state.level != level {
        return Err(LecternError::Logging(format!(
            "logging already initialized with level `{}`; refusing to switch to `{}`",
            state.level, level
        )));
    }
    if state.log_dir != log_dir {
        return Err(LecternError::Logging(format!(
            "logging already initialized with a different destination ({})",
            describe(&state.log_dir)
        )));
    }
    Ok(())
}

/// `(level, log_dir)` of the active logger, if [`init_logging`] succeeded.
pub fn logging_status() -> Option<(String, Option<PathBuf>)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.level.clone(), state.log_dir.clone()))
}

fn start_logger(level: &str, log_dir: Option<PathBuf>) -> Result<LoggingState> {
    let logger = Logger::try_with_str(level)
        .map_err(|err| LecternError::Logging(format!("invalid log level `{level}`: {err}")))?;

    let logger = match &log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|err| {
                LecternError::Logging(format!(
                    "failed to create log directory `{}`: {err}",
                    dir.display()
                ))
            })?;
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(dir.as_path())
                        .basename(LOG_FILE_BASENAME),
                )
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
        None => logger.log_to_stderr().format(flexi_logger::default_format),
    };

    let handle = logger
        .start()
        .map_err(|err| LecternError::Logging(format!("failed to start logger: {err}")))?;

    log::info!(
        "event=logging_init module=logging level={} destination={}",
        level,
        describe(&log_dir)
    );

    Ok(LoggingState {
        level: level.to_string(),
        log_dir,
        _logger: handle,
    })
}

fn describe(log_dir: &Option<PathBuf>) -> String {
    match log_dir {
        Some(dir) => dir.display().to_string(),
        None => "stderr".to_string(),
    }
}
