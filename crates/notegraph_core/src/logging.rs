//! Logging bootstrap for hosts embedding the query engine.
//!
//! # Responsibility
//! - Initialize the `log` backend exactly once per process.
//! - Route engine events to rolling files or to stderr.
//!
//! # Invariants
//! - Logging init is idempotent for the same level and destination.
//! - Re-initialization with a different level or destination is rejected.
//! - Logging initialization must not panic.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "notegraph";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

struct LoggingState {
    level: &'static str,
    log_dir: Option<PathBuf>,
    _logger: LoggerHandle,
}

/// Logging bootstrap failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    UnsupportedLevel(String),
    InvalidLogDir(String),
    CreateLogDir { path: PathBuf, message: String },
    Backend(String),
    /// Logging is already active with another configuration.
    Conflict(String),
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::InvalidLogDir(message) => write!(f, "invalid log directory: {message}"),
            Self::CreateLogDir { path, message } => write!(
                f,
                "failed to create log directory `{}`: {message}",
                path.display()
            ),
            Self::Backend(message) => write!(f, "failed to start logger: {message}"),
            Self::Conflict(message) => write!(f, "logging already initialized {message}"),
        }
    }
}

impl Error for LoggingError {}

/// Initializes logging at `level`.
///
/// With `log_dir`, logs go to size-rotated files in that directory;
/// without it, to stderr.
///
/// # Errors
/// - `UnsupportedLevel` for unknown levels.
/// - `InvalidLogDir` / `CreateLogDir` when the directory is unusable.
/// - `Backend` when the logger cannot start.
/// - `Conflict` when already initialized with a different configuration.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<(), LoggingError> {
    let normalized_level = normalize_level(level)?;
    let normalized_dir = log_dir.map(normalize_log_dir).transpose()?;

    let state = LOGGING_STATE.get_or_try_init(|| -> Result<LoggingState, LoggingError> {
        let logger = start_logger(normalized_level, normalized_dir.as_deref())?;
        install_panic_hook_once();

        info!(
            "event=logging_init module=logging status=ok level={} destination={} version={}",
            normalized_level,
            describe_destination(normalized_dir.as_deref()),
            env!("CARGO_PKG_VERSION")
        );

        Ok(LoggingState {
            level: normalized_level,
            log_dir: normalized_dir.clone(),
            _logger: logger,
        })
    })?;

    if state.log_dir != normalized_dir {
        return Err(LoggingError::Conflict(format!(
            "with destination `{}`",
            describe_destination(state.log_dir.as_deref())
        )));
    }
    if state.level != normalized_level {
        return Err(LoggingError::Conflict(format!(
            "with level `{}`; refusing to switch to `{normalized_level}`",
            state.level
        )));
    }

    Ok(())
}

/// Active `(level, log_dir)`; `None` before initialization.
pub fn logging_status() -> Option<(&'static str, Option<PathBuf>)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.level, state.log_dir.clone()))
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(level: &'static str, log_dir: Option<&Path>) -> Result<LoggerHandle, LoggingError> {
    let logger = Logger::try_with_str(level).map_err(|err| LoggingError::Backend(err.to_string()))?;

    let logger = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|err| LoggingError::CreateLogDir {
                path: dir.to_path_buf(),
                message: err.to_string(),
            })?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
        None => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::default_format),
    };

    logger
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))
}

fn describe_destination(log_dir: Option<&Path>) -> String {
    log_dir.map_or_else(|| "stderr".to_string(), |dir| dir.display().to_string())
}

fn normalize_level(level: &str) -> Result<&'static str, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(LoggingError::UnsupportedLevel(other.to_string())),
    }
}

fn normalize_log_dir(log_dir: &Path) -> Result<PathBuf, LoggingError> {
    if log_dir.as_os_str().is_empty() {
        return Err(LoggingError::InvalidLogDir("path cannot be empty".to_string()));
    }
    if !log_dir.is_absolute() {
        return Err(LoggingError::InvalidLogDir(format!(
            "must be an absolute path, got `{}`",
            log_dir.display()
        )));
    }
    Ok(log_dir.to_path_buf())
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.get().is_some() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_summary(panic_info);
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            location, payload
        );
        previous_hook(panic_info);
    }));

    let _ = PANIC_HOOK_INSTALLED.set(());
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };

    // Payloads may quote query text.
    sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
}

fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, logging_status, normalize_level, normalize_log_dir, sanitize_message,
        LoggingError,
    };
    use std::path::Path;

    #[test]
    fn normalize_level_accepts_known_values() {
        assert_eq!(normalize_level("INFO").unwrap(), "info");
        assert_eq!(normalize_level(" warning ").unwrap(), "warn");
        assert_eq!(
            normalize_level("loud").unwrap_err(),
            LoggingError::UnsupportedLevel("loud".to_string())
        );
    }

    #[test]
    fn normalize_log_dir_rejects_relative_path() {
        let error = normalize_log_dir(Path::new("logs/dev")).unwrap_err();
        assert!(error.to_string().contains("absolute"));
    }

    #[test]
    fn sanitize_message_removes_newlines_and_truncates() {
        let sanitized = sanitize_message("line1\nline2\rline3", 8);
        assert!(!sanitized.contains('\n'));
        assert!(!sanitized.contains('\r'));
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn init_logging_is_idempotent_for_same_config_and_rejects_conflicts() {
        let log_dir = tempfile::tempdir().unwrap();
        let other_dir = tempfile::tempdir().unwrap();

        init_logging("info", Some(log_dir.path())).unwrap();
        init_logging("info", Some(log_dir.path())).unwrap();

        let level_error = init_logging("debug", Some(log_dir.path())).unwrap_err();
        assert!(matches!(level_error, LoggingError::Conflict(_)));

        let dir_error = init_logging("info", Some(other_dir.path())).unwrap_err();
        assert!(matches!(dir_error, LoggingError::Conflict(_)));

        let stderr_error = init_logging("info", None).unwrap_err();
        assert!(matches!(stderr_error, LoggingError::Conflict(_)));

        let (active_level, active_dir) = logging_status().unwrap();
        assert_eq!(active_level, "info");
        assert_eq!(active_dir.as_deref(), Some(log_dir.path()));
    }
}
