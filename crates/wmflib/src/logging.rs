//! Logging init: file under the XDG state dir, or stderr as a fallback.
//! Either can also relay INFO events to IRC.

use crate::irc::IrcLayer;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,wmflib=debug";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Unable to locate the state directory")]
    Xdg(#[from] xdg::BaseDirectoriesError),

    #[error("Unable to open log file {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Logging is already initialised")]
    AlreadyInitialised(#[from] tracing_subscriber::util::TryInitError),
}

/// Writer that is either a file or stderr (used when file clone fails).
enum FileOrStderr {
    File(fs::File),
    Stderr,
}

impl io::Write for FileOrStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FileOrStderr::File(f) => f.write(buf),
            FileOrStderr::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FileOrStderr::File(f) => f.flush(),
            FileOrStderr::Stderr => io::stderr().lock().flush(),
        }
    }
}

struct FileMakeWriter(fs::File);

impl<'a> MakeWriter<'a> for FileMakeWriter {
    type Writer = FileOrStderr;

    fn make_writer(&'a self) -> Self::Writer {
        self.0
            .try_clone()
            .map(FileOrStderr::File)
            .unwrap_or(FileOrStderr::Stderr)
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Path of the log file, `~/.local/state/wmflib/wmflib.log` by default.
pub fn log_path() -> Result<PathBuf, LoggingError> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("wmflib")?;
    Ok(xdg_dirs.get_state_home().join("wmflib.log"))
}

/// Log to the state file, optionally relaying to IRC as well.
/// On failure the caller can fall back to [`init_logging_stderr`].
pub fn init_logging(irc: Option<IrcLayer>) -> Result<(), LoggingError> {
    let log_file_path = log_path()?;
    let open_err = |source| LoggingError::Open {
        path: log_file_path.clone(),
        source,
    };
    if let Some(dir) = log_file_path.parent() {
        fs::create_dir_all(dir).map_err(open_err)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)
        .map_err(open_err)?;

    let writer = BoxMakeWriter::new(FileMakeWriter(file));
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
        .with(irc)
        .try_init()?;

    tracing::info!("wmflib logging initialized at {}", log_file_path.display());
    Ok(())
}

/// Log to stderr only. Use when [`init_logging`] fails so the CLI doesn't crash.
pub fn init_logging_stderr(irc: Option<IrcLayer>) {
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr).with_ansi(false))
        .with(irc)
        .try_init();
}
