//! Files opened under an exclusive `flock`.

use crate::retry::{retry, BackoffMode, InvalidParams, RetryPolicy};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Total time [`locked_open`] waits for the lock by default.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

const LOCK_TRIES: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum FileIoError {
    #[error("Unable to open {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to acquire exclusive lock on {}", .path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    InvalidParams(#[from] InvalidParams),
}

/// An open file holding an exclusive lock, released on drop.
#[derive(Debug)]
pub struct LockedFile {
    file: File,
    path: PathBuf,
}

impl LockedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Deref for LockedFile {
    type Target = File;

    fn deref(&self) -> &File {
        &self.file
    }
}

impl DerefMut for LockedFile {
    fn deref_mut(&mut self) -> &mut File {
        &mut self.file
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Unable to release lock on {}: {}", self.path.display(), e);
            return;
        }
        tracing::debug!("Released exclusive lock on {}", self.path.display());
    }
}

fn try_lock_exclusive(file: &File) -> io::Result<()> {
    if FileExt::try_lock_exclusive(file)? {
        Ok(())
    } else {
        Err(fs4::lock_contended_error())
    }
}

/// Open `path` with `options` and take an exclusive lock on it.
///
/// The lock is attempted ten times, sleeping `timeout / 10` in between.
///
/// ```no_run
/// use std::fs::OpenOptions;
/// use std::io::Write;
/// use wmflib::fileio::{locked_open, DEFAULT_LOCK_TIMEOUT};
///
/// let mut options = OpenOptions::new();
/// options.write(true).create(true).truncate(true);
/// let mut f = locked_open("new.out", &options, DEFAULT_LOCK_TIMEOUT)?;
/// f.write_all(b"Some text")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn locked_open(
    path: impl AsRef<Path>,
    options: &OpenOptions,
    timeout: Duration,
) -> Result<LockedFile, FileIoError> {
    let path = path.as_ref().to_path_buf();
    let file = options.open(&path).map_err(|source| FileIoError::Open {
        path: path.clone(),
        source,
    })?;

    let policy = RetryPolicy::<io::Error>::builder()
        .tries(LOCK_TRIES)
        .delay(timeout / LOCK_TRIES)
        .backoff_mode(BackoffMode::Constant)
        .failure_message(format!("Unable to lock {}", path.display()))
        .build()?;
    if let Err(source) = retry(&policy, || try_lock_exclusive(&file)) {
        return Err(FileIoError::Lock { path, source });
    }
    tracing::debug!("Acquired exclusive lock on {}", path.display());

    Ok(LockedFile { file, path })
}

/// [`locked_open`] for reading with the default timeout.
pub fn locked_read(path: impl AsRef<Path>) -> Result<LockedFile, FileIoError> {
    locked_open(path, OpenOptions::new().read(true), DEFAULT_LOCK_TIMEOUT)
}
