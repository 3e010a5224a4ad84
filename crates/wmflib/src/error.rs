//! Crate-wide error type.
//!
//! Every module has its own error enum; `WmflibError` wraps them all so that
//! callers using several helpers can propagate with a single `?`.

use crate::config::ConfigError;
use crate::dns::DnsError;
use crate::http::HttpError;
use crate::idm::IdmError;
use crate::interactive::InteractiveError;
use crate::phabricator::PhabricatorError;
use crate::prometheus::PrometheusError;
use crate::retry::InvalidParams;

#[derive(Debug, thiserror::Error)]
pub enum WmflibError {
    #[error(transparent)]
    InvalidParams(#[from] InvalidParams),

    /// A verification failed. Kept apart from the other errors because in
    /// dry-run mode a check after a skipped write is expected to fail.
    #[error("{0}")]
    Check(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dns(#[from] DnsError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Prometheus(#[from] PrometheusError),

    #[error(transparent)]
    Phabricator(#[from] PhabricatorError),

    #[error(transparent)]
    Interactive(#[from] InteractiveError),

    #[error(transparent)]
    FileIo(#[from] crate::fileio::FileIoError),

    #[error(transparent)]
    Idm(#[from] IdmError),
}

pub type Result<T, E = WmflibError> = std::result::Result<T, E>;
