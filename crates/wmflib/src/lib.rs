pub mod error;
pub mod logging;
pub mod settings;

// Leaf helpers, each usable on its own.
pub mod actions;
pub mod config;
pub mod constants;
pub mod dns;
pub mod fileio;
pub mod http;
pub mod idm;
pub mod interactive;
pub mod irc;
pub mod phabricator;
pub mod prometheus;
pub mod retry;

pub use error::{Result, WmflibError};

/// Version of this crate, used in the HTTP User-Agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
