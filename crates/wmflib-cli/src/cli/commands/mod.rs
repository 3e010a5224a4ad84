//! CLI command handlers, one file per command.

mod completions;
mod confirm;
mod dns;
mod irc;
mod lock;
mod phab_comment;
mod query;

pub use completions::{run_completions, run_man};
pub use confirm::run_confirm;
pub use dns::{run_dns, RecordKind};
pub use irc::run_irc;
pub use lock::run_lock;
pub use phab_comment::run_phab_comment;
pub use query::{run_prometheus, run_thanos};
