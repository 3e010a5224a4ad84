//! Common command line and dispatch for IDM logout scripts.
//!
//! A logout script implements [`Logoutd`] and hands its arguments to
//! [`run_logoutd`]:
//!
//! ```no_run
//! use wmflib::idm::{logoutd_args, run_logoutd, Logoutd};
//!
//! struct MyLogoutd;
//!
//! impl Logoutd for MyLogoutd {
//!     fn logout_user(&mut self, _user: &str) -> i32 { 0 }
//!     fn query_user(&mut self, _user: &str) -> i32 { 0 }
//!     fn list(&mut self) -> i32 { 0 }
//! }
//!
//! let args = logoutd_args("Log users out of my service", std::env::args_os())?;
//! std::process::exit(run_logoutd(&mut MyLogoutd, &args));
//! # Ok::<(), wmflib::idm::IdmError>(())
//! ```

use clap::{Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use std::ffi::OsString;

#[derive(Debug, thiserror::Error)]
pub enum IdmError {
    #[error("{0}")]
    InvalidValue(String),

    #[error(transparent)]
    Args(#[from] clap::Error),
}

/// Parsed command line of a logout script.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "logoutd")]
pub struct LogoutdArgs {
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: LogoutdCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum LogoutdCommand {
    /// Display the status of logged-in users
    Query(UserArgs),
    /// Log the user out
    Logout(UserArgs),
    /// List all active sessions
    List,
}

impl LogoutdCommand {
    pub fn name(&self) -> &'static str {
        match self {
            LogoutdCommand::Query(_) => "query",
            LogoutdCommand::Logout(_) => "logout",
            LogoutdCommand::List => "list",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct UserArgs {
    /// The uid of the user to use
    #[arg(short, long)]
    pub uid: String,

    /// The cn of the user to use
    #[arg(short, long)]
    pub cn: String,
}

/// Which attribute identifies the user passed to [`Logoutd`] methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserIdentifier {
    #[default]
    Cn,
    Uid,
}

impl UserArgs {
    pub fn user(&self, identifier: UserIdentifier) -> &str {
        match identifier {
            UserIdentifier::Cn => &self.cn,
            UserIdentifier::Uid => &self.uid,
        }
    }
}

/// Parse `args` (program name first) with `description` as the help text.
pub fn logoutd_args<I, T>(description: &str, args: I) -> Result<LogoutdArgs, IdmError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    if description.trim().is_empty() {
        return Err(IdmError::InvalidValue(
            "Must provide a string description".to_string(),
        ));
    }
    let matches = LogoutdArgs::command()
        .about(description.to_string())
        .try_get_matches_from(args)?;
    Ok(LogoutdArgs::from_arg_matches(&matches)?)
}

/// A logout script. Methods return the process exit code.
pub trait Logoutd {
    fn user_identifier(&self) -> UserIdentifier {
        UserIdentifier::Cn
    }

    /// 0 if the user session was cleared, 1 otherwise.
    fn logout_user(&mut self, user: &str) -> i32;

    /// 1 if the user is logged in, 0 otherwise.
    fn query_user(&mut self, user: &str) -> i32;

    /// 0 on success.
    fn list(&mut self) -> i32;
}

/// Run the action selected on the command line and return its exit code.
pub fn run_logoutd<L: Logoutd + ?Sized>(logoutd: &mut L, args: &LogoutdArgs) -> i32 {
    tracing::debug!("Running action: {}", args.command.name());
    let identifier = logoutd.user_identifier();
    match &args.command {
        LogoutdCommand::Query(user) => logoutd.query_user(user.user(identifier)),
        LogoutdCommand::Logout(user) => logoutd.logout_user(user.user(identifier)),
        LogoutdCommand::List => logoutd.list(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        identifier: UserIdentifier,
        calls: Vec<String>,
    }

    impl Logoutd for Recorder {
        fn user_identifier(&self) -> UserIdentifier {
            self.identifier
        }

        fn logout_user(&mut self, user: &str) -> i32 {
            self.calls.push(format!("logout {user}"));
            0
        }

        fn query_user(&mut self, user: &str) -> i32 {
            self.calls.push(format!("query {user}"));
            1
        }

        fn list(&mut self) -> i32 {
            self.calls.push("list".to_string());
            0
        }
    }

    fn parse(args: &[&str]) -> Result<LogoutdArgs, IdmError> {
        logoutd_args("Test logout", std::iter::once("logoutd").chain(args.iter().copied()))
    }

    #[test]
    fn empty_description_is_rejected() {
        let err = logoutd_args("", ["logoutd", "list"]).unwrap_err();
        assert!(matches!(err, IdmError::InvalidValue(_)));
        assert_eq!(err.to_string(), "Must provide a string description");
    }

    #[test]
    fn query_needs_uid_and_cn() {
        let args = parse(&["-vv", "query", "--uid", "jdoe", "--cn", "John Doe"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(
            args.command,
            LogoutdCommand::Query(UserArgs {
                uid: "jdoe".into(),
                cn: "John Doe".into()
            })
        );
        assert!(matches!(parse(&["query", "-u", "jdoe"]), Err(IdmError::Args(_))));
    }

    #[test]
    fn a_command_is_required() {
        assert!(matches!(parse(&[]), Err(IdmError::Args(_))));
    }

    #[test]
    fn dispatch_uses_cn_by_default() {
        let mut logoutd = Recorder::default();
        let args = parse(&["logout", "-u", "jdoe", "-c", "John Doe"]).unwrap();
        assert_eq!(run_logoutd(&mut logoutd, &args), 0);
        let args = parse(&["query", "-u", "jdoe", "-c", "John Doe"]).unwrap();
        assert_eq!(run_logoutd(&mut logoutd, &args), 1);
        assert_eq!(logoutd.calls, vec!["logout John Doe", "query John Doe"]);
    }

    #[test]
    fn dispatch_with_uid_identifier() {
        let mut logoutd = Recorder {
            identifier: UserIdentifier::Uid,
            ..Default::default()
        };
        let args = parse(&["logout", "--uid", "jdoe", "--cn", "John Doe"]).unwrap();
        run_logoutd(&mut logoutd, &args);
        let args = parse(&["list"]).unwrap();
        run_logoutd(&mut logoutd, &args);
        assert_eq!(logoutd.calls, vec!["logout jdoe", "list"]);
    }
}
