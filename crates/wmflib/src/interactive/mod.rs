//! Prompts for operators running scripts by hand.
//!
//! Every prompt takes a [`Terminal`]; pass [`StdTerminal`] for the real one.

mod terminal;

pub use terminal::{StdTerminal, Terminal};

use crate::retry::error_chain;
use crate::WmflibError;
use std::error::Error;
use std::io::{self, IsTerminal};

/// Shortest secret accepted by [`get_secret`].
pub const MIN_SECRET_SIZE: usize = 6;

const PREFIX: &str = "\x1b[36m==>\x1b[39m";
const MAX_ANSWERS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum InteractiveError {
    /// Not in a TTY, bad arguments or too many invalid answers.
    #[error("{0}")]
    Input(String),

    /// The operator chose to stop, possibly after a failure.
    #[error("{reason}")]
    Abort {
        reason: String,
        #[source]
        source: Option<FailedOperation>,
    },

    #[error("Must be run in non-interactive mode or inside a screen or tmux.")]
    NotDurable,

    #[error("{0}: Passwords did not match")]
    SecretMismatch(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl InteractiveError {
    pub fn abort(reason: impl Into<String>) -> Self {
        InteractiveError::Abort {
            reason: reason.into(),
            source: None,
        }
    }
}

/// The failure an operator gave up on, with its source chain.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct FailedOperation(String);

/// Check applied to free-form answers; `Err` carries the reason shown to the user.
pub type Validator<'a> = &'a dyn Fn(&str) -> Result<(), String>;

/// Ask for an answer among `choices`, or any answer accepted by `validator`.
///
/// Exactly one of the two must be given. The user gets three tries; end of
/// input counts as an invalid answer. Only valid answers are logged.
pub fn ask_input(
    term: &mut dyn Terminal,
    message: &str,
    choices: &[&str],
    validator: Option<Validator<'_>>,
) -> Result<String, InteractiveError> {
    match (choices.is_empty(), validator.is_some()) {
        (true, false) => {
            return Err(InteractiveError::Input(
                "The `choices` argument is empty and no custom validator was provided.".into(),
            ))
        }
        (false, true) => {
            return Err(InteractiveError::Input(
                "When the `validator` argument is set, the `choices` argument must be empty.".into(),
            ))
        }
        _ => {}
    }
    if !term.is_tty() {
        return Err(InteractiveError::Input(
            "Not in a TTY, unable to ask for input".into(),
        ));
    }

    term.say(&format!("{PREFIX} {message}"))?;
    let mut reason = format!("Please type one of: {}", choices.join(","));
    for _ in 0..MAX_ANSWERS {
        // A read error is just another invalid answer.
        if let Ok(Some(response)) = term.read_line("> ") {
            match validator {
                Some(validate) => match validate(&response) {
                    Ok(()) => {
                        tracing::info!("User input is: \"{}\"", response);
                        return Ok(response);
                    }
                    Err(e) => reason = e,
                },
                None if choices.contains(&response.as_str()) => {
                    tracing::info!("User input is: \"{}\"", response);
                    return Ok(response);
                }
                None => {}
            }
        }
        term.say(&format!(
            "{PREFIX} Invalid response. {reason}. After {MAX_ANSWERS} wrong answers the task will be aborted."
        ))?;
    }

    Err(InteractiveError::Input("Too many invalid answers".into()))
}

/// Ask to type `go` to proceed; `abort` fails with [`InteractiveError::Abort`].
pub fn ask_confirmation(term: &mut dyn Terminal, message: &str) -> Result<(), InteractiveError> {
    let message = format!(
        "{message}\nType \"go\" to proceed or \"abort\" to interrupt the execution"
    );
    if ask_input(term, &message, &["go", "abort"], None)? == "abort" {
        return Err(InteractiveError::abort("Confirmation manually aborted"));
    }
    Ok(())
}

/// Run `op`, asking what to do each time it fails.
///
/// `retry` runs it again, `skip` returns `Ok(None)` and `abort` fails with
/// [`InteractiveError::Abort`], keeping the last failure as its source. An abort raised by `op` itself is propagated
/// without asking.
pub fn confirm_on_failure<T, E, F>(
    term: &mut dyn Terminal,
    mut op: F,
) -> Result<Option<T>, InteractiveError>
where
    E: Error + 'static,
    F: FnMut() -> Result<T, E>,
{
    let message = "What do you want to do? \"retry\" the last command, manually fix the issue and \
                   \"skip\" the last command to continue the execution or completely \"abort\" the execution.";
    loop {
        let err = match op() {
            Ok(value) => return Ok(Some(value)),
            Err(err) => err,
        };
        if let Some(reason) = abort_reason(&err) {
            return Err(InteractiveError::abort(reason));
        }

        tracing::error!("Failed to run {}: {}", std::any::type_name::<F>(), err);
        tracing::debug!("{}", error_chain(&err));
        match ask_input(term, message, &["retry", "skip", "abort"], None)?.as_str() {
            "skip" => return Ok(None),
            "abort" => {
                return Err(InteractiveError::Abort {
                    reason: "Task manually aborted".into(),
                    source: Some(FailedOperation(error_chain(&err))),
                })
            }
            _ => {}
        }
    }
}

/// Message of an abort anywhere in the error or its sources.
fn abort_reason(err: &(dyn Error + 'static)) -> Option<String> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(InteractiveError::Abort { reason, .. }) = e.downcast_ref::<InteractiveError>() {
            return Some(reason.clone());
        }
        if let Some(WmflibError::Interactive(InteractiveError::Abort { reason, .. })) =
            e.downcast_ref::<WmflibError>()
        {
            return Some(reason.clone());
        }
        current = e.source();
    }
    None
}

/// Name of the user running the script, seeing through sudo. `-` if unknown.
pub fn get_username() -> String {
    username_from(std::env::var("USER").ok(), std::env::var("SUDO_USER").ok())
}

fn username_from(user: Option<String>, sudo_user: Option<String>) -> String {
    match (user, sudo_user) {
        (_, Some(sudo_user)) if sudo_user != "root" => sudo_user,
        (Some(user), _) => user,
        _ => "-".to_string(),
    }
}

/// Fail when attached to a TTY outside of screen or tmux.
pub fn ensure_shell_is_durable() -> Result<(), InteractiveError> {
    check_durable(io::stdout().is_terminal(), |key| std::env::var(key).ok())
}

fn check_durable(
    is_tty: bool,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(), InteractiveError> {
    let set = |key: &str| env(key).is_some_and(|v| !v.is_empty());
    let term = env("TERM").unwrap_or_default();
    if is_tty && !set("STY") && !set("TMUX") && !term.contains("screen") && !term.contains("tmux")
    {
        return Err(InteractiveError::NotDurable);
    }
    Ok(())
}

/// Ask for a secret of at least [`MIN_SECRET_SIZE`] characters, optionally twice.
pub fn get_secret(
    term: &mut dyn Terminal,
    title: &str,
    confirm: bool,
) -> Result<String, InteractiveError> {
    let mut read = |prompt: &str| -> Result<String, InteractiveError> {
        term.read_secret(prompt)?
            .ok_or_else(|| InteractiveError::Input("No secret provided".into()))
    };

    let mut secret = read(&format!("{title}: "))?;
    while secret.chars().count() < MIN_SECRET_SIZE {
        secret = read(&format!(
            "Secret must be at least {MIN_SECRET_SIZE} characters. try again: "
        ))?;
    }

    if confirm && read("Again, just to be sure: ")? != secret {
        return Err(InteractiveError::SecretMismatch(title.to_string()));
    }
    Ok(secret)
}
