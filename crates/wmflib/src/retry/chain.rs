//! Render an error together with its `source()` chain for log lines.

use std::error::Error;

/// Joins the message of `error` with the messages of its sources, newest first.
pub fn error_chain(error: &(dyn Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str("\nCaused by: ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
