//! `wmflib confirm` – ask the operator to type "go".

use anyhow::Result;
use wmflib::interactive::{ask_confirmation, ensure_shell_is_durable, StdTerminal};

pub fn run_confirm(message: &str, durable: bool) -> Result<()> {
    if durable {
        ensure_shell_is_durable()?;
    }
    ask_confirmation(&mut StdTerminal::new(), message)?;
    Ok(())
}
