//! Terminal abstraction used by the interactive prompts.

use console::Term;
use std::io::{self, BufRead, IsTerminal, Write};

/// What the prompts need from a terminal.
pub trait Terminal {
    /// Whether stdout is attached to a TTY.
    fn is_tty(&self) -> bool;

    /// Print one line.
    fn say(&mut self, line: &str) -> io::Result<()>;

    /// Print `prompt` and read one line without its trailing newline.
    /// `None` on end of input.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    /// Like [`Terminal::read_line`] without echoing what is typed.
    fn read_secret(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Terminal over the process stdin/stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdTerminal;

impl StdTerminal {
    pub fn new() -> Self {
        Self
    }
}

fn read_stdin_line() -> io::Result<Option<String>> {
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}

impl Terminal for StdTerminal {
    fn is_tty(&self) -> bool {
        io::stdout().is_terminal()
    }

    fn say(&mut self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{line}")?;
        out.flush()
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        {
            let mut out = io::stdout().lock();
            write!(out, "{prompt}")?;
            out.flush()?;
        }
        read_stdin_line()
    }

    fn read_secret(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let term = Term::stderr();
        term.write_str(prompt)?;
        term.flush()?;
        // Piped secrets are read as plain lines.
        if !io::stdin().is_terminal() {
            return read_stdin_line();
        }
        term.read_secure_line().map(Some)
    }
}
