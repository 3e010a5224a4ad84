//! `wmflib lock` – run a command holding an exclusive lock on a file.

use anyhow::{bail, Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use wmflib::fileio::locked_open;

pub fn run_lock(path: &Path, timeout: u64, command: &[String]) -> Result<()> {
    let Some((program, args)) = command.split_first() else {
        bail!("no command given");
    };

    let mut options = OpenOptions::new();
    options.read(true).append(true).create(true);
    let _lock = locked_open(path, &options, Duration::from_secs(timeout))?;

    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("failed to run {program}"))?;
    if !status.success() {
        bail!("{program} exited with {status}");
    }
    Ok(())
}
