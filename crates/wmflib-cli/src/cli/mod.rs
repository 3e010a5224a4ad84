//! CLI for the wmflib helpers.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use wmflib::settings;

use commands::{
    run_completions, run_confirm, run_dns, run_irc, run_lock, run_man, run_phab_comment,
    run_prometheus, run_thanos, RecordKind,
};

/// Top-level CLI for the wmflib helpers.
#[derive(Debug, Parser)]
#[command(name = "wmflib")]
#[command(version, about = "Operational helpers: DNS, Prometheus, Phabricator, IRC, locks", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Resolve a DNS name (or an address, for PTR records).
    Dns {
        /// Name or IP address to resolve.
        query: String,

        /// Record to look up.
        #[arg(long, value_enum, default_value_t = RecordKind::Ips)]
        record: RecordKind,

        /// Query this nameserver instead of the system ones (repeatable).
        #[arg(long = "nameserver", value_name = "IP", conflicts_with = "public")]
        nameservers: Vec<std::net::IpAddr>,

        /// Query the public authoritative nameservers.
        #[arg(long)]
        public: bool,
    },

    /// Run an instant query on a site's Prometheus.
    Prometheus {
        /// PromQL query.
        query: String,

        /// Datacenter to query.
        #[arg(long)]
        site: String,

        /// Prometheus instance on the site.
        #[arg(long, default_value = wmflib::prometheus::DEFAULT_INSTANCE)]
        instance: String,
    },

    /// Run an instant query on Thanos, across all sites.
    Thanos {
        /// PromQL query.
        query: String,
    },

    /// Comment on a Phabricator task.
    PhabComment {
        /// Task ID, e.g. T12345.
        task_id: String,

        /// Comment text (Remarkup).
        comment: String,

        /// Bot config file (INI), overrides the settings.
        #[arg(long, value_name = "FILE")]
        bot_config: Option<PathBuf>,

        /// Section of the bot config file, overrides the settings.
        #[arg(long)]
        section: Option<String>,

        /// Only log what would be done.
        #[arg(long)]
        dry_run: bool,
    },

    /// Send a message to IRC through the configured tcpircbot.
    Irc {
        /// Message to send.
        message: String,

        /// Log to the Server Admin Log (prefix with `!log`).
        #[arg(long)]
        sal: bool,
    },

    /// Ask for a "go" before continuing; fails on "abort".
    Confirm {
        /// Message shown before asking.
        message: String,

        /// Also require running inside screen or tmux.
        #[arg(long)]
        durable: bool,
    },

    /// Run a command while holding an exclusive lock on a file.
    Lock {
        /// File to lock, created if missing.
        path: PathBuf,

        /// Total seconds to wait for the lock.
        #[arg(long, default_value_t = 10, value_name = "SECS")]
        timeout: u64,

        /// Command to run, after `--`.
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Print shell completions.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print the man page.
    Man,
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = settings::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Dns {
                query,
                record,
                nameservers,
                public,
            } => run_dns(&cfg, &query, record, &nameservers, public)?,
            CliCommand::Prometheus {
                query,
                site,
                instance,
            } => run_prometheus(&cfg, &query, &site, &instance)?,
            CliCommand::Thanos { query } => run_thanos(&cfg, &query)?,
            CliCommand::PhabComment {
                task_id,
                comment,
                bot_config,
                section,
                dry_run,
            } => run_phab_comment(&cfg, &task_id, &comment, bot_config, section, dry_run)?,
            CliCommand::Irc { message, sal } => run_irc(&cfg, &message, sal)?,
            CliCommand::Confirm { message, durable } => run_confirm(&message, durable)?,
            CliCommand::Lock {
                path,
                timeout,
                command,
            } => run_lock(&path, timeout, &command)?,
            CliCommand::Completions { shell } => run_completions(shell),
            CliCommand::Man => run_man()?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
