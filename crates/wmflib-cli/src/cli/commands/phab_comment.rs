//! `wmflib phab-comment` – comment on a Phabricator task.

use anyhow::Result;
use std::path::PathBuf;
use wmflib::phabricator::create_phabricator;
use wmflib::settings::WmflibConfig;

pub fn run_phab_comment(
    cfg: &WmflibConfig,
    task_id: &str,
    comment: &str,
    bot_config: Option<PathBuf>,
    section: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let bot_config = bot_config.unwrap_or_else(|| cfg.phabricator.bot_config_file.clone());
    let section = section.unwrap_or_else(|| cfg.phabricator.section.clone());
    let phabricator = create_phabricator(&bot_config, &section, dry_run)?;
    phabricator.task_comment(task_id, comment)?;
    if !dry_run {
        println!("Commented on {task_id}.");
    }
    Ok(())
}
