//! `wmflib irc` – send one message through the tcpircbot.

use anyhow::{bail, Result};
use tracing_subscriber::prelude::*;
use wmflib::interactive::get_username;
use wmflib::irc::IrcLayer;
use wmflib::settings::WmflibConfig;

pub fn run_irc(cfg: &WmflibConfig, message: &str, sal: bool) -> Result<()> {
    let Some(host) = cfg.irc.host.as_deref() else {
        bail!("no IRC host configured, set [irc] host in the config file");
    };
    let user = get_username();
    let layer = if sal {
        IrcLayer::sal(host, cfg.irc.port, &user)
    } else {
        IrcLayer::new(host, cfg.irc.port, &user)
    };

    // A scoped subscriber keeps the message out of the regular log file.
    let subscriber = tracing_subscriber::registry().with(layer.for_target("irc"));
    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(target: "irc", "{}", message);
    });
    Ok(())
}
