//! Relay log events to IRC through a tcpircbot.
//!
//! A tcpircbot listens on a TCP port and posts every line it receives to the
//! IRC channel bound to that port. [`IrcLayer`] plugs into a
//! `tracing_subscriber` registry and forwards INFO and more severe events:
//!
//! ```no_run
//! use tracing_subscriber::prelude::*;
//! use wmflib::irc::IrcLayer;
//!
//! let layer = IrcLayer::new("irchost.example.org", 9200, "user").for_target("irc");
//! tracing_subscriber::registry().with(layer).init();
//! tracing::info!(target: "irc", "Message");
//! // logmsgbot: user@host1001 Message
//! ```

use std::fmt::{self, Write as _};
use std::io::{self, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

const SOCKET_TIMEOUT: Duration = Duration::from_secs(1);

/// Tracing layer sending each event as one line to a tcpircbot.
#[derive(Debug, Clone)]
pub struct IrcLayer {
    host: String,
    port: u16,
    prefix: String,
    target: Option<String>,
}

impl IrcLayer {
    /// Lines look like `username@hostname message`.
    pub fn new(host: &str, port: u16, username: &str) -> Self {
        Self::with_prefix(host, port, format!("{}@{}", username, hostname()))
    }

    /// Server Admin Log flavour: stashbot expects `!log <nick> <message>`,
    /// so lines look like `!log username@hostname message`.
    pub fn sal(host: &str, port: u16, username: &str) -> Self {
        Self::with_prefix(host, port, format!("!log {}@{}", username, hostname()))
    }

    fn with_prefix(host: &str, port: u16, prefix: String) -> Self {
        Self {
            host: host.to_string(),
            port,
            prefix,
            target: None,
        }
    }

    /// Only relay events logged with this exact target.
    pub fn for_target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn send_message(&self, message: &str) -> io::Result<()> {
        let mut last_err = io::Error::new(io::ErrorKind::NotFound, "no address to connect to");
        for addr in (self.host.as_str(), self.port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, SOCKET_TIMEOUT) {
                Ok(mut stream) => {
                    stream.set_write_timeout(Some(SOCKET_TIMEOUT))?;
                    return stream.write_all(message.as_bytes());
                }
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }
}

impl<S: Subscriber> Layer<S> for IrcLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > Level::INFO {
            return;
        }
        if let Some(target) = &self.target {
            if metadata.target() != target {
                return;
            }
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let line = format!("{} {}", self.prefix, visitor.message);
        if let Err(e) = self.send_message(&line) {
            // Logging must never take the caller down; report like a failed handler would.
            eprintln!("--- IRC logging error ---\nUnable to send to {}:{}: {}", self.host, self.port, e);
        }
    }
}

/// Collects the `message` field, followed by any other field as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    extra: Vec<String>,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
            for extra in self.extra.drain(..) {
                self.message.push(' ');
                self.message.push_str(&extra);
            }
        } else if self.message.is_empty() {
            self.extra.push(format!("{}={:?}", field.name(), value));
        } else {
            let _ = write!(self.message, " {}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.record_debug(field, &value);
        }
    }
}

/// Name of the local host, `localhost` if it cannot be read.
#[cfg(unix)]
pub fn hostname() -> String {
    let mut buf = [0u8; 256];
    // SAFETY: the buffer is valid for `buf.len()` bytes for the duration of the call.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return "localhost".to_string();
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

#[cfg(not(unix))]
pub fn hostname() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_else(|_| "localhost".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use tracing_subscriber::prelude::*;

    fn listener() -> (TcpListener, u16) {
        let l = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = l.local_addr().unwrap().port();
        (l, port)
    }

    fn receive(listener: &TcpListener) -> String {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = String::new();
        stream.read_to_string(&mut buf).unwrap();
        buf
    }

    #[test]
    fn prefixes() {
        let plain = IrcLayer::new("irc.example.org", 9200, "user");
        assert_eq!(plain.prefix(), format!("user@{}", hostname()));
        let sal = IrcLayer::sal("irc.example.org", 9200, "user");
        assert_eq!(sal.prefix(), format!("!log user@{}", hostname()));
    }

    #[test]
    fn info_events_are_relayed_and_debug_ones_are_not() {
        let (listener, port) = listener();
        let layer = IrcLayer::new("127.0.0.1", port, "user");
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("not for IRC");
            tracing::info!("Message");
        });
        assert_eq!(receive(&listener), format!("user@{} Message", hostname()));

        listener.set_nonblocking(true).unwrap();
        assert!(listener.accept().is_err(), "debug event must not be relayed");
    }

    #[test]
    fn sal_lines_are_prefixed_with_log() {
        let (listener, port) = listener();
        let layer = IrcLayer::sal("127.0.0.1", port, "user");
        tracing::subscriber::with_default(tracing_subscriber::registry().with(layer), || {
            tracing::warn!("Restarted service");
        });
        assert_eq!(
            receive(&listener),
            format!("!log user@{} Restarted service", hostname())
        );
    }

    #[test]
    fn target_filter_skips_other_targets() {
        let (listener, port) = listener();
        let layer = IrcLayer::new("127.0.0.1", port, "user").for_target("irc");
        tracing::subscriber::with_default(tracing_subscriber::registry().with(layer), || {
            tracing::info!(target: "elsewhere", "skip me");
            tracing::info!(target: "irc", "keep me");
        });
        assert_eq!(receive(&listener), format!("user@{} keep me", hostname()));
        listener.set_nonblocking(true).unwrap();
        assert!(listener.accept().is_err());
    }

    #[test]
    fn unreachable_bot_does_not_panic() {
        let port = listener().1; // listener dropped right away
        let layer = IrcLayer::new("127.0.0.1", port, "user");
        tracing::subscriber::with_default(tracing_subscriber::registry().with(layer), || {
            tracing::info!("lost");
        });
    }

    #[test]
    fn extra_fields_follow_the_message() {
        let (listener, port) = listener();
        let layer = IrcLayer::new("127.0.0.1", port, "user");
        tracing::subscriber::with_default(tracing_subscriber::registry().with(layer), || {
            tracing::info!(host = "host1001", "Rebooted");
        });
        assert_eq!(
            receive(&listener),
            format!("user@{} Rebooted host=\"host1001\"", hostname())
        );
    }
}
