//! Track actions performed on hosts (or anything else) and render them for Phabricator.

use std::fmt;

/// Worst result recorded by an [`Actions`] set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionStatus {
    Pass,
    Warn,
    Fail,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionStatus::Pass => "PASS",
            ActionStatus::Warn => "WARN",
            ActionStatus::Fail => "FAIL",
        })
    }
}

/// Actions performed on `name`, each logged when registered.
///
/// Renders as Phabricator markup, the status in bold:
///
/// ```text
/// host1001 (**PASS**)
///   - Downtimed on Icinga
///   - Restarted ntp
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actions {
    pub name: String,
    pub actions: Vec<String>,
    pub has_warnings: bool,
    pub has_failures: bool,
}

impl Actions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
            has_warnings: false,
            has_failures: false,
        }
    }

    pub fn status(&self) -> ActionStatus {
        if self.has_failures {
            ActionStatus::Fail
        } else if self.has_warnings {
            ActionStatus::Warn
        } else {
            ActionStatus::Pass
        }
    }

    pub fn success(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.actions.push(message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.actions.push(message);
        self.has_warnings = true;
    }

    pub fn failure(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{}", message);
        self.actions.push(message);
        self.has_failures = true;
    }
}

impl fmt::Display for Actions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} (**{}**)", self.name, self.status())?;
        let lines: Vec<String> = self.actions.iter().map(|a| format!("  - {a}")).collect();
        f.write_str(&lines.join("\n"))
    }
}

/// [`Actions`] by name, created on first access and kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionsDict {
    entries: Vec<Actions>,
}

impl ActionsDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// The actions for `name`, created empty if missing.
    pub fn entry(&mut self, name: &str) -> &mut Actions {
        let idx = match self.entries.iter().position(|a| a.name == name) {
            Some(idx) => idx,
            None => {
                self.entries.push(Actions::new(name));
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx]
    }

    pub fn get(&self, name: &str) -> Option<&Actions> {
        self.entries.iter().find(|a| a.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Actions> {
        self.entries.iter()
    }
}

impl fmt::Display for ActionsDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self.entries.iter().map(|a| format!("- {a}\n")).collect();
        f.write_str(&items.join("\n"))
    }
}
