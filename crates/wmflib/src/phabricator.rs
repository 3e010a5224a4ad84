//! Phabricator client: comment on tasks through the Conduit API.

use crate::config::{load_ini_config, ConfigError};
use crate::http::{HttpError, HttpSession};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// INI section read by [`create_phabricator`] when none is given.
pub const DEFAULT_SECTION: &str = "phabricator_bot";

const REQUIRED_OPTIONS: [&str; 3] = ["host", "username", "token"];

#[derive(Debug, thiserror::Error)]
pub enum PhabricatorError {
    #[error("Unable to find section {section} in config file {file}")]
    MissingSection { section: String, file: String },

    #[error(
        "Unable to find all required options {:?} in section {section} of config file {file}",
        REQUIRED_OPTIONS
    )]
    MissingOptions { section: String, file: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Unable to instantiate Phabricator client")]
    Client(#[source] HttpError),

    #[error("Conduit call {method} failed: HTTP {code}")]
    Status { method: String, code: u32 },

    #[error("Conduit call {method} failed: {code}: {info}")]
    Conduit {
        method: String,
        code: String,
        info: String,
    },

    #[error("Conduit call {method} failed")]
    Http {
        method: String,
        #[source]
        source: HttpError,
    },

    #[error("Unable to update Phabricator task {task_id}")]
    TaskUpdate {
        task_id: String,
        #[source]
        source: Box<PhabricatorError>,
    },
}

/// Transport for Conduit method calls.
pub trait Conduit {
    /// Call `method` with form-encoded `params` and return its `result`.
    fn call(&self, method: &str, params: &[(String, String)]) -> Result<Value, PhabricatorError>;
}

/// Bot credentials, as found in the bot config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotCredentials {
    /// API base URL, e.g. `https://phabricator.example.com/api/`.
    pub host: String,
    pub username: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
struct ConduitResponse {
    #[serde(default)]
    result: Value,
    error_code: Option<String>,
    error_info: Option<String>,
}

/// Conduit over HTTP, authenticated with an API token.
#[derive(Debug, Clone)]
pub struct ConduitClient {
    credentials: BotCredentials,
    session: HttpSession,
}

impl ConduitClient {
    pub fn new(credentials: BotCredentials) -> Result<Self, PhabricatorError> {
        let session =
            HttpSession::new("wmflib::phabricator::Phabricator").map_err(PhabricatorError::Client)?;
        Ok(Self {
            credentials,
            session,
        })
    }

    fn method_url(&self, method: &str) -> String {
        let host = &self.credentials.host;
        if host.ends_with('/') {
            format!("{host}{method}")
        } else {
            format!("{host}/{method}")
        }
    }
}

impl Conduit for ConduitClient {
    fn call(&self, method: &str, params: &[(String, String)]) -> Result<Value, PhabricatorError> {
        let mut form: Vec<(&str, &str)> = vec![("api.token", self.credentials.token.as_str())];
        form.extend(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let http_err = |source| PhabricatorError::Http {
            method: method.to_string(),
            source,
        };
        let response = self
            .session
            .post_form(&self.method_url(method), &form)
            .map_err(http_err)?;
        if !response.is_ok() {
            return Err(PhabricatorError::Status {
                method: method.to_string(),
                code: response.status,
            });
        }

        let reply: ConduitResponse = response.json().map_err(http_err)?;
        if let Some(code) = reply.error_code {
            return Err(PhabricatorError::Conduit {
                method: method.to_string(),
                code,
                info: reply.error_info.unwrap_or_default(),
            });
        }
        Ok(reply.result)
    }
}

/// Read the bot credentials from `section` of the INI file `bot_config_file`.
///
/// ```text
/// [phabricator_bot]
/// host = https://phabricator.example.com/api/
/// username = phab-bot
/// token = api-12345
/// ```
pub fn read_credentials(
    bot_config_file: &Path,
    section: &str,
) -> Result<BotCredentials, PhabricatorError> {
    let file = bot_config_file.display().to_string();
    let ini = load_ini_config(bot_config_file, true)?;
    let props = ini
        .section(Some(section))
        .ok_or_else(|| PhabricatorError::MissingSection {
            section: section.to_string(),
            file: file.clone(),
        })?;

    let get = |option: &str| props.get(option).map(str::to_string);
    match (get("host"), get("username"), get("token")) {
        (Some(host), Some(username), Some(token)) => Ok(BotCredentials {
            host,
            username,
            token,
        }),
        _ => Err(PhabricatorError::MissingOptions {
            section: section.to_string(),
            file,
        }),
    }
}

/// Build a Phabricator client from the bot config file.
pub fn create_phabricator(
    bot_config_file: &Path,
    section: &str,
    dry_run: bool,
) -> Result<Phabricator, PhabricatorError> {
    let credentials = read_credentials(bot_config_file, section)?;
    Ok(Phabricator::new(ConduitClient::new(credentials)?, dry_run))
}

/// A Phabricator website.
#[derive(Debug, Clone)]
pub struct Phabricator<C = ConduitClient> {
    client: C,
    dry_run: bool,
}

impl<C: Conduit> Phabricator<C> {
    pub fn new(client: C, dry_run: bool) -> Self {
        Self { client, dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Add `comment` to the task `task_id` (e.g. `T12345`). Only logs in dry-run.
    pub fn task_comment(&self, task_id: &str, comment: &str) -> Result<(), PhabricatorError> {
        if self.dry_run {
            tracing::debug!(
                "Skip updating Phabricator task {} in DRY-RUN with comment: {}",
                task_id,
                comment
            );
            return Ok(());
        }

        let params = [
            ("objectIdentifier".to_string(), task_id.to_string()),
            ("transactions[0][type]".to_string(), "comment".to_string()),
            ("transactions[0][value]".to_string(), comment.to_string()),
        ];
        self.client
            .call("maniphest.edit", &params)
            .map_err(|source| PhabricatorError::TaskUpdate {
                task_id: task_id.to_string(),
                source: Box::new(source),
            })?;
        tracing::info!("Updated Phabricator task {}", task_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;

    #[derive(Default)]
    struct RecordingConduit {
        calls: RefCell<Vec<(String, Vec<(String, String)>)>>,
        fail: bool,
    }

    impl Conduit for RecordingConduit {
        fn call(&self, method: &str, params: &[(String, String)]) -> Result<Value, PhabricatorError> {
            self.calls
                .borrow_mut()
                .push((method.to_string(), params.to_vec()));
            if self.fail {
                return Err(PhabricatorError::Conduit {
                    method: method.to_string(),
                    code: "ERR-CONDUIT-CORE".into(),
                    info: "boom".into(),
                });
            }
            Ok(Value::Null)
        }
    }

    fn write_config(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.ini");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn dry_run_does_not_call_conduit() {
        let phab = Phabricator::new(RecordingConduit::default(), true);
        phab.task_comment("T12345", "Message").unwrap();
        assert!(phab.client.calls.borrow().is_empty());
    }

    #[test]
    fn comment_is_a_maniphest_edit_transaction() {
        let phab = Phabricator::new(RecordingConduit::default(), false);
        phab.task_comment("T12345", "Message").unwrap();
        let calls = phab.client.calls.borrow();
        assert_eq!(calls.len(), 1);
        let (method, params) = &calls[0];
        assert_eq!(method, "maniphest.edit");
        assert!(params.contains(&("objectIdentifier".into(), "T12345".into())));
        assert!(params.contains(&("transactions[0][type]".into(), "comment".into())));
        assert!(params.contains(&("transactions[0][value]".into(), "Message".into())));
    }

    #[test]
    fn conduit_failure_names_the_task() {
        let phab = Phabricator::new(
            RecordingConduit {
                fail: true,
                ..Default::default()
            },
            false,
        );
        let err = phab.task_comment("T1", "x").unwrap_err();
        assert_eq!(err.to_string(), "Unable to update Phabricator task T1");
    }

    #[test]
    fn credentials_are_read_from_section() {
        let (_dir, path) = write_config(
            "[phabricator_bot]\nhost = https://phab.example.org/api/\nusername = bot\ntoken = api-123\n",
        );
        let creds = read_credentials(&path, DEFAULT_SECTION).unwrap();
        assert_eq!(
            creds,
            BotCredentials {
                host: "https://phab.example.org/api/".into(),
                username: "bot".into(),
                token: "api-123".into(),
            }
        );
    }

    #[test]
    fn missing_section_is_reported() {
        let (_dir, path) = write_config("[other]\nhost = h\n");
        let err = read_credentials(&path, DEFAULT_SECTION).unwrap_err();
        assert!(matches!(err, PhabricatorError::MissingSection { .. }));
        assert!(err.to_string().contains("Unable to find section phabricator_bot"));
    }

    #[test]
    fn missing_option_is_reported() {
        let (_dir, path) = write_config("[phabricator_bot]\nhost = h\nusername = u\n");
        let err = read_credentials(&path, DEFAULT_SECTION).unwrap_err();
        assert!(matches!(err, PhabricatorError::MissingOptions { .. }));
    }

    #[test]
    fn missing_file_is_a_missing_section() {
        let dir = tempfile::tempdir().unwrap();
        let err = create_phabricator(&dir.path().join("nope.ini"), DEFAULT_SECTION, true).unwrap_err();
        assert!(matches!(err, PhabricatorError::MissingSection { .. }));
    }

    #[test]
    fn create_keeps_dry_run_flag() {
        let (_dir, path) = write_config(
            "[phabricator_bot]\nhost = https://phab.example.org/api/\nusername = bot\ntoken = api-123\n",
        );
        let phab = create_phabricator(&path, DEFAULT_SECTION, true).unwrap();
        assert!(phab.is_dry_run());
        assert_eq!(
            phab.client.method_url("maniphest.edit"),
            "https://phab.example.org/api/maniphest.edit"
        );
    }
}
