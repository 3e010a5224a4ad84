//! Loading of YAML and INI configuration files.
//!
//! Both loaders can either fail loudly or fall back to an empty config,
//! which suits optional per-user files.

use ini::Ini;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not parse YAML config file {}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("could not parse INI config file {}", .path.display())]
    Ini {
        path: PathBuf,
        #[source]
        source: ini::ParseError,
    },
}

/// Parse a YAML config file.
///
/// An empty file yields an empty mapping. When `raises` is false any error is
/// logged at debug level and an empty mapping is returned instead.
pub fn load_yaml_config(path: impl AsRef<Path>, raises: bool) -> Result<Value, ConfigError> {
    let path = path.as_ref();
    match read_yaml(path) {
        Ok(Value::Null) => Ok(Value::Mapping(Mapping::new())),
        Ok(value) => Ok(value),
        Err(e) if raises => Err(e),
        Err(e) => {
            tracing::debug!("Could not load config file {}: {}", path.display(), e);
            Ok(Value::Mapping(Mapping::new()))
        }
    }
}

/// Parse a YAML config file straight into `T`.
pub fn load_yaml_config_as<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let data = read(path)?;
    serde_yaml::from_str(&data).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse an INI config file.
///
/// A missing file yields an empty config. Parse errors are returned when
/// `raises` is true, otherwise logged at debug level.
pub fn load_ini_config(path: impl AsRef<Path>, raises: bool) -> Result<Ini, ConfigError> {
    let path = path.as_ref();
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("INI config file {} not found, using an empty config", path.display());
            return Ok(Ini::new());
        }
        Err(source) if raises => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
        Err(e) => {
            tracing::debug!("Could not load config file {}: {}", path.display(), e);
            return Ok(Ini::new());
        }
    };

    match Ini::load_from_str(&data) {
        Ok(ini) => Ok(ini),
        Err(source) if raises => Err(ConfigError::Ini {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) => {
            tracing::debug!("Could not load config file {}: {}", path.display(), e);
            Ok(Ini::new())
        }
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_yaml(path: &Path) -> Result<Value, ConfigError> {
    let data = read(path)?;
    serde_yaml::from_str(&data).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}
