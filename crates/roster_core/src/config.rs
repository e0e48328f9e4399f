//! Persistence unit configuration.
//!
//! # Responsibility
//! - Load named persistence units from a TOML file.
//! - Fall back to the built-in in-memory `hello` unit when no file exists.
//!
//! # Invariants
//! - Unknown keys in the file are rejected, never ignored.
//! - An explicitly requested config file must exist.
//!
//! ```toml
//! [units.hello]
//! database = "roster.db"   # or ":memory:"
//! log_level = "info"
//! log_dir = "/var/log/roster"
//! ```

use crate::db::DatabaseLocation;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Unit used when none is named.
pub const DEFAULT_UNIT: &str = "hello";
/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "roster.toml";
/// Overrides the config file path.
pub const CONFIG_PATH_ENV: &str = "ROSTER_CONFIG";
/// Overrides the unit name.
pub const UNIT_ENV: &str = "ROSTER_UNIT";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    UnknownUnit {
        name: String,
        available: Vec<String>,
    },
    /// A declared unit carries an unusable value.
    InvalidUnit {
        name: String,
        message: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::UnknownUnit { name, available } => write!(
                f,
                "persistence unit `{name}` is not configured (available: {})",
                available.join(", ")
            ),
            Self::InvalidUnit { name, message } => {
                write!(f, "persistence unit `{name}` is invalid: {message}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::UnknownUnit { .. } | Self::InvalidUnit { .. } => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    units: BTreeMap<String, UnitSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UnitSection {
    database: String,
    log_level: Option<String>,
    log_dir: Option<PathBuf>,
}

/// Named database plus the logging settings that go with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceUnit {
    pub name: String,
    pub location: DatabaseLocation,
    /// `None` means the build-mode default.
    pub log_level: Option<String>,
    /// `None` means log to stderr.
    pub log_dir: Option<PathBuf>,
}

impl PersistenceUnit {
    /// In-memory unit with default logging.
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: DatabaseLocation::Memory,
            log_level: None,
            log_dir: None,
        }
    }

    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: DatabaseLocation::File(path.into()),
            log_level: None,
            log_dir: None,
        }
    }
}

/// Parses every unit declared in `text`.
pub fn parse_units(text: &str) -> ConfigResult<BTreeMap<String, PersistenceUnit>> {
    let file: ConfigFile = toml::from_str(text)?;
    file.units
        .into_iter()
        .map(|(name, section)| {
            let location = DatabaseLocation::parse(&section.database).map_err(|message| {
                ConfigError::InvalidUnit {
                    name: name.clone(),
                    message,
                }
            })?;
            let unit = PersistenceUnit {
                name: name.clone(),
                location,
                log_level: section.log_level,
                log_dir: section.log_dir,
            };
            Ok((name, unit))
        })
        .collect()
}

/// Loads unit `name`.
///
/// With `path = None` the default file is tried; when it does not exist the
/// built-in `hello` unit is the only one available.
pub fn load_unit(path: Option<&Path>, name: &str) -> ConfigResult<PersistenceUnit> {
    let mut units = match path {
        Some(path) => parse_units(&read_config(path)?)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                parse_units(&read_config(default_path)?)?
            } else {
                builtin_units()
            }
        }
    };

    units.remove(name).ok_or_else(|| ConfigError::UnknownUnit {
        name: name.to_string(),
        available: units.keys().cloned().collect(),
    })
}

/// Resolves the unit from `ROSTER_CONFIG` / `ROSTER_UNIT`.
pub fn load_unit_from_env() -> ConfigResult<PersistenceUnit> {
    let path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    let name = std::env::var(UNIT_ENV).unwrap_or_else(|_| DEFAULT_UNIT.to_string());
    load_unit(path.as_deref(), &name)
}

fn builtin_units() -> BTreeMap<String, PersistenceUnit> {
    BTreeMap::from([(
        DEFAULT_UNIT.to_string(),
        PersistenceUnit::in_memory(DEFAULT_UNIT),
    )])
}

fn read_config(path: &Path) -> ConfigResult<String> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
