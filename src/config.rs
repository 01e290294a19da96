use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tracing::debug;

use crate::{error::ConfigError, exporter::SinkKind, resource::Resource};

pub const DEFAULT_PREFIX: &str = "fitness";
pub const ACCESS_TOKEN_VAR: &str = "FITBIT_ACCESS_TOKEN";
pub const EXPORTER_HOME_VAR: &str = "FITBIT_EXPORTER_HOME";
const EXPORTER_HOME_DIR: &str = ".fitbit-exporter";
const CREDENTIAL_STORE: &str = "client_secrets.json";

/// Where and how batches are written. Fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkTarget {
    pub host: String,
    pub port: u16,
    pub prefix: String,
    pub tags: Vec<String>,
}
impl SinkTarget {
    pub fn prefixed(&self, name: &str) -> String {
        format!("{}.{name}", self.prefix)
    }
}

/// Split `host:port` on the last colon.
pub fn parse_address(s: &str) -> Result<(String, u16), ConfigError> {
    let (host, port) = s
        .rsplit_once(':')
        .ok_or_else(|| ConfigError::Address(s.to_owned()))?;
    let port = port
        .parse()
        .map_err(|_| ConfigError::Address(s.to_owned()))?;
    if host.is_empty() {
        return Err(ConfigError::Address(s.to_owned()));
    }
    Ok((host.to_owned(), port))
}

/// Tags are kept verbatim; nothing is escaped.
pub fn parse_tag(s: &str) -> Result<String, ConfigError> {
    match s.split_once('=') {
        Some((key, _)) if !key.is_empty() => Ok(s.to_owned()),
        _ => Err(ConfigError::Tag(s.to_owned())),
    }
}

/// `YYYY-MM-DD`, or `today` in the local calendar.
pub fn parse_date(s: &str) -> Result<NaiveDate, ConfigError> {
    if s.eq_ignore_ascii_case("today") {
        return Ok(Local::now().date_naive());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ConfigError::Date(s.to_owned()))
}

/// Span of a body time series request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    #[default]
    OneDay,
    SevenDays,
    ThirtyDays,
    OneWeek,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    Max,
}
impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::SevenDays => "7d",
            Self::ThirtyDays => "30d",
            Self::OneWeek => "1w",
            Self::OneMonth => "1m",
            Self::ThreeMonths => "3m",
            Self::SixMonths => "6m",
            Self::OneYear => "1y",
            Self::Max => "max",
        }
    }
}
impl FromStr for Period {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "1d" => Self::OneDay,
            "7d" => Self::SevenDays,
            "30d" => Self::ThirtyDays,
            "1w" => Self::OneWeek,
            "1m" => Self::OneMonth,
            "3m" => Self::ThreeMonths,
            "6m" => Self::SixMonths,
            "1y" => Self::OneYear,
            "max" => Self::Max,
            _ => return Err(ConfigError::Period(s.to_owned())),
        })
    }
}
impl core::fmt::Display for Period {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated inputs of one export run
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub date: NaiveDate,
    pub period: Period,
    pub resources: Vec<Resource>,
    pub sink_kind: SinkKind,
    pub sink: SinkTarget,
    pub api_base: String,
}
impl ExportConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resources.is_empty() {
            return Err(ConfigError::NoResources);
        }
        Ok(())
    }
}

/// `$FITBIT_EXPORTER_HOME`, or `~/.fitbit-exporter`, prepared by [`prepare_home`].
pub fn exporter_home() -> Result<PathBuf, ConfigError> {
    let home = match std::env::var_os(EXPORTER_HOME_VAR) {
        Some(home) => PathBuf::from(home),
        None => dirs::home_dir()
            .ok_or(ConfigError::NoHome)?
            .join(EXPORTER_HOME_DIR),
    };
    prepare_home(&home)?;
    Ok(home)
}

/// Create `home` and an empty credential store in it when missing.
/// An existing store is left untouched.
pub fn prepare_home(home: &Path) -> Result<(), ConfigError> {
    let store_error = |path: &Path| {
        let path = path.to_owned();
        move |source| ConfigError::CredentialStore { path, source }
    };
    fs::create_dir_all(home).map_err(store_error(home))?;
    let store = home.join(CREDENTIAL_STORE);
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&store)
        .map_err(store_error(&store))?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct StoredCredentials {
    access_token: Option<String>,
}

/// Bearer token from the environment, falling back to the credential store in `home`.
///
/// The store is the JSON file written by the authorization flow; only its
/// `access_token` is read.
pub fn load_access_token(home: &Path) -> Result<String, ConfigError> {
    if let Some(token) = std::env::var(ACCESS_TOKEN_VAR).ok().filter(|t| !t.is_empty()) {
        debug!("using access token from {ACCESS_TOKEN_VAR}");
        return Ok(token);
    }
    read_credential_store(&home.join(CREDENTIAL_STORE))
}

pub fn read_credential_store(path: &Path) -> Result<String, ConfigError> {
    let missing = || ConfigError::MissingCredentials(path.to_owned());
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(missing()),
        Err(source) => {
            return Err(ConfigError::CredentialStore {
                path: path.to_owned(),
                source,
            })
        }
    };
    if contents.trim().is_empty() {
        return Err(missing());
    }
    let stored: StoredCredentials =
        serde_json::from_str(&contents).map_err(|source| ConfigError::CredentialFormat {
            path: path.to_owned(),
            source,
        })?;
    debug!(path = %path.display(), "using access token from credential store");
    stored
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(missing)
}
