// Layered configuration.
//
// Settings come from, lowest precedence first: built-in defaults, a YAML
// config file, `CAMCOG_*` environment variables, and command-line flags.
// File keys are matched case-insensitively. `Settings` is the partial form
// used while layering; `Settings::resolve` validates it into a `Config` that
// is handed to the API client and the pipeline explicitly.

use crate::error::CamcogError;
use crate::model::SubjectQuery;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "eldrix-camcog/1";
pub const ENV_PREFIX: &str = "CAMCOG_";

const CONFIG_FILE_NAMES: [&str; 2] = ["config.yml", "config.yaml"];

// Lower-cased config file keys.
const KNOWN_KEYS: [&str; 10] = [
    "baseurl",
    "username",
    "password",
    "useragent",
    "groupdef",
    "organisation",
    "studyid",
    "site",
    "studydef",
    "timeout",
];

/// Connection settings for the remote service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub base_url: Url,
    pub username: String,
    pub password: String,
    pub user_agent: String,
    pub timeout: Option<Duration>,
}

/// Study and organisation parameters applied to every subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudySettings {
    pub group_def: String,
    pub organisation: String,
    pub study_id: String,
    pub site: String,
    pub study_def: String,
}

impl StudySettings {
    pub fn query(&self, subject_id: &str) -> SubjectQuery {
        SubjectQuery {
            group_def: self.group_def.clone(),
            organisation: self.organisation.clone(),
            study_id: self.study_id.clone(),
            site: self.site.clone(),
            study_def: self.study_def.clone(),
            subject_id: subject_id.to_string(),
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub service: ServiceConfig,
    pub study: StudySettings,
}

/// One layer of configuration. Every key is optional until resolved.
/// Field names are the lower-cased file keys (`baseURL` -> `baseurl`).
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Settings {
    #[serde(rename = "baseurl")]
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "useragent")]
    pub user_agent: Option<String>,
    #[serde(rename = "groupdef")]
    pub group_def: Option<String>,
    pub organisation: Option<String>,
    #[serde(rename = "studyid")]
    pub study_id: Option<String>,
    pub site: Option<String>,
    #[serde(rename = "studydef")]
    pub study_def: Option<String>,
    /// Request timeout in seconds.
    pub timeout: Option<u64>,
}

impl Settings {
    /// Read a YAML config file. An empty file is an empty layer.
    pub fn from_file(path: &Path) -> Result<Self, CamcogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CamcogError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents).map_err(|source| CamcogError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse YAML config text. Keys are matched ignoring case; unknown
    /// keys are logged and skipped.
    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Settings::default());
        }
        let value = match serde_yaml::from_str::<serde_yaml::Value>(contents)? {
            serde_yaml::Value::Mapping(mapping) => {
                let mut lowered = serde_yaml::Mapping::new();
                for (key, value) in mapping {
                    let key = match key {
                        serde_yaml::Value::String(key) => key.to_lowercase(),
                        other => {
                            tracing::warn!(key = ?other, "ignoring non-string config key");
                            continue;
                        }
                    };
                    if !KNOWN_KEYS.contains(&key.as_str()) {
                        tracing::warn!(%key, "ignoring unrecognised config key");
                        continue;
                    }
                    lowered.insert(serde_yaml::Value::String(key), value);
                }
                serde_yaml::Value::Mapping(lowered)
            }
            serde_yaml::Value::Null => return Ok(Settings::default()),
            other => other,
        };
        serde_yaml::from_value(value)
    }

    /// Read the `CAMCOG_*` environment variables.
    pub fn from_env() -> Result<Self, CamcogError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a layer from an environment-like lookup. Keys are
    /// `CAMCOG_` followed by the upper-cased config key; empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CamcogError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(&format!("{ENV_PREFIX}{key}")).filter(|value| !value.is_empty())
        };
        let timeout = match get("TIMEOUT") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                CamcogError::Config(format!("{ENV_PREFIX}TIMEOUT must be a whole number of seconds, got {raw:?}"))
            })?),
            None => None,
        };
        Ok(Settings {
            base_url: get("BASEURL"),
            username: get("USERNAME"),
            password: get("PASSWORD"),
            user_agent: get("USERAGENT"),
            group_def: get("GROUPDEF"),
            organisation: get("ORGANISATION"),
            study_id: get("STUDYID"),
            site: get("SITE"),
            study_def: get("STUDYDEF"),
            timeout,
        })
    }

    /// Overlay `higher` on top of `self`; keys set in `higher` win.
    pub fn merge(self, higher: Settings) -> Settings {
        Settings {
            base_url: higher.base_url.or(self.base_url),
            username: higher.username.or(self.username),
            password: higher.password.or(self.password),
            user_agent: higher.user_agent.or(self.user_agent),
            group_def: higher.group_def.or(self.group_def),
            organisation: higher.organisation.or(self.organisation),
            study_id: higher.study_id.or(self.study_id),
            site: higher.site.or(self.site),
            study_def: higher.study_def.or(self.study_def),
            timeout: higher.timeout.or(self.timeout),
        }
    }

    /// Load every layer: config file (explicit or discovered), environment,
    /// then `overrides` from the command line.
    pub fn load(explicit: Option<&Path>, overrides: Settings) -> Result<Self, CamcogError> {
        let file = match find_config_file(explicit)? {
            Some(path) => {
                tracing::debug!(path = %path.display(), "reading config file");
                Settings::from_file(&path)?
            }
            None => {
                tracing::debug!("no config file found, using environment and flags only");
                Settings::default()
            }
        };
        Ok(file.merge(Settings::from_env()?).merge(overrides))
    }

    /// The username, or the configuration error `resolve` would report.
    pub fn require_username(&self) -> Result<&str, CamcogError> {
        self.username
            .as_deref()
            .ok_or_else(|| CamcogError::Config("missing username".into()))
    }

    /// Validate into a [`Config`]. Base address and credentials are required.
    pub fn resolve(self) -> Result<Config, CamcogError> {
        let username = self.require_username()?.to_string();
        let raw_url = self
            .base_url
            .ok_or_else(|| CamcogError::Config("missing baseURL".into()))?;
        let base_url = Url::parse(&raw_url).map_err(|source| CamcogError::InvalidBaseUrl {
            url: raw_url.clone(),
            source,
        })?;
        let password = self
            .password
            .ok_or_else(|| CamcogError::Config("missing password".into()))?;
        let timeout = match self.timeout {
            Some(0) => return Err(CamcogError::Config("timeout must be greater than zero".into())),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        Ok(Config {
            service: ServiceConfig {
                base_url,
                username,
                password,
                user_agent: self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
                timeout,
            },
            study: StudySettings {
                group_def: self.group_def.unwrap_or_default(),
                organisation: self.organisation.unwrap_or_default(),
                study_id: self.study_id.unwrap_or_default(),
                site: self.site.unwrap_or_default(),
                study_def: self.study_def.unwrap_or_default(),
            },
        })
    }
}

/// Directories searched for a config file, in order.
pub fn search_dirs() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/camcog")];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".camcog"));
    }
    paths.push(PathBuf::from("."));
    paths
}

/// An explicit path must exist; otherwise the first existing file in
/// [`search_dirs`] is used, if any.
pub fn find_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>, CamcogError> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(CamcogError::ConfigRead {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        }
        return Ok(Some(path.to_path_buf()));
    }
    Ok(first_existing(&search_dirs()))
}

fn first_existing(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}
