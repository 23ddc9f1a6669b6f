use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use relmeta_utils::{path::xdg_config_home, time::parse_duration};
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};

pub const CONFIG_ENV: &str = "RELMETA_CONFIG";
pub const TAG_PLACEHOLDER: &str = "{tag}";

/// Application's configuration
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Where releases are published.
    pub source: SourceConfig,

    /// How a release is described in the emitted record.
    pub dependency: DependencyConfig,

    /// Publisher keys used to verify release signatures.
    pub trust: TrustConfig,

    /// HTTP client settings.
    pub network: NetworkConfig,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the GitHub API.
    /// Default: https://api.github.com
    pub api_url: String,

    /// Repository owner.
    pub owner: String,

    /// Repository name.
    pub repo: String,

    /// Literal prefix in front of the version in release tags.
    /// Default: "v"
    pub tag_prefix: String,

    /// Releases older than this never shipped a usable source archive.
    /// Default: 0.7.0
    pub minimum_version: String,

    /// Environment variables checked, in order, for an API token.
    /// Default: ["GITHUB_TOKEN", "GH_TOKEN"]
    pub token_env: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            owner: "yarnpkg".to_string(),
            repo: "yarn".to_string(),
            tag_prefix: "v".to_string(),
            minimum_version: "0.7.0".to_string(),
            token_env: vec!["GITHUB_TOKEN".to_string(), "GH_TOKEN".to_string()],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DependencyConfig {
    pub id: String,
    pub name: String,
    pub cpe_vendor: String,
    pub cpe_product: String,

    /// File name of the source archive; `{tag}` is replaced by the release tag.
    /// Default: "yarn-{tag}.tar.gz"
    pub asset_template: String,

    /// Appended to the archive name to get the detached signature.
    /// Default: ".asc"
    pub signature_suffix: String,

    pub stacks: Vec<String>,

    /// Leading path components to strip when extracting the archive.
    /// Default: 1
    pub strip_components: u32,
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            id: "yarn".to_string(),
            name: "Yarn".to_string(),
            cpe_vendor: "yarnpkg".to_string(),
            cpe_product: "yarn".to_string(),
            asset_template: "yarn-{tag}.tar.gz".to_string(),
            signature_suffix: ".asc".to_string(),
            stacks: vec![
                "io.buildpacks.stacks.bionic".to_string(),
                "io.buildpacks.stacks.jammy".to_string(),
            ],
            strip_components: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrustConfig {
    /// URLs serving armored public keys; each one is a verification candidate.
    /// Default: ["https://dl.yarnpkg.com/debian/pubkey.gpg"]
    pub key_urls: Vec<String>,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            key_urls: vec!["https://dl.yarnpkg.com/debian/pubkey.gpg".to_string()],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-request deadline, e.g. "30s" or "2m". "none" waits indefinitely.
    /// Unset keeps the HTTP client's built-in deadline.
    pub timeout: Option<String>,

    pub user_agent: Option<String>,

    pub proxy: Option<String>,
}

/// Request deadline selected by `network.timeout`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timeout {
    /// Not configured; the HTTP client keeps its own default.
    Default,
    Disabled,
    After(Duration),
}

/// Location of the config file: `$RELMETA_CONFIG`, else `$XDG_CONFIG_HOME/relmeta/config.toml`.
pub fn config_path() -> PathBuf {
    match std::env::var(CONFIG_ENV) {
        Ok(path_str) if !path_str.is_empty() => PathBuf::from(path_str),
        _ => xdg_config_home().join("relmeta").join("config.toml"),
    }
}

impl Config {
    /// Loads the configuration from [`config_path`].
    /// If the configuration file is not found, it uses the default configuration.
    pub fn new() -> Result<Self> {
        Self::load(config_path())
    }

    /// Loads and validates the configuration at `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config = match fs::read_to_string(path) {
            Ok(content) => {
                debug!("loading config from {}", path.display());
                toml::from_str(&content)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config at {}, using defaults", path.display());
                Self::default()
            }
            Err(err) => {
                return Err(ConfigError::IoError {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        };

        config.resolve()?;

        Ok(config)
    }

    /// Validates the configuration and normalizes derived values.
    pub fn resolve(&mut self) -> Result<()> {
        self.source.api_url = self.source.api_url.trim_end_matches('/').to_string();

        let required = [
            ("source.api_url", &self.source.api_url),
            ("source.owner", &self.source.owner),
            ("source.repo", &self.source.repo),
            ("dependency.id", &self.dependency.id),
            ("dependency.name", &self.dependency.name),
        ];
        if let Some(&(field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::EmptyField(field));
        }

        self.minimum_version()?;

        if !self.dependency.asset_template.contains(TAG_PLACEHOLDER) {
            return Err(ConfigError::InvalidAssetTemplate(
                self.dependency.asset_template.clone(),
            ));
        }

        self.trust.key_urls.retain(|url| !url.trim().is_empty());
        if self.trust.key_urls.is_empty() {
            return Err(ConfigError::NoTrustedKeys);
        }

        self.timeout()?;

        Ok(())
    }

    pub fn minimum_version(&self) -> Result<Version> {
        Version::parse(&self.source.minimum_version).map_err(|source| {
            ConfigError::InvalidMinimumVersion {
                value: self.source.minimum_version.clone(),
                source,
            }
        })
    }

    pub fn timeout(&self) -> Result<Timeout> {
        match self.network.timeout.as_deref() {
            None => Ok(Timeout::Default),
            Some("none") | Some("never") => Ok(Timeout::Disabled),
            Some(value) => {
                parse_duration(value)
                    .filter(|d| !d.is_zero())
                    .map(Timeout::After)
                    .ok_or_else(|| ConfigError::InvalidTimeout(value.to_string()))
            }
        }
    }

    /// Name of the source archive published under `tag`.
    pub fn asset_name(&self, tag: &str) -> String {
        self.dependency.asset_template.replace(TAG_PLACEHOLDER, tag)
    }

    /// Name of the detached signature published next to the source archive.
    pub fn signature_name(&self, tag: &str) -> String {
        format!("{}{}", self.asset_name(tag), self.dependency.signature_suffix)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
