use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(relmeta_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(relmeta_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Failed to read config file `{}`", path.display())]
    #[diagnostic(code(relmeta_config::io))]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid minimum version `{value}`")]
    #[diagnostic(
        code(relmeta_config::minimum_version),
        help("Use a full semantic version such as `0.7.0`")
    )]
    InvalidMinimumVersion {
        value: String,
        #[source]
        source: semver::Error,
    },

    #[error("No trusted key URLs configured")]
    #[diagnostic(
        code(relmeta_config::no_trusted_keys),
        help("Add at least one entry to `trust.key_urls`")
    )]
    NoTrustedKeys,

    #[error("Asset template `{0}` does not contain `{{tag}}`")]
    #[diagnostic(
        code(relmeta_config::asset_template),
        help("The template must reference the release tag, e.g. `yarn-{{tag}}.tar.gz`")
    )]
    InvalidAssetTemplate(String),

    #[error("Invalid timeout `{0}`")]
    #[diagnostic(
        code(relmeta_config::timeout),
        help("Use a duration like `30s`, `2m`, `1h30m`, or `none` to disable")
    )]
    InvalidTimeout(String),

    #[error("Config field `{0}` must not be empty")]
    #[diagnostic(code(relmeta_config::empty_field))]
    EmptyField(&'static str),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
