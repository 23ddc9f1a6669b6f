use std::{env, path::PathBuf};

/// Returns the user's home directory.
///
/// Reads `HOME`, falling back to the filesystem root when it is unset.
pub fn home_dir() -> PathBuf {
    env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

/// Returns the user's config directory following the XDG Base Directory Specification.
///
/// This checks the `XDG_CONFIG_HOME` environment variable. If not set, it defaults to
/// `$HOME/.config`.
pub fn xdg_config_home() -> PathBuf {
    env::var("XDG_CONFIG_HOME")
        .ok()
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".config"))
}
