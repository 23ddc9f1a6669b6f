use semver::Version;

/// Mapping between semantic versions and upstream release tags.
///
/// Upstream tags a release `v<version>`; `prefix` holds the literal in front of the
/// version so other conventions can be configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagConvention {
    prefix: String,
}

impl Default for TagConvention {
    fn default() -> Self {
        Self::new("v")
    }
}

impl TagConvention {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Tag under which `version` is expected to be published.
    pub fn tag_for(&self, version: &Version) -> String {
        format!("{}{}", self.prefix, version)
    }

    /// Reads the version out of `tag`. The prefix is optional since early releases
    /// were tagged with the bare version.
    pub fn parse_tag(&self, tag: &str) -> Result<Version, semver::Error> {
        let raw = tag.trim();
        let raw = if self.prefix.is_empty() {
            raw
        } else {
            raw.strip_prefix(self.prefix.as_str()).unwrap_or(raw)
        };
        Version::parse(raw)
    }
}
