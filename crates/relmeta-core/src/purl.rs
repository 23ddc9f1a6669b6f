//! Package URL (purl) rendering.

use std::{collections::BTreeMap, fmt};

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped in the name, namespace and version segments.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?')
    .add(b'@')
    .add(b'<')
    .add(b'>')
    .add(b'`');

/// Characters escaped in qualifier values. `%` is kept so URLs that are already
/// percent-encoded pass through unchanged.
const QUALIFIER: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'>')
    .add(b'`');

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUrl {
    kind: String,
    namespace: Option<String>,
    name: String,
    version: Option<String>,
    qualifiers: BTreeMap<String, String>,
}

impl PackageUrl {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into().to_lowercase(),
            namespace: None,
            name: name.into(),
            version: None,
            qualifiers: BTreeMap::new(),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Adds a qualifier; keys are lower-cased and qualifiers with an empty value are dropped.
    pub fn qualifier(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.qualifiers.insert(key.into().to_lowercase(), value);
        }
        self
    }
}

impl fmt::Display for PackageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkg:{}/", self.kind)?;
        if let Some(namespace) = &self.namespace {
            for segment in namespace.split('/').filter(|s| !s.is_empty()) {
                write!(f, "{}/", utf8_percent_encode(segment, SEGMENT))?;
            }
        }
        write!(f, "{}", utf8_percent_encode(&self.name, SEGMENT))?;
        if let Some(version) = &self.version {
            write!(f, "@{}", utf8_percent_encode(version, SEGMENT))?;
        }
        for (i, (key, value)) in self.qualifiers.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{key}={}", utf8_percent_encode(value, QUALIFIER))?;
        }
        Ok(())
    }
}

/// Generic purl for a release archive identified by its checksum and download URL.
pub fn generate_purl(name: &str, version: &str, checksum: &str, source: &str) -> String {
    PackageUrl::new("generic", name)
        .version(version)
        .qualifier("checksum", checksum)
        .qualifier("download_url", source)
        .to_string()
}
