use serde::{Deserialize, Serialize};

pub const SHA256_PREFIX: &str = "sha256:";

/// Verified description of one upstream release, ready for a buildpack dependency list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyMetadata {
    pub id: String,
    pub name: String,
    pub version: String,
    pub cpe: String,

    /// `sha256:<hex>` of the verified archive.
    pub checksum: String,

    pub source: String,

    /// Same digest as `checksum`; the archive is both source and artifact.
    #[serde(rename = "source-checksum")]
    pub source_checksum: String,

    pub uri: String,
    pub purl: String,
    pub licenses: Vec<String>,
    pub stacks: Vec<String>,

    #[serde(rename = "strip-components")]
    pub strip_components: u32,

    #[serde(
        rename = "deprecation_date",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub deprecation_date: Option<String>,
}

/// CPE 2.3 name of an application release.
pub fn cpe(vendor: &str, product: &str, version: &str) -> String {
    format!("cpe:2.3:a:{vendor}:{product}:{version}:*:*:*:*:*:*:*")
}

pub fn checksum_field(hex_digest: &str) -> String {
    format!("{SHA256_PREFIX}{hex_digest}")
}
