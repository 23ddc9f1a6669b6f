//! Top-level driver: requested version in, verified metadata record out.

use std::collections::BTreeSet;

use relmeta_config::config::Config;
use relmeta_dl::{Release, ReleaseLocator};
use semver::Version;
use tracing::{debug, info};

use crate::{
    assembler::{AssembledDependency, MetadataAssembler},
    catalog::VersionCatalog,
    error::{RelmetaError, Stage},
    keys::KeySource,
    metadata::DependencyMetadata,
    tag::TagConvention,
    RelmetaResult,
};

pub struct Orchestrator<'a, L, K> {
    locator: &'a L,
    keys: &'a K,
    config: &'a Config,
    convention: TagConvention,
    catalog: VersionCatalog,
}

impl<'a, L, K> Orchestrator<'a, L, K>
where
    L: ReleaseLocator,
    K: KeySource,
{
    pub fn new(locator: &'a L, keys: &'a K, config: &'a Config) -> RelmetaResult<Self> {
        let convention = TagConvention::new(config.source.tag_prefix.as_str());
        let catalog = VersionCatalog::new(convention.clone(), config.minimum_version()?);
        Ok(Self {
            locator,
            keys,
            config,
            convention,
            catalog,
        })
    }

    pub fn convention(&self) -> &TagConvention {
        &self.convention
    }

    /// Versions that can be resolved, deduplicated and ordered.
    pub fn list_versions(&self) -> RelmetaResult<BTreeSet<Version>> {
        let source = &self.config.source;
        self.catalog
            .list_eligible_versions(self.locator, &source.owner, &source.repo)
    }

    /// Resolves `version` to its release and assembles the verified record.
    ///
    /// The release listing is matched on the exact tag `version` maps to, and the
    /// matched entry's assets are used as listed. The eligibility floor is not applied
    /// here.
    pub fn resolve(&self, version: &Version) -> RelmetaResult<AssembledDependency> {
        let source = &self.config.source;
        let tag = self.convention.tag_for(version);

        let releases = self
            .locator
            .list_releases(&source.owner, &source.repo)
            .map_err(|source| {
                RelmetaError::Fetch {
                    stage: Stage::ListReleases,
                    source,
                }
            })?;

        let release = releases
            .iter()
            .find(|release| release.tag() == tag)
            .ok_or_else(|| {
                RelmetaError::VersionNotFound {
                    version: version.clone(),
                    tag: tag.clone(),
                }
            })?;
        debug!("version {version} resolved to release {}", release.tag());

        let assembled = MetadataAssembler::new(self.locator, self.keys, self.config)
            .assemble(version, release)?;
        info!(
            "generated metadata for {} {}",
            self.config.dependency.id, version
        );
        Ok(assembled)
    }

    /// Produces exactly one verified record for `version`.
    pub fn generate_metadata(&self, version: &Version) -> RelmetaResult<DependencyMetadata> {
        self.resolve(version).map(|assembled| assembled.metadata)
    }
}

/// Parses a user-supplied version, tolerating the tag prefix.
pub fn parse_requested_version(input: &str, convention: &TagConvention) -> RelmetaResult<Version> {
    convention.parse_tag(input).map_err(|source| {
        RelmetaError::InvalidVersion {
            input: input.to_string(),
            source,
        }
    })
}
