//! Discovery of the upstream versions metadata can be produced for.

use std::collections::BTreeSet;

use relmeta_dl::{Release, ReleaseLocator};
use semver::Version;
use tracing::{debug, trace};

use crate::{
    error::{RelmetaError, Stage},
    tag::TagConvention,
};

/// Filters upstream release tags down to the versions worth resolving.
///
/// A version is eligible when its tag parses as a semantic version, it is not a
/// pre-release and it is at or above `minimum`. Build metadata is kept, so two builds
/// of one release are distinct versions, each resolvable through its own tag.
#[derive(Debug, Clone)]
pub struct VersionCatalog {
    convention: TagConvention,
    minimum: Version,
}

impl VersionCatalog {
    pub fn new(convention: TagConvention, minimum: Version) -> Self {
        Self {
            convention,
            minimum,
        }
    }

    pub fn is_eligible(&self, version: &Version) -> bool {
        version.pre.is_empty() && *version >= self.minimum
    }

    /// Eligible versions among `releases`, deduplicated and ordered.
    pub fn eligible_versions<R: Release>(&self, releases: &[R]) -> BTreeSet<Version> {
        releases
            .iter()
            .filter_map(|release| {
                let tag = release.tag();
                match self.convention.parse_tag(tag) {
                    Ok(version) if self.is_eligible(&version) => Some(version),
                    Ok(version) => {
                        trace!("skipping ineligible release {tag} ({version})");
                        None
                    }
                    Err(err) => {
                        trace!("skipping unparsable tag {tag}: {err}");
                        None
                    }
                }
            })
            .collect()
    }

    /// Lists every eligible version published by `owner/repo`.
    ///
    /// Any failure to list releases fails the whole call; no partial set is returned.
    pub fn list_eligible_versions<L: ReleaseLocator>(
        &self,
        locator: &L,
        owner: &str,
        repo: &str,
    ) -> Result<BTreeSet<Version>, RelmetaError> {
        let releases = locator
            .list_releases(owner, repo)
            .map_err(|source| {
                RelmetaError::Fetch {
                    stage: Stage::ListReleases,
                    source,
                }
            })?;

        let versions = self.eligible_versions(&releases);
        debug!(
            "{} of {} releases of {owner}/{repo} are eligible (minimum {})",
            versions.len(),
            releases.len(),
            self.minimum
        );
        Ok(versions)
    }
}
