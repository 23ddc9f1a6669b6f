//! Download, verification and assembly of one release's metadata record.

use std::path::{Path, PathBuf};

use relmeta_config::config::Config;
use relmeta_dl::{Asset, DownloadError, Release, ReleaseLocator};
use relmeta_utils::hash::calculate_checksum;
use semver::Version;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::{
    error::{ErrorContext, RelmetaError, Stage},
    keys::KeySource,
    license::lookup_licenses,
    metadata::{checksum_field, cpe, DependencyMetadata},
    purl::generate_purl,
    signature::{verify_detached, VerificationReport},
    RelmetaResult,
};

/// A record together with the signature check that admitted its artifact.
#[derive(Debug, Clone)]
pub struct AssembledDependency {
    pub metadata: DependencyMetadata,
    pub verification: VerificationReport,
}

/// Archive on local disk whose signature has been checked.
///
/// Only [`MetadataAssembler::fetch_verified`] builds one, so holding a value means the
/// bytes at `path` were accepted by a trusted key. Dropping it removes the file.
struct VerifiedArtifact {
    workdir: TempDir,
    path: PathBuf,
    source_url: String,
    report: VerificationReport,
}

impl VerifiedArtifact {
    fn path(&self) -> &Path {
        &self.path
    }
}

pub struct MetadataAssembler<'a, L, K> {
    locator: &'a L,
    keys: &'a K,
    config: &'a Config,
}

impl<'a, L, K> MetadataAssembler<'a, L, K>
where
    L: ReleaseLocator,
    K: KeySource,
{
    pub fn new(locator: &'a L, keys: &'a K, config: &'a Config) -> Self {
        Self {
            locator,
            keys,
            config,
        }
    }

    /// Builds the metadata record for `version`, published as `release`.
    ///
    /// Assets are taken from `release` as listed; the release is not looked up again.
    /// The archive is downloaded into a private temporary directory that is removed
    /// before this returns, whether it succeeds or not.
    pub fn assemble(
        &self,
        version: &Version,
        release: &L::Release,
    ) -> RelmetaResult<AssembledDependency> {
        let artifact = self.fetch_verified(version, release)?;

        let digest = calculate_checksum(artifact.path())?;
        debug!("sha256 of {} is {digest}", artifact.path().display());

        let licenses = lookup_licenses(artifact.path())
            .with_context(|| format!("reading licenses from {}", artifact.path().display()))?;

        let dependency = &self.config.dependency;
        let version_str = version.to_string();
        let checksum = checksum_field(&digest);
        let metadata = DependencyMetadata {
            id: dependency.id.clone(),
            name: dependency.name.clone(),
            cpe: cpe(&dependency.cpe_vendor, &dependency.cpe_product, &version_str),
            checksum: checksum.clone(),
            source: artifact.source_url.clone(),
            source_checksum: checksum,
            uri: artifact.source_url.clone(),
            purl: generate_purl(
                &dependency.id,
                &version_str,
                &digest,
                &artifact.source_url,
            ),
            licenses,
            stacks: dependency.stacks.clone(),
            strip_components: dependency.strip_components,
            deprecation_date: None,
            version: version_str,
        };

        let VerifiedArtifact { workdir, report, .. } = artifact;
        workdir
            .close()
            .with_context(|| "removing temporary download directory".to_string())?;

        info!("assembled {} {}", metadata.id, metadata.version);
        Ok(AssembledDependency {
            metadata,
            verification: report,
        })
    }

    fn fetch_verified(
        &self,
        version: &Version,
        release: &L::Release,
    ) -> RelmetaResult<VerifiedArtifact> {
        let tag = release.tag();
        let asset_name = self.config.asset_name(tag);
        let signature_name = self.config.signature_name(tag);

        let archive = release.find_asset(&asset_name).ok_or_else(|| {
            RelmetaError::NoSourceCode {
                version: version.clone(),
            }
        })?;

        let keys = self.keys.fetch_keys().map_err(|source| {
            RelmetaError::Fetch {
                stage: Stage::TrustedKeys,
                source,
            }
        })?;
        debug!("fetched {} trusted key(s)", keys.len());

        let workdir = tempfile::Builder::new()
            .prefix("relmeta-")
            .tempdir()
            .with_context(|| "creating temporary download directory".to_string())?;
        let path = workdir.path().join(&asset_name);

        let written = self.locator.download(archive, &path).map_err(|source| {
            RelmetaError::Fetch {
                stage: Stage::SourceArchive,
                source,
            }
        })?;
        debug!("downloaded {asset_name} ({written} bytes)");

        let source_url = self.source_url(archive.api_url())?;

        let signature = release
            .find_asset(&signature_name)
            .ok_or_else(|| {
                let source = &self.config.source;
                DownloadError::AssetNotFound {
                    project: format!("{}/{}", source.owner, source.repo),
                    tag: tag.to_string(),
                    asset: signature_name.clone(),
                }
            })
            .and_then(|asset| self.locator.fetch_bytes(asset))
            .map_err(|source| {
                RelmetaError::Fetch {
                    stage: Stage::Signature,
                    source,
                }
            })?;
        let signature = String::from_utf8_lossy(&signature);

        let report = verify_detached(&signature, &path, &keys).map_err(|source| {
            if let Some(report) = source.report() {
                warn_malformed(report);
            }
            RelmetaError::Verification {
                version: version.clone(),
                asset: asset_name.clone(),
                source,
            }
        })?;

        warn_malformed(&report);
        if let Some(accepted) = report.accepted() {
            debug!("{asset_name} verified by {accepted}");
        }

        Ok(VerifiedArtifact {
            workdir,
            path,
            source_url,
            report,
        })
    }

    /// Public download URL of the asset, read from the asset's API document.
    fn source_url(&self, asset_url: &str) -> RelmetaResult<String> {
        let metadata = self
            .locator
            .fetch_asset_metadata(asset_url)
            .map_err(|err| {
                match err {
                    DownloadError::InvalidJson { url, source } => {
                        RelmetaError::AssetMetadata {
                            url,
                            reason: source.to_string(),
                        }
                    }
                    other => {
                        RelmetaError::Fetch {
                            stage: Stage::AssetMetadata,
                            source: other,
                        }
                    }
                }
            })?;

        if metadata.browser_download_url.trim().is_empty() {
            return Err(RelmetaError::AssetMetadata {
                url: asset_url.to_string(),
                reason: "empty browser_download_url".to_string(),
            });
        }

        Ok(metadata.browser_download_url)
    }
}

/// A malformed trusted key is a configuration problem even when another key verified
/// the artifact.
fn warn_malformed(report: &VerificationReport) {
    for attempt in report.malformed() {
        warn!("skipped trusted {attempt}");
    }
}

#[cfg(test)]
mod tests {
    use relmeta_utils::hash::checksum_bytes;

    use super::*;
    use crate::{
        keys::StaticKeys,
        signature::{KeyOutcome, VerificationError},
        test_utils::{
            browser_url, release, FakeLocator, UnreachableKeys, ARCHIVE, ARCHIVE_SHA256,
            PUBLISHER_KEY, UNTRUSTED_KEY, UNTRUSTED_SIGNATURE,
        },
    };

    const TAG: &str = "v1.22.19";

    fn version() -> Version {
        Version::new(1, 22, 19)
    }

    fn publisher_keys() -> StaticKeys {
        StaticKeys(vec![PUBLISHER_KEY.to_string()])
    }

    #[test]
    fn test_assemble_verified_release() {
        let locator = FakeLocator::yarn_1_22_19();
        let keys = publisher_keys();
        let config = Config::default();

        let assembled = MetadataAssembler::new(&locator, &keys, &config)
            .assemble(&version(), &locator.listed(TAG))
            .unwrap();
        let metadata = assembled.metadata;
        let source = browser_url(TAG, "yarn-v1.22.19.tar.gz");

        assert_eq!(metadata.id, "yarn");
        assert_eq!(metadata.name, "Yarn");
        assert_eq!(metadata.version, "1.22.19");
        assert_eq!(metadata.cpe, "cpe:2.3:a:yarnpkg:yarn:1.22.19:*:*:*:*:*:*:*");
        assert_eq!(metadata.checksum, format!("sha256:{ARCHIVE_SHA256}"));
        assert_eq!(metadata.source_checksum, metadata.checksum);
        assert_eq!(metadata.source, source);
        assert_eq!(metadata.uri, source);
        assert_eq!(
            metadata.purl,
            format!("pkg:generic/yarn@1.22.19?checksum={ARCHIVE_SHA256}&download_url={source}")
        );
        assert_eq!(metadata.licenses, vec!["BSD-2-Clause"]);
        assert_eq!(
            metadata.stacks,
            vec!["io.buildpacks.stacks.bionic", "io.buildpacks.stacks.jammy"]
        );
        assert_eq!(metadata.strip_components, 1);
        assert!(metadata.deprecation_date.is_none());
        assert!(assembled.verification.is_verified());
    }

    #[test]
    fn test_fixture_digest() {
        assert_eq!(checksum_bytes(ARCHIVE), ARCHIVE_SHA256);
    }

    #[test]
    fn test_temporary_download_removed_after_success() {
        let locator = FakeLocator::yarn_1_22_19();
        let keys = publisher_keys();
        let config = Config::default();

        MetadataAssembler::new(&locator, &keys, &config)
            .assemble(&version(), &locator.listed(TAG))
            .unwrap();

        let downloaded = locator.last_download().unwrap();
        assert!(!downloaded.exists());
        assert!(!downloaded.parent().unwrap().exists());
    }

    #[test]
    fn test_missing_archive_is_no_source_code() {
        let locator = FakeLocator::new(vec![release("v0.8.0", &["yarn-legacy.js"])]);
        let keys = publisher_keys();
        let config = Config::default();

        let err = MetadataAssembler::new(&locator, &keys, &config)
            .assemble(&Version::new(0, 8, 0), &locator.listed("v0.8.0"))
            .unwrap_err();
        assert!(err.is_no_source_code());
        assert_eq!(err.to_string(), "No source code published for version 0.8.0");
        assert!(locator.last_download().is_none());
    }

    #[test]
    fn test_untrusted_signature_fails_and_cleans_up() {
        let locator = FakeLocator::yarn_1_22_19()
            .with_file("yarn-v1.22.19.tar.gz.asc", UNTRUSTED_SIGNATURE.as_bytes());
        let keys = publisher_keys();
        let config = Config::default();

        let err = MetadataAssembler::new(&locator, &keys, &config)
            .assemble(&version(), &locator.listed(TAG))
            .unwrap_err();
        match &err {
            RelmetaError::Verification { source, asset, .. } => {
                assert_eq!(asset, "yarn-v1.22.19.tar.gz");
                assert!(matches!(source, VerificationError::Untrusted { .. }));
            }
            other => panic!("expected verification failure, got {other:?}"),
        }

        let downloaded = locator.last_download().unwrap();
        assert!(!downloaded.exists());
    }

    #[test]
    fn test_tampered_archive_fails_verification() {
        let mut tampered = ARCHIVE.to_vec();
        tampered[100] ^= 0x01;
        let locator = FakeLocator::yarn_1_22_19().with_file("yarn-v1.22.19.tar.gz", &tampered);
        let keys = publisher_keys();
        let config = Config::default();

        let err = MetadataAssembler::new(&locator, &keys, &config)
            .assemble(&version(), &locator.listed(TAG))
            .unwrap_err();
        assert!(matches!(err, RelmetaError::Verification { .. }));
    }

    #[test]
    fn test_no_keys_fails_verification() {
        let locator = FakeLocator::yarn_1_22_19();
        let keys = StaticKeys::default();
        let config = Config::default();

        let err = MetadataAssembler::new(&locator, &keys, &config)
            .assemble(&version(), &locator.listed(TAG))
            .unwrap_err();
        assert!(matches!(
            err,
            RelmetaError::Verification {
                source: VerificationError::NoKeys,
                ..
            }
        ));
    }

    #[test]
    fn test_second_key_accepts_after_malformed_and_foreign_keys() {
        let locator = FakeLocator::yarn_1_22_19();
        let keys = StaticKeys(vec![
            "garbage".to_string(),
            UNTRUSTED_KEY.to_string(),
            PUBLISHER_KEY.to_string(),
        ]);
        let config = Config::default();

        let assembled = MetadataAssembler::new(&locator, &keys, &config)
            .assemble(&version(), &locator.listed(TAG))
            .unwrap();
        let outcomes: Vec<_> = assembled
            .verification
            .attempts
            .iter()
            .map(|attempt| &attempt.outcome)
            .collect();
        assert!(matches!(outcomes[0], KeyOutcome::Malformed(_)));
        assert!(matches!(outcomes[1], KeyOutcome::Rejected(_)));
        assert_eq!(outcomes[2], &KeyOutcome::Accepted);
    }

    #[test]
    fn test_key_fetch_failure_is_network_error() {
        let locator = FakeLocator::yarn_1_22_19();
        let config = Config::default();

        let err = MetadataAssembler::new(&locator, &UnreachableKeys, &config)
            .assemble(&version(), &locator.listed(TAG))
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::TrustedKeys));
        assert!(locator.last_download().is_none());
    }

    #[test]
    fn test_missing_signature_is_network_error() {
        let locator = FakeLocator::new(vec![release("v1.22.19", &["yarn-v1.22.19.tar.gz"])])
            .with_file("yarn-v1.22.19.tar.gz", ARCHIVE);
        let keys = publisher_keys();
        let config = Config::default();

        let err = MetadataAssembler::new(&locator, &keys, &config)
            .assemble(&version(), &locator.listed(TAG))
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Signature));
        assert!(!locator.last_download().unwrap().exists());
    }

    #[test]
    fn test_asset_metadata_without_download_url_is_parse_error() {
        let locator = FakeLocator::yarn_1_22_19()
            .with_metadata_json(r#"{"name": "yarn-v1.22.19.tar.gz", "size": 932}"#);
        let keys = publisher_keys();
        let config = Config::default();

        let err = MetadataAssembler::new(&locator, &keys, &config)
            .assemble(&version(), &locator.listed(TAG))
            .unwrap_err();
        assert!(matches!(err, RelmetaError::AssetMetadata { .. }));
    }
}
