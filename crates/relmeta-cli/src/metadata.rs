use std::path::Path;

use relmeta_config::config::Config;
use relmeta_core::{
    keys::KeySource,
    metadata::DependencyMetadata,
    orchestrator::{parse_requested_version, Orchestrator},
    RelmetaResult,
};
use relmeta_dl::ReleaseLocator;
use relmeta_utils::fs::write_file;
use tracing::{info, warn};

/// Resolves every requested version in order.
///
/// A version whose release ships no source archive is skipped with a warning unless
/// `strict` is set; any other failure aborts the batch.
pub fn generate_records<L, K>(
    locator: &L,
    keys: &K,
    config: &Config,
    versions: &[String],
    strict: bool,
) -> RelmetaResult<Vec<DependencyMetadata>>
where
    L: ReleaseLocator,
    K: KeySource,
{
    let orchestrator = Orchestrator::new(locator, keys, config)?;
    let mut records = Vec::with_capacity(versions.len());

    for input in versions {
        let version = parse_requested_version(input, orchestrator.convention())?;
        match orchestrator.generate_metadata(&version) {
            Ok(record) => records.push(record),
            Err(err) if err.is_no_source_code() && !strict => {
                warn!("skipping {version}: {err}");
            }
            Err(err) => return Err(err),
        }
    }

    Ok(records)
}

pub fn write_records(records: &[DependencyMetadata], output: Option<&Path>) -> RelmetaResult<()> {
    let json = serde_json::to_string_pretty(records)?;
    match output {
        Some(path) => {
            write_file(path, format!("{json}\n").as_bytes())?;
            info!("wrote {} record(s) to {}", records.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
