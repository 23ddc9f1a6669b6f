use nu_ansi_term::Color::Green;
use relmeta_config::config::Config;
use relmeta_core::{keys::KeySource, orchestrator::Orchestrator, RelmetaResult};
use relmeta_dl::ReleaseLocator;
use semver::Version;
use tracing::info;

use crate::utils::Colored;

/// Eligible versions, newest first, optionally truncated to `limit`.
pub fn newest_first<I>(versions: I, limit: Option<usize>) -> Vec<Version>
where
    I: IntoIterator<Item = Version>,
    I::IntoIter: DoubleEndedIterator,
{
    let versions = versions.into_iter().rev();
    match limit {
        Some(limit) => versions.take(limit).collect(),
        None => versions.collect(),
    }
}

pub fn list_versions<L, K>(
    locator: &L,
    keys: &K,
    config: &Config,
    json_output: bool,
    limit: Option<usize>,
) -> RelmetaResult<()>
where
    L: ReleaseLocator,
    K: KeySource,
{
    let orchestrator = Orchestrator::new(locator, keys, config)?;
    let versions = newest_first(orchestrator.list_versions()?, limit);

    if json_output {
        let versions: Vec<String> = versions.iter().map(ToString::to_string).collect();
        println!("{}", serde_json::to_string_pretty(&versions)?);
        return Ok(());
    }

    for version in &versions {
        println!("{version}");
    }
    info!(
        "{} eligible version(s) of {}/{}",
        Colored(Green, versions.len()),
        config.source.owner,
        config.source.repo
    );
    Ok(())
}
