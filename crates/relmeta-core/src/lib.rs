//! Version discovery and artifact verification pipeline.
//!
//! Given a requested version, [`orchestrator::Orchestrator`] resolves it to an
//! upstream release, downloads the source archive, checks its detached signature
//! against the trusted publisher keys, hashes it and assembles a
//! [`metadata::DependencyMetadata`] record.

pub mod assembler;
pub mod catalog;
pub mod error;
pub mod keys;
pub mod license;
pub mod metadata;
pub mod orchestrator;
pub mod purl;
pub mod signature;
pub mod tag;

#[cfg(test)]
mod test_utils;

pub use error::RelmetaError;

pub type RelmetaResult<T> = std::result::Result<T, RelmetaError>;
