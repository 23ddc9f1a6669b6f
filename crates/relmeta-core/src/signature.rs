//! Detached OpenPGP signature verification against a set of candidate keys.
//!
//! Verification succeeds when any one candidate validates the signature over the
//! file's exact bytes. Every candidate that was tried is recorded in a
//! [`VerificationReport`], so callers can tell a malformed key apart from a key
//! that simply did not sign the file.

use std::{fmt, fs, io::Cursor, path::Path};

use miette::Diagnostic;
use pgp::{types::PublicKeyTrait, Deserializable, SignedPublicKey, StandaloneSignature};
use thiserror::Error;

/// What happened when one candidate key was tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The key text could not be parsed as an armored public key.
    Malformed(String),
    /// The key parsed but neither it nor its subkeys validated the signature.
    Rejected(String),
    Accepted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttempt {
    /// Position of the key in the candidate list.
    pub index: usize,
    /// Upper-case hex key ids of the primary keys found in the candidate.
    pub key_ids: Vec<String>,
    pub outcome: KeyOutcome,
}

impl fmt::Display for KeyAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key #{}", self.index)?;
        if !self.key_ids.is_empty() {
            write!(f, " ({})", self.key_ids.join(", "))?;
        }
        match &self.outcome {
            KeyOutcome::Malformed(reason) => write!(f, ": malformed: {reason}"),
            KeyOutcome::Rejected(reason) => write!(f, ": rejected: {reason}"),
            KeyOutcome::Accepted => write!(f, ": accepted"),
        }
    }
}

/// Per-key outcomes of one verification.
///
/// Keys are tried in order and trying stops at the first accepting key, so an
/// accepted report ends with its only [`KeyOutcome::Accepted`] attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    pub attempts: Vec<KeyAttempt>,
}

impl VerificationReport {
    pub fn is_verified(&self) -> bool {
        self.accepted().is_some()
    }

    pub fn accepted(&self) -> Option<&KeyAttempt> {
        self.attempts
            .iter()
            .find(|attempt| attempt.outcome == KeyOutcome::Accepted)
    }

    pub fn malformed(&self) -> impl Iterator<Item = &KeyAttempt> {
        self.attempts
            .iter()
            .filter(|attempt| matches!(attempt.outcome, KeyOutcome::Malformed(_)))
    }

    pub fn rejected(&self) -> impl Iterator<Item = &KeyAttempt> {
        self.attempts
            .iter()
            .filter(|attempt| matches!(attempt.outcome, KeyOutcome::Rejected(_)))
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum VerificationError {
    #[error("No trusted keys available")]
    #[diagnostic(
        code(relmeta::verification::no_keys),
        help("Configure at least one publisher key under `trust.key_urls`")
    )]
    NoKeys,

    #[error("Invalid detached signature: {reason}")]
    #[diagnostic(code(relmeta::verification::invalid_signature))]
    InvalidSignature { reason: String },

    #[error("Failed to read signed file `{path}`")]
    #[diagnostic(code(relmeta::verification::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No trusted key validated the signature")]
    #[diagnostic(
        code(relmeta::verification::untrusted),
        help("The artifact may have been tampered with, or the publisher key has rotated")
    )]
    Untrusted { report: VerificationReport },
}

impl VerificationError {
    /// Per-key outcomes, when keys were actually tried.
    pub fn report(&self) -> Option<&VerificationReport> {
        match self {
            Self::Untrusted { report } => Some(report),
            _ => None,
        }
    }
}

/// Checks the armored detached `signature` over the contents of `path` against each
/// of `keys` in turn.
///
/// An empty `keys` slice is a failure, never a pass. A malformed key is recorded
/// and skipped; it does not abort the check of the remaining keys.
pub fn verify_detached<K: AsRef<str>>(
    signature: &str,
    path: &Path,
    keys: &[K],
) -> Result<VerificationReport, VerificationError> {
    if keys.is_empty() {
        return Err(VerificationError::NoKeys);
    }

    let signature = parse_signature(signature)?;
    let content = fs::read(path).map_err(|source| {
        VerificationError::Io {
            path: path.display().to_string(),
            source,
        }
    })?;

    let mut report = VerificationReport::default();
    for (index, armored) in keys.iter().enumerate() {
        let public_keys = match parse_keyring(armored.as_ref()) {
            Ok(public_keys) => public_keys,
            Err(reason) => {
                report.attempts.push(KeyAttempt {
                    index,
                    key_ids: Vec::new(),
                    outcome: KeyOutcome::Malformed(reason),
                });
                continue;
            }
        };

        let key_ids = public_keys
            .iter()
            .map(|key| hex::encode_upper(key.key_id()))
            .collect();
        let outcome = if public_keys
            .iter()
            .any(|key| verify_with(key, &signature, &content).is_ok())
        {
            KeyOutcome::Accepted
        } else {
            KeyOutcome::Rejected("signature does not match this key".to_string())
        };

        let accepted = outcome == KeyOutcome::Accepted;
        report.attempts.push(KeyAttempt {
            index,
            key_ids,
            outcome,
        });
        if accepted {
            return Ok(report);
        }
    }

    Err(VerificationError::Untrusted { report })
}

fn parse_signature(armored: &str) -> Result<StandaloneSignature, VerificationError> {
    StandaloneSignature::from_armor_single(Cursor::new(armored.as_bytes()))
        .map(|(signature, _headers)| signature)
        .map_err(|err| {
            VerificationError::InvalidSignature {
                reason: err.to_string(),
            }
        })
}

fn parse_keyring(armored: &str) -> Result<Vec<SignedPublicKey>, String> {
    let (keys, _headers) = SignedPublicKey::from_armor_many(Cursor::new(armored.as_bytes()))
        .map_err(|err| err.to_string())?;
    let keys = keys
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| err.to_string())?;
    if keys.is_empty() {
        return Err("no public key found".to_string());
    }
    Ok(keys)
}

/// Tries the primary key, then each subkey; publishers usually sign with a subkey.
fn verify_with(
    key: &SignedPublicKey,
    signature: &StandaloneSignature,
    content: &[u8],
) -> pgp::errors::Result<()> {
    let mut result = signature.verify(key, content);
    for subkey in &key.public_subkeys {
        if result.is_ok() {
            break;
        }
        result = signature.verify(subkey, content);
    }
    result
}
