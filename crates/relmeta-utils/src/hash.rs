use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use sha2::{Digest, Sha256};

use crate::error::{HashError, HashResult};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Calculates the SHA-256 checksum of a file.
///
/// The file is streamed through the hasher in fixed-size chunks, so memory use does not grow
/// with the file size. The digest is returned as a lowercase hex-encoded string.
///
/// # Arguments
///
/// * `file_path` - The path to the file to calculate the checksum for.
///
/// # Errors
///
/// * [`HashError::ReadFailed`] if the file cannot be opened or read.
///
/// # Example
///
/// ```no_run
/// use relmeta_utils::error::HashResult;
/// use relmeta_utils::hash::calculate_checksum;
///
/// fn main() -> HashResult<()> {
///     let checksum = calculate_checksum("/path/to/file")?;
///     println!("Checksum is {}", checksum);
///     Ok(())
/// }
/// ```
pub fn calculate_checksum<P: AsRef<Path>>(file_path: P) -> HashResult<String> {
    let file_path = file_path.as_ref();
    let read_failed = |err| {
        HashError::ReadFailed {
            path: file_path.to_path_buf(),
            source: err,
        }
    };

    let file = File::open(file_path).map_err(read_failed)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        match reader.read(&mut buffer).map_err(read_failed)? {
            0 => break,
            n => hasher.update(&buffer[..n]),
        }
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Calculates the SHA-256 checksum of an in-memory byte slice.
pub fn checksum_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
