use std::io::Read;

use sha2::{Digest, Sha256};

/// Hex SHA-256 of `data`.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hex SHA-256 of everything `reader` yields.
pub fn hash_reader<R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Whether `data` hashes to `expected` (hex, case-insensitive).
pub fn verify(data: &[u8], expected: &str) -> bool {
    hash_bytes(data).eq_ignore_ascii_case(expected)
}
