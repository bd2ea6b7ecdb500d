//! Chunk engine: splits files into fixed-size, SHA-256 addressed chunks and
//! describes the result as a [`Manifest`].

pub mod hash;
pub mod manifest;
pub mod splitter;

pub use hash::{hash_bytes, hash_reader};
pub use manifest::{Chunk, FileSummary, Manifest};
pub use splitter::{split_file, split_reader};

/// Default chunk size (512 KiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 512 * 1024;

/// Number of copies kept of every chunk.
pub const REPLICATION_FACTOR: usize = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_CHUNK_SIZE, 524_288);
        assert_eq!(REPLICATION_FACTOR, 2);
    }
}
