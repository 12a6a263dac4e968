//! Content digests used for adjacent-snapshot deduplication.
//!
//! CRC-32 is not collision resistant. A collision only merges two adjacent
//! snapshots, and the merge always keeps the newer copy.

use async_trait::async_trait;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const READ_CHUNK: usize = 64 * 1024;

/// Compute the CRC-32 of a file's current content.
pub async fn hash_file(path: &Path) -> std::io::Result<u32> {
    let mut file = File::open(path).await?;
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finalize())
}

/// Digest used to detect snapshots of unchanged content.
///
/// The store hashes the artifact it just wrote, so the digest always
/// describes the bytes that are kept.
#[async_trait]
pub trait ContentHasher: Send + Sync {
    /// Digest the content of the file at `path`.
    async fn hash(&self, path: &Path) -> std::io::Result<u32>;
}

/// Streams the file through CRC-32.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32Hasher;

#[async_trait]
impl ContentHasher for Crc32Hasher {
    async fn hash(&self, path: &Path) -> std::io::Result<u32> {
        hash_file(path).await
    }
}
