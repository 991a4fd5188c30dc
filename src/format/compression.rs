//! LZ4 framing for snapshots written to disk.

use crate::types::error::{SmemError, SmemResult};

/// Compress raw snapshot bytes with LZ4 (prepend size for decompression).
pub fn compress_bytes(data: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(data)
}

/// Decompress LZ4-compressed bytes produced by [`compress_bytes`].
pub fn decompress_bytes(data: &[u8]) -> SmemResult<Vec<u8>> {
    lz4_flex::decompress_size_prepended(data).map_err(|e| SmemError::Compression(e.to_string()))
}
