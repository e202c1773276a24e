use sha2::{Digest, Sha256};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// Number of leading bytes hashed to form a file's fingerprint.
///
/// Hashing only a bounded prefix keeps dedup cheap for large media files.
/// This is a duplicate-detection key, not an integrity check over the full
/// content.
pub const FINGERPRINT_PREFIX_LEN: usize = 8192;

/// Compute the dedup fingerprint of an open, seekable byte source.
///
/// Reads up to [`FINGERPRINT_PREFIX_LEN`] bytes from the start (fewer if the
/// source is shorter), hashes exactly the bytes read with SHA-256, and
/// returns the lowercase hex digest. The source is rewound to the start
/// afterwards so the same handle can stream the full content to the uploader.
pub async fn fingerprint<R>(source: &mut R) -> io::Result<String>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    let mut hasher = Sha256::new();
    let mut remaining = FINGERPRINT_PREFIX_LEN;
    let mut buf = [0u8; 4096];

    while remaining > 0 {
        let want = remaining.min(buf.len());
        let read = source.read(&mut buf[..want]).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
        remaining -= read;
    }

    source.rewind().await?;

    Ok(format!("{:x}", hasher.finalize()))
}
