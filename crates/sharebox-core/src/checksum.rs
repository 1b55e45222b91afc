//! Content digests for shared files.
//!
//! Sidecars store MD5 digests as 32 lowercase hex characters. MD5 is kept for
//! compatibility with existing `.md5` sidecars; the digest identifies content,
//! it does not authenticate it.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use tracing::{instrument, trace};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Raw MD5 digest of a file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 16]);

impl ContentDigest {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Lowercase hex rendering, as persisted in sidecars.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Digest an in-memory buffer.
pub fn digest_bytes(data: impl AsRef<[u8]>) -> ContentDigest {
    ContentDigest(md5::compute(data).0)
}

/// Stream a reader through MD5 until EOF.
pub fn digest_reader<R: Read>(mut reader: R) -> io::Result<ContentDigest> {
    let mut context = md5::Context::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => context.consume(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    let digest: md5::Digest = context.into();
    Ok(ContentDigest(digest.0))
}

/// Digest the full content of the file at `path`.
#[instrument(level = "trace", fields(path = %path.display()))]
pub fn digest_file(path: &Path) -> io::Result<ContentDigest> {
    let file = File::open(path)?;
    let digest = digest_reader(file)?;
    trace!(digest = %digest, "File digested");
    Ok(digest)
}
