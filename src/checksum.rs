// ABOUTME: Streaming MD5 digests of dump artifacts and the checksum manifest writer
// ABOUTME: Digests never load a whole file into memory

use crate::error::DumpError;
use anyhow::Result;
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Read size used when folding a file into its digest
pub const CHECKSUM_BUFFER_SIZE: usize = 1024 * 1024;

/// Compute the lowercase hex MD5 digest of a file
///
/// # Examples
///
/// ```no_run
/// # use inline_dumper::checksum::file_checksum;
/// let digest = file_checksum("shop/users.sql".as_ref())?;
/// assert_eq!(digest.len(), 32);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn file_checksum(path: &Path) -> Result<String> {
    file_checksum_with_buffer(path, CHECKSUM_BUFFER_SIZE)
}

/// Same as [`file_checksum`] with an explicit read size; the digest does not depend on it
pub fn file_checksum_with_buffer(path: &Path, buffer_size: usize) -> Result<String> {
    let mut file = File::open(path).map_err(|e| DumpError::io("open", path, e))?;

    let mut hasher = Md5::new();
    let mut buf = vec![0u8; buffer_size.max(1)];
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(DumpError::io("read", path, e).into()),
        };
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Append-only `<digest> <path>` ledger, one line per dumped artifact
pub struct ChecksumManifest<W: Write = File> {
    writer: W,
    path: PathBuf,
    entries: usize,
}

impl ChecksumManifest<File> {
    /// Create (or truncate) the manifest file for a run
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| DumpError::io("create", path, e))?;
        tracing::debug!("Opened checksum manifest {}", path.display());
        Ok(Self::from_writer(file, path))
    }
}

impl<W: Write> ChecksumManifest<W> {
    pub fn from_writer(writer: W, path: impl Into<PathBuf>) -> Self {
        Self {
            writer,
            path: path.into(),
            entries: 0,
        }
    }

    /// Append one line and flush it so an aborted run keeps every completed entry
    pub fn append(&mut self, digest: &str, relative_path: &str) -> Result<()> {
        writeln!(self.writer, "{} {}", digest, relative_path)
            .and_then(|_| self.writer.flush())
            .map_err(|e| DumpError::io("write", &self.path, e))?;
        self.entries += 1;
        Ok(())
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer
            .flush()
            .map_err(|e| DumpError::io("flush", &self.path, e))?;
        Ok(self.writer)
    }
}
