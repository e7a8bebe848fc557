use crate::error::{ContainerError, Result};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Seekable, buffered byte-level access over a local file.
///
/// Sequential reads coalesce through the inner `BufReader`; every read is
/// exact-or-fail, mirroring the reference toolkit's own preference for
/// `read_exact` over partial reads throughout its RIFF/WEM chunk walkers.
pub struct AaxReader {
    inner: BufReader<File>,
    len: u64,
}

impl AaxReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            inner: BufReader::new(file),
            len,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Reads exactly `n` bytes, failing with `IoError` on short read at EOF.
    pub fn read_exact_n(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ContainerError::malformed("unexpected end of file while reading box contents")
            } else {
                ContainerError::Io(e)
            }
        })?;
        Ok(buf)
    }

    /// Reads exactly `n` bytes starting at `offset`, leaving the cursor
    /// positioned just past them.
    pub fn read_exact_at(&mut self, offset: u64, n: usize) -> Result<Vec<u8>> {
        self.seek_to(offset)?;
        self.read_exact_n(n)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.inner.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    pub fn read_u64_be(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.inner.read_exact(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    pub fn close(self) {
        drop(self);
    }
}
