//! Test helpers: generated WAV data and an in-memory file system.

use crate::error::{EngineError, EngineResult};
use crate::file::{FileStream, FileSystem};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a silent RIFF/WAVE file.
///
/// Integer formats use the 16-byte `fmt ` chunk, float formats the
/// 18-byte variant with an empty extension.
#[must_use]
pub fn wav_bytes(channels: u16, sample_rate: u32, bits: u16, float: bool, frames: u32) -> Vec<u8> {
    let block_align = channels * (bits / 8);
    let data_len = frames * u32::from(block_align);
    let fmt_len: u32 = if float { 18 } else { 16 };
    let riff_len = 4 + (8 + fmt_len) + (8 + data_len);

    let mut out = Vec::with_capacity(riff_len as usize + 8);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&riff_len.to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&fmt_len.to_le_bytes());
    let tag: u16 = if float { 3 } else { 1 };
    out.extend_from_slice(&tag.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * u32::from(block_align)).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits.to_le_bytes());
    if float {
        out.extend_from_slice(&0u16.to_le_bytes());
    }

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.resize(out.len() + data_len as usize, 0);
    out
}

/// One second of 16-bit mono audio at 44.1 kHz.
#[must_use]
pub fn mono_pcm16_second() -> Vec<u8> {
    wav_bytes(1, 44_100, 16, false, 44_100)
}

/// In-memory [`FileSystem`].
#[derive(Default, Clone)]
pub struct MemoryFileSystem {
    files: Arc<RwLock<HashMap<String, Arc<[u8]>>>>,
}

impl MemoryFileSystem {
    /// Creates an empty file system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file.
    pub fn insert(&self, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.files.write().insert(name.into(), bytes.into());
    }
}

struct MemoryStream {
    bytes: Arc<[u8]>,
    pos: usize,
}

impl FileStream for MemoryStream {
    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read(&mut self, buf: &mut [u8]) -> (usize, EngineResult<()>) {
        let remaining = self.bytes.get(self.pos..).unwrap_or_default();
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        if n < buf.len() {
            (n, Err(EngineError::FileEof))
        } else {
            (n, Ok(()))
        }
    }

    fn seek(&mut self, pos: u64) -> EngineResult<()> {
        self.pos = usize::try_from(pos).map_err(|_| EngineError::InvalidParam("seek position"))?;
        Ok(())
    }
}

impl FileSystem for MemoryFileSystem {
    fn open(&self, name: &str) -> EngineResult<Box<dyn FileStream>> {
        let bytes = self
            .files
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::FileNotFound(name.to_string()))?;
        Ok(Box::new(MemoryStream { bytes, pos: 0 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_header_layout() {
        let bytes = wav_bytes(2, 48_000, 16, false, 10);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        // 12 RIFF header + 24 fmt chunk + 8 data header + 10 frames * 4 bytes
        assert_eq!(bytes.len(), 12 + 24 + 8 + 40);

        let float = wav_bytes(1, 8_000, 32, true, 4);
        assert_eq!(float.len(), 12 + 26 + 8 + 16);
    }
}
