//! File-system callbacks.
//!
//! The engine opens sounds through a [`FileSystem`] installed by the host.
//! Reads report the bytes delivered together with a result code so a short
//! read can carry [`EngineError::FileEof`].

use crate::error::{EngineError, EngineResult};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;
use tracing::warn;

/// Chunk size used when slurping a stream.
const READ_CHUNK: usize = 16 * 1024;

/// An open file.
pub trait FileStream: Send {
    /// Total size in bytes.
    fn size(&self) -> u64;

    /// Reads into `buf`. A read that stops short reports `FileEof` alongside
    /// the bytes it did deliver.
    fn read(&mut self, buf: &mut [u8]) -> (usize, EngineResult<()>);

    /// Moves to an absolute position.
    fn seek(&mut self, pos: u64) -> EngineResult<()>;

    /// Closes the stream.
    fn close(self: Box<Self>) -> EngineResult<()> {
        Ok(())
    }
}

/// Opens files for the engine.
pub trait FileSystem: Send + Sync {
    /// Opens `name` for reading.
    fn open(&self, name: &str) -> EngineResult<Box<dyn FileStream>>;
}

/// Reads a stream to its end and closes it.
pub fn read_all(mut stream: Box<dyn FileStream>) -> EngineResult<Vec<u8>> {
    let capacity = usize::try_from(stream.size()).unwrap_or(0);
    let mut out = Vec::with_capacity(capacity);
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        let (n, result) = stream.read(&mut chunk);
        out.extend_from_slice(&chunk[..n.min(chunk.len())]);
        match result {
            Ok(()) if n > 0 => {},
            Ok(()) | Err(EngineError::FileEof) => break,
            Err(e) => {
                if let Err(close_err) = stream.close() {
                    warn!("Failed to close stream after read error: {close_err}");
                }
                return Err(e);
            },
        }
    }

    stream.close()?;
    Ok(out)
}

/// Maps an IO error onto an engine result code.
pub fn io_error(name: &str, err: &io::Error) -> EngineError {
    match err.kind() {
        io::ErrorKind::NotFound => EngineError::FileNotFound(name.to_string()),
        io::ErrorKind::UnexpectedEof => EngineError::FileEof,
        _ => EngineError::FileBad(format!("{name}: {err}")),
    }
}

/// File system backed by the OS, rooted at a directory.
#[derive(Debug, Clone)]
pub struct NativeFileSystem {
    root: PathBuf,
}

impl NativeFileSystem {
    /// Creates a file system resolving names against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for NativeFileSystem {
    fn default() -> Self {
        Self::new(".")
    }
}

struct NativeStream {
    name: String,
    file: File,
    size: u64,
}

impl FileStream for NativeStream {
    fn size(&self) -> u64 {
        self.size
    }

    fn read(&mut self, buf: &mut [u8]) -> (usize, EngineResult<()>) {
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => return (filled, Err(EngineError::FileEof)),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
                Err(e) => return (filled, Err(io_error(&self.name, &e))),
            }
        }
        (filled, Ok(()))
    }

    fn seek(&mut self, pos: u64) -> EngineResult<()> {
        self.file
            .seek(SeekFrom::Start(pos))
            .map(|_| ())
            .map_err(|e| io_error(&self.name, &e))
    }
}

impl FileSystem for NativeFileSystem {
    fn open(&self, name: &str) -> EngineResult<Box<dyn FileStream>> {
        let path = self.root.join(name.trim_start_matches('/'));
        let file = File::open(&path).map_err(|e| io_error(name, &e))?;
        let size = file.metadata().map_err(|e| io_error(name, &e))?.len();
        Ok(Box::new(NativeStream {
            name: name.to_string(),
            file,
            size,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryFileSystem;

    #[test]
    fn test_read_all_collects_short_final_read() {
        let fs = MemoryFileSystem::new();
        let data: Vec<u8> = (0..40_000u32).map(|i| (i % 251) as u8).collect();
        fs.insert("big.bin", data.clone());

        let stream = fs.open("big.bin").expect("open");
        assert_eq!(read_all(stream).expect("read"), data);
    }

    struct BrokenStream;

    impl FileStream for BrokenStream {
        fn size(&self) -> u64 {
            64
        }

        fn read(&mut self, _buf: &mut [u8]) -> (usize, EngineResult<()>) {
            (0, Err(EngineError::FileBad("disk".into())))
        }

        fn seek(&mut self, _pos: u64) -> EngineResult<()> {
            Ok(())
        }

        fn close(self: Box<Self>) -> EngineResult<()> {
            Err(EngineError::FileBad("close".into()))
        }
    }

    #[test]
    fn test_read_error_wins_over_close_error() {
        let err = read_all(Box::new(BrokenStream)).err().expect("read fails");
        assert_eq!(err, EngineError::FileBad("disk".into()));
    }

    #[test]
    fn test_missing_file_maps_to_not_found() {
        let fs = NativeFileSystem::new("/definitely/not/here");
        let err = fs.open("x.wav").err().expect("missing");
        assert_eq!(err, EngineError::FileNotFound("x.wav".into()));
    }
}
