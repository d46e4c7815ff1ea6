//! Virtual filesystem sounds are loaded through.
//!
//! Backends never touch the OS filesystem directly. They open files
//! through a [`Vfs`] so hosts can serve sounds from archives, mods or memory.

use ahash::AHashMap;
use parking_lot::RwLock;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;

/// An open file handed out by a [`Vfs`].
pub trait VirtualFile: Send {
    /// Total size in bytes.
    fn size(&self) -> u64;

    /// Reads into `buf`, returning the number of bytes read.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Moves the cursor to an absolute byte position.
    fn seek(&mut self, pos: u64) -> io::Result<()>;

    /// Whether the cursor is at or past the end.
    fn eof(&self) -> bool;
}

/// Host virtual filesystem.
pub trait Vfs: Send + Sync {
    /// Opens a file by its normalized path.
    fn open(&self, path: &str) -> io::Result<Box<dyn VirtualFile>>;

    /// Whether a file exists.
    fn exists(&self, path: &str) -> bool {
        self.open(path).is_ok()
    }
}

/// [`Vfs`] rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct StdVfs {
    root: PathBuf,
}

impl StdVfs {
    /// Creates a filesystem resolving paths relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl Default for StdVfs {
    fn default() -> Self {
        Self::new(".")
    }
}

struct StdFile {
    file: File,
    size: u64,
    pos: u64,
}

impl VirtualFile for StdFile {
    fn size(&self) -> u64 {
        self.size
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.file.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.pos = self.file.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    fn eof(&self) -> bool {
        self.pos >= self.size
    }
}

impl Vfs for StdVfs {
    fn open(&self, path: &str) -> io::Result<Box<dyn VirtualFile>> {
        let full = self.root.join(path.trim_start_matches('/'));
        let file = File::open(&full)?;
        let size = file.metadata()?.len();
        Ok(Box::new(StdFile { file, size, pos: 0 }))
    }
}

/// In-memory [`Vfs`], keyed by path.
#[derive(Default, Clone)]
pub struct MemoryVfs {
    files: Arc<RwLock<AHashMap<String, Arc<[u8]>>>>,
}

impl MemoryVfs {
    /// Creates an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file.
    pub fn insert(&self, path: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.files.write().insert(path.into(), bytes.into());
    }

    /// Removes a file, returning whether it existed.
    pub fn remove(&self, path: &str) -> bool {
        self.files.write().remove(path).is_some()
    }

    /// Number of stored files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Whether no files are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

struct MemoryFile {
    bytes: Arc<[u8]>,
    pos: usize,
}

impl VirtualFile for MemoryFile {
    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.bytes.get(self.pos..).unwrap_or_default();
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.pos = usize::try_from(pos)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        Ok(())
    }

    fn eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }
}

impl Vfs for MemoryVfs {
    fn open(&self, path: &str) -> io::Result<Box<dyn VirtualFile>> {
        let bytes = self
            .files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))?;
        Ok(Box::new(MemoryFile { bytes, pos: 0 }))
    }

    fn exists(&self, path: &str) -> bool {
        self.files.read().contains_key(path)
    }
}
