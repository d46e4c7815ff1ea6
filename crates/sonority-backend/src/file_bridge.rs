//! Engine file callbacks served by the host virtual filesystem.

use sonority_common::{VirtualFile, Vfs};
use sonority_engine::file::io_error;
use sonority_engine::{EngineError, EngineResult, FileStream, FileSystem};
use std::sync::Arc;
use tracing::trace;

/// Forwards engine open/read/seek/close to a host [`Vfs`].
pub struct VfsBridge {
    vfs: Arc<dyn Vfs>,
}

impl VfsBridge {
    /// Wraps a host filesystem.
    pub fn new(vfs: Arc<dyn Vfs>) -> Self {
        Self { vfs }
    }
}

struct BridgedFile {
    name: String,
    file: Box<dyn VirtualFile>,
}

impl FileStream for BridgedFile {
    fn size(&self) -> u64 {
        self.file.size()
    }

    fn read(&mut self, buf: &mut [u8]) -> (usize, EngineResult<()>) {
        match self.file.read(buf) {
            Ok(n) if n < buf.len() || self.file.eof() => (n, Err(EngineError::FileEof)),
            Ok(n) => (n, Ok(())),
            Err(e) => (0, Err(io_error(&self.name, &e))),
        }
    }

    fn seek(&mut self, pos: u64) -> EngineResult<()> {
        self.file.seek(pos).map_err(|e| io_error(&self.name, &e))
    }

    fn close(self: Box<Self>) -> EngineResult<()> {
        trace!("Closing {}", self.name);
        Ok(())
    }
}

impl FileSystem for VfsBridge {
    fn open(&self, name: &str) -> EngineResult<Box<dyn FileStream>> {
        let file = self.vfs.open(name).map_err(|e| io_error(name, &e))?;
        trace!("Opened {} ({} bytes)", name, file.size());
        Ok(Box::new(BridgedFile {
            name: name.to_string(),
            file,
        }))
    }
}
