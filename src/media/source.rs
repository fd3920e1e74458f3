use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;

use crate::foundation::error::{ScrollyError, ScrollyResult};

/// Opens a source URI as a byte stream.
pub trait ByteSource: Send + Sync {
    /// Start streaming `src`.
    fn open(&self, src: &str) -> ScrollyResult<Box<dyn Read + Send>>;
}

/// Local files, as plain paths or `file://` URIs.
#[derive(Clone, Debug, Default)]
pub struct FileSource {
    root: Option<PathBuf>,
}

impl FileSource {
    /// Resolve paths as given.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, src: &str) -> PathBuf {
        let path = PathBuf::from(src.strip_prefix("file://").unwrap_or(src));
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        }
    }
}

impl ByteSource for FileSource {
    fn open(&self, src: &str) -> ScrollyResult<Box<dyn Read + Send>> {
        let path = self.resolve(src);
        let file = std::fs::File::open(&path)
            .map_err(|e| ScrollyError::fetch(format!("open '{}': {e}", path.display())))?;
        Ok(Box::new(std::io::BufReader::new(file)))
    }
}

/// Named in-memory buffers.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    entries: HashMap<String, Arc<[u8]>>,
}

impl MemorySource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` under `name`.
    pub fn with(mut self, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.entries.insert(name.into(), bytes.into());
        self
    }
}

impl ByteSource for MemorySource {
    fn open(&self, src: &str) -> ScrollyResult<Box<dyn Read + Send>> {
        let bytes = self
            .entries
            .get(src)
            .ok_or_else(|| ScrollyError::fetch(format!("no in-memory source named '{src}'")))?;
        Ok(Box::new(Cursor::new(bytes.clone())))
    }
}

/// `http(s)://` via `ureq`; anything else is delegated to a [`FileSource`].
#[cfg(feature = "http")]
#[derive(Clone, Debug, Default)]
pub struct HttpSource {
    files: FileSource,
}

#[cfg(feature = "http")]
impl HttpSource {
    /// Source with default file fallback.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "http")]
impl ByteSource for HttpSource {
    fn open(&self, src: &str) -> ScrollyResult<Box<dyn Read + Send>> {
        if !(src.starts_with("http://") || src.starts_with("https://")) {
            return self.files.open(src);
        }
        let resp = ureq::get(src)
            .call()
            .map_err(|e| ScrollyError::fetch(format!("GET {src}: {e}")))?;
        tracing::debug!(src, status = %resp.status(), "streaming source");
        Ok(Box::new(resp.into_body().into_reader()))
    }
}

/// The default source for the enabled features.
pub fn default_source() -> Arc<dyn ByteSource> {
    #[cfg(feature = "http")]
    {
        Arc::new(HttpSource::new())
    }
    #[cfg(not(feature = "http"))]
    {
        Arc::new(FileSource::new())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/source.rs"]
mod tests;
