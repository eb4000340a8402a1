use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::zip::{WarningSink, ZipExtractor};

/// An archive file loaded fully into memory.
///
/// Parsing needs random access to the whole container, so the file is
/// read in one go. Failing to read it is the only hard error; everything
/// wrong with its contents is reported as a warning later.
#[derive(Debug, Clone)]
pub struct LocalArchive {
    path: PathBuf,
    data: Vec<u8>,
}

impl LocalArchive {
    pub async fn open(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read archive {}", path.display()))?;
        Ok(Self::from_bytes(path, data))
    }

    pub fn from_bytes(path: impl Into<PathBuf>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Parse the archive. Entries borrow from this buffer.
    pub fn extractor(&self, sink: &dyn WarningSink) -> ZipExtractor<'_> {
        ZipExtractor::open(&self.data, sink)
    }
}
