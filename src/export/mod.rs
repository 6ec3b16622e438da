use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod gpx;

/// MIME type offered with every document we produce
pub const GPX_MIME_TYPE: &str = "text/xml";

/// Which pipeline produced a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Generated,
    Updated,
}

impl OutputKind {
    /// Download file name used when the caller does not choose one
    pub fn default_file_name(&self) -> &'static str {
        match self {
            OutputKind::Generated => "generated.gpx",
            OutputKind::Updated => "updated.gpx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        GPX_MIME_TYPE
    }
}

/// A finished document ready to be shown or saved
#[derive(Debug, Clone, PartialEq)]
pub struct GpxOutput {
    pub kind: OutputKind,
    pub content: String,
}

impl GpxOutput {
    pub fn new(kind: OutputKind, content: String) -> Self {
        Self { kind, content }
    }

    /// Write to an explicit path, creating parent directories
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.content.as_bytes())?;
        tracing::info!(
            path = %path.display(),
            bytes = self.content.len(),
            mime = self.kind.mime_type(),
            "GPX document written"
        );
        Ok(())
    }

    /// Write under `directory` with the default file name for this kind
    pub fn save_in(&self, directory: &Path) -> Result<PathBuf> {
        let path = directory.join(self.kind.default_file_name());
        self.write_to(&path)?;
        Ok(path)
    }
}
