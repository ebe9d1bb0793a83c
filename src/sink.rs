//! Persistence seam: where finished scans go.
//!
//! The scan pipeline itself never touches the file system. Callers hand a
//! finished [`ScanOutput`] to a [`ValidationSink`]; [`PgnFileSink`] writes
//! it to disk and [`MemorySink`] keeps it for inspection.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

use crate::error::ScanError;
use crate::output::ScanOutput;

/// Receives finished scans.
pub trait ValidationSink: Send + Sync {
    fn store<'a>(&'a self, output: &'a ScanOutput) -> BoxFuture<'a, Result<(), ScanError>>;
}

/// On-disk representation written by [`PgnFileSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkFormat {
    /// PGN text only.
    #[default]
    Pgn,
    /// The whole [`ScanOutput`] as pretty JSON.
    Json,
}

impl SinkFormat {
    /// Guess from a file extension; anything but `.json` is PGN.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SinkFormat::Json,
            _ => SinkFormat::Pgn,
        }
    }
}

/// Writes each stored scan to one file, replacing it atomically.
#[derive(Debug, Clone)]
pub struct PgnFileSink {
    path: PathBuf,
    format: SinkFormat,
}

impl PgnFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = SinkFormat::from_path(&path);
        Self { path, format }
    }

    pub fn with_format(mut self, format: SinkFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ValidationSink for PgnFileSink {
    fn store<'a>(&'a self, output: &'a ScanOutput) -> BoxFuture<'a, Result<(), ScanError>> {
        Box::pin(async move {
            let bytes = match self.format {
                SinkFormat::Pgn => output.pgn.clone().into_bytes(),
                SinkFormat::Json => serde_json::to_vec_pretty(output)
                    .map_err(|e| ScanError::Internal(format!("JSON encoding failed: {e}")))?,
            };
            write_atomic(&self.path, &bytes).await?;
            info!("Wrote {} ({} bytes)", self.path.display(), bytes.len());
            Ok(())
        })
    }
}

/// Keeps every stored scan in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    outputs: Mutex<Vec<ScanOutput>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything stored so far.
    pub fn outputs(&self) -> Vec<ScanOutput> {
        match self.outputs.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ValidationSink for MemorySink {
    fn store<'a>(&'a self, output: &'a ScanOutput) -> BoxFuture<'a, Result<(), ScanError>> {
        Box::pin(async move {
            self.outputs
                .lock()
                .map_err(|_| ScanError::Internal("memory sink lock poisoned".into()))?
                .push(output.clone());
            Ok(())
        })
    }
}

/// Write `bytes` to `path` via a sibling temp file and rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ScanError> {
    let fail = |source| ScanError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(fail)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(fail)?;
    Ok(())
}
