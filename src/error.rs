//! Error types for the scoresheet2pgn library.
//!
//! * [`ScanError`] is **fatal**: the scan cannot proceed (bad input, no
//!   recogniser, an impossible board position). Returned as `Err` from the
//!   top-level `scan*` functions.
//!
//! * [`ExtractionError`] is **non-fatal**: one column could not be
//!   transcribed. Its page contributes no moves and the failure is recorded
//!   on [`crate::output::ScanOutput::issues`]; the rest of the run goes on.
//!
//! Per-ply problems are neither: an unreadable move is an Invalid entry in
//! the validation table, not an error.

use std::path::PathBuf;
use thiserror::Error;

use crate::validate::ConsistencyError;

/// All fatal errors returned by the scoresheet2pgn library.
#[derive(Debug, Error)]
pub enum ScanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes are not a PNG or JPEG image.
    #[error("'{input}' is not a supported image (PNG or JPEG)")]
    NotAnImage { input: String },

    /// The image format was recognised but decoding failed.
    #[error("Failed to decode image '{input}': {detail}")]
    ImageDecode { input: String, detail: String },

    // ── Scan errors ───────────────────────────────────────────────────────
    /// Nothing to scan.
    #[error("No scoresheet pages were supplied")]
    NoPages,

    /// A game spans at most two pages.
    #[error("A scoresheet has at most {max} pages, got {count}")]
    TooManyPages { count: usize, max: usize },

    /// The page is too small to hold a readable move table.
    #[error("Page {page} is {width}x{height}px; at least {min}px per side is required")]
    ImageTooSmall {
        page: usize,
        width: u32,
        height: u32,
        min: u32,
    },

    /// No recogniser could be resolved.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Replaying the game produced a position that cannot occur.
    #[error("Internal consistency failure: {0}")]
    InternalConsistency(#[from] ConsistencyError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single column.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ExtractionError {
    /// The recogniser did not answer in time.
    #[error("Page {page} column {column}: recogniser timed out after {secs}s")]
    Timeout {
        page: usize,
        column: usize,
        secs: u64,
    },

    /// The recogniser kept failing.
    #[error("Page {page} column {column}: recogniser failed after {retries} retries: {detail}")]
    RecognizerFailed {
        page: usize,
        column: usize,
        retries: u32,
        detail: String,
    },

    /// The column crop could not be encoded for the request.
    #[error("Page {page} column {column}: image encoding failed: {detail}")]
    EncodeFailed {
        page: usize,
        column: usize,
        detail: String,
    },
}

impl ExtractionError {
    pub fn page(&self) -> usize {
        match self {
            ExtractionError::Timeout { page, .. }
            | ExtractionError::RecognizerFailed { page, .. }
            | ExtractionError::EncodeFailed { page, .. } => *page,
        }
    }
}
