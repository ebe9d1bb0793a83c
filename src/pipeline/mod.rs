//! Pipeline stages from page image to transcript lines.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ geometry ──▶ columns ──▶ encode ──▶ recognize ──▶ postprocess
//! (path/URL) (table, splits) (crops)  (base64)   (vision model)  (cleanup)
//! ```
//!
//! 1. [`input`]    : load a page image from a local path or HTTP(S) URL
//! 2. [`geometry`] : ruled-table boundary, column splits and corner
//!    diagnostics; CPU-bound, run in `spawn_blocking`
//! 3. [`columns`]  : crop the page into column images and draw the review
//!    overlay
//! 4. [`encode`]   : PNG-encode and base64-wrap each column for the request
//! 5. [`recognize`]: throttled, retried, time-boxed recogniser calls; the
//!    only stage with network I/O besides URL input
//! 6. [`postprocess`]: strip fences and characters outside the language
//!    alphabet

pub mod columns;
pub mod encode;
pub mod geometry;
pub mod input;
pub mod postprocess;
pub mod recognize;
