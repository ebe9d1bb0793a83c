//! Configuration types for scoresheet scanning.
//!
//! Every knob lives in [`ScanConfig`], built through [`ScanConfigBuilder`].
//! Geometry thresholds and correction policy are grouped into their own
//! serialisable structs ([`GeometryParams`], [`CorrectionConfig`]) so they
//! can be tuned from a file and logged alongside a run.
//!
//! # Example
//! ```rust
//! use scoresheet2pgn::{Language, ScanConfig};
//!
//! let config = ScanConfig::builder()
//!     .language(Language::German)
//!     .expected_columns(4)
//!     .concurrency(2)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.expected_columns, 4);
//! ```

use crate::chess::Role;
use crate::error::ScanError;
use crate::notation::{Language, NotationTables};
use crate::pipeline::recognize::NotationRecognizer;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Largest supported number of move columns per page.
pub const MAX_COLUMNS: usize = 12;

/// Maximum edit distance the correction tier accepts.
pub const MAX_EDIT_DISTANCE: usize = 3;

/// Upper bound on recogniser retries per column.
pub const MAX_RETRIES: u32 = 10;

/// Tunable thresholds for the geometry analyzer.
///
/// Fractions are relative to the image (or search region) size, so the
/// defaults hold across scan resolutions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryParams {
    /// Fixed luma cut-off for "dark" pixels. `None` uses Otsu's method.
    pub dark_threshold: Option<u8>,
    /// Smoothing window as a fraction of the average column width. Default: 0.05.
    pub smoothing_fraction: f64,
    /// Minimum distance between adjacent splits, in average column widths. Default: 0.5.
    pub min_gap_spacing_fraction: f64,
    /// A minimum counts as a gap only at or below this multiple of the
    /// mean profile density. Default: 0.6.
    pub gap_confidence_ratio: f64,
    /// Minima within this fraction of the profile maximum are ties. Default: 0.05.
    pub tie_tolerance: f64,
    /// A ruled line spans at least this fraction of the image. Default: 0.5.
    pub line_length_fraction: f64,
    /// Light pixels bridged inside a ruled line. Default: 4.
    pub max_line_gap: u32,
    /// Smallest table, as a fraction of the image area. Default: 0.25.
    pub min_table_area_fraction: f64,
    /// Inked pixels needed for a corner arm. Default: 8.
    pub corner_arm_length: u32,
}

impl Default for GeometryParams {
    fn default() -> Self {
        Self {
            dark_threshold: None,
            smoothing_fraction: 0.05,
            min_gap_spacing_fraction: 0.5,
            gap_confidence_ratio: 0.6,
            tie_tolerance: 0.05,
            line_length_fraction: 0.5,
            max_line_gap: 4,
            min_table_area_fraction: 0.25,
            corner_arm_length: 8,
        }
    }
}

/// Move-correction policy for the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Allow Corrected verdicts at all. Default: true.
    pub enabled: bool,
    /// Largest edit distance for garbled tokens. Default: 1.
    pub max_edit_distance: usize,
    /// Ignore wrong or missing capture/check marks and disambiguation. Default: true.
    pub relax_marks: bool,
    /// Piece assumed when a promotion is written without one. Default: queen.
    pub default_promotion: Option<Role>,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_edit_distance: 1,
            relax_marks: true,
            default_promotion: Some(Role::Queen),
        }
    }
}

/// Configuration for a scoresheet scan.
///
/// Built via [`ScanConfig::builder()`] or [`ScanConfig::default()`].
#[derive(Clone)]
pub struct ScanConfig {
    /// Language the moves are written in. Default: English.
    pub language: Language,

    /// Move columns per page (1–12). Default: 4.
    ///
    /// Typical club scoresheets carry two White/Black column pairs, i.e.
    /// four columns of handwriting.
    pub expected_columns: usize,

    /// Crop to the detected ruled table before splitting columns. Default: true.
    pub auto_crop: bool,

    /// Search the projection profile for column gaps. When false, columns
    /// are exact equal-width slices. Default: true.
    pub use_heuristics: bool,

    pub geometry: GeometryParams,

    pub correction: CorrectionConfig,

    /// Glyph tables. Default: the shared built-in set.
    pub notation: Arc<NotationTables>,

    /// Concurrent recogniser calls. Default: 4.
    pub concurrency: usize,

    /// Minimum delay between the starts of two recogniser calls. Default: 250.
    pub request_interval_ms: u64,

    /// LLM model identifier, e.g. "gpt-4.1-mini". If None, provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed recogniser. Takes precedence over every provider setting.
    pub recognizer: Option<Arc<dyn NotationRecognizer>>,

    /// Sampling temperature. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens per column transcription. Default: 1024.
    pub max_tokens: usize,

    /// Retry attempts on a failed recogniser call, at most [`MAX_RETRIES`]. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Custom system prompt. If None, built from the language whitelist.
    pub system_prompt: Option<String>,

    /// Keep overlays, column crops and raw transcripts on the output. Default: false.
    pub debug: bool,

    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            expected_columns: 4,
            auto_crop: true,
            use_heuristics: true,
            geometry: GeometryParams::default(),
            correction: CorrectionConfig::default(),
            notation: NotationTables::shared(),
            concurrency: 4,
            request_interval_ms: 250,
            model: None,
            provider_name: None,
            provider: None,
            recognizer: None,
            temperature: 0.0,
            max_tokens: 1024,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            system_prompt: None,
            debug: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfig")
            .field("language", &self.language)
            .field("expected_columns", &self.expected_columns)
            .field("auto_crop", &self.auto_crop)
            .field("use_heuristics", &self.use_heuristics)
            .field("geometry", &self.geometry)
            .field("correction", &self.correction)
            .field("concurrency", &self.concurrency)
            .field("request_interval_ms", &self.request_interval_ms)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field(
                "recognizer",
                &self.recognizer.as_ref().map(|r| r.name().to_string()),
            )
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("debug", &self.debug)
            .finish()
    }
}

impl ScanConfig {
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ScanConfig`].
#[derive(Debug)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    pub fn language(mut self, language: Language) -> Self {
        self.config.language = language;
        self
    }

    pub fn expected_columns(mut self, n: usize) -> Self {
        self.config.expected_columns = n.clamp(1, MAX_COLUMNS);
        self
    }

    pub fn auto_crop(mut self, v: bool) -> Self {
        self.config.auto_crop = v;
        self
    }

    pub fn use_heuristics(mut self, v: bool) -> Self {
        self.config.use_heuristics = v;
        self
    }

    pub fn geometry(mut self, params: GeometryParams) -> Self {
        self.config.geometry = params;
        self
    }

    pub fn correction(mut self, correction: CorrectionConfig) -> Self {
        self.config.correction = correction;
        self
    }

    pub fn max_edit_distance(mut self, n: usize) -> Self {
        self.config.correction.max_edit_distance = n.min(MAX_EDIT_DISTANCE);
        self
    }

    pub fn correction_enabled(mut self, v: bool) -> Self {
        self.config.correction.enabled = v;
        self
    }

    pub fn notation(mut self, tables: Arc<NotationTables>) -> Self {
        self.config.notation = tables;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn request_interval_ms(mut self, ms: u64) -> Self {
        self.config.request_interval_ms = ms;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn NotationRecognizer>) -> Self {
        self.config.recognizer = Some(recognizer);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(MAX_RETRIES);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn debug(mut self, v: bool) -> Self {
        self.config.debug = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ScanConfig, ScanError> {
        let c = &self.config;
        if c.expected_columns == 0 || c.expected_columns > MAX_COLUMNS {
            return Err(ScanError::InvalidConfig(format!(
                "expected columns must be 1–{MAX_COLUMNS}, got {}",
                c.expected_columns
            )));
        }
        if c.concurrency == 0 {
            return Err(ScanError::InvalidConfig("concurrency must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(ScanError::InvalidConfig("API timeout must be ≥ 1s".into()));
        }
        if c.notation.get(c.language).is_none() {
            return Err(ScanError::InvalidConfig(format!(
                "no glyph table for language '{}'",
                c.language
            )));
        }
        let g = &c.geometry;
        for (name, v) in [
            ("smoothing_fraction", g.smoothing_fraction),
            ("min_gap_spacing_fraction", g.min_gap_spacing_fraction),
            ("gap_confidence_ratio", g.gap_confidence_ratio),
            ("tie_tolerance", g.tie_tolerance),
            ("line_length_fraction", g.line_length_fraction),
            ("min_table_area_fraction", g.min_table_area_fraction),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(ScanError::InvalidConfig(format!(
                    "geometry.{name} must be within 0–1, got {v}"
                )));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_documented_values() {
        let c = ScanConfig::default();
        assert_eq!(c.expected_columns, 4);
        assert!(c.auto_crop && c.use_heuristics);
        assert_eq!(c.correction.max_edit_distance, 1);
        assert_eq!(c.correction.default_promotion, Some(Role::Queen));
        assert_eq!(c.geometry.min_gap_spacing_fraction, 0.5);
    }

    #[test]
    fn builder_clamps_ranges() {
        let c = ScanConfig::builder()
            .expected_columns(40)
            .concurrency(0)
            .max_edit_distance(9)
            .temperature(5.0)
            .max_retries(64)
            .build()
            .unwrap();
        assert_eq!(c.expected_columns, MAX_COLUMNS);
        assert_eq!(c.max_retries, MAX_RETRIES);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.correction.max_edit_distance, MAX_EDIT_DISTANCE);
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn build_rejects_bad_geometry() {
        let params = GeometryParams {
            tie_tolerance: 1.5,
            ..GeometryParams::default()
        };
        let err = ScanConfig::builder().geometry(params).build().unwrap_err();
        assert!(err.to_string().contains("tie_tolerance"), "got: {err}");
    }

    #[test]
    fn geometry_params_fill_missing_fields() {
        let p: GeometryParams = serde_json::from_str(r#"{"max_line_gap": 2}"#).unwrap();
        assert_eq!(p.max_line_gap, 2);
        assert_eq!(p.corner_arm_length, 8);
    }
}
