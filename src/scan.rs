//! Scan entry points: page images in, PGN and a validation report out.
//!
//! ```text
//! pages ─▶ geometry ─▶ column crops ─▶ recogniser (concurrent, throttled)
//!                                           │
//!            PGN ◀─ assemble ◀─ validate ◀─ normalize ◀─┘
//! ```
//!
//! Geometry and validation are CPU-bound and run on the blocking pool.
//! Recogniser calls run `concurrency` at a time. A page with any failed
//! column is dropped whole, so the validator never sees half a page.

use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::notation::normalize_transcripts;
use crate::output::{DebugArtifacts, PageReport, RawTranscript, RunIssue, ScanOutput, ScanStats};
use crate::pgn::{assemble, GameMetadata};
use crate::pipeline::columns::{column_boundaries, create_image_with_boundaries, extract_columns};
use crate::pipeline::geometry::{LayoutOptions, SheetLayout};
use crate::pipeline::input;
use crate::pipeline::recognize::{self, ColumnOutcome, NotationRecognizer, RequestThrottle, VisionRecognizer};
use crate::raster::RasterImage;
use crate::sink::ValidationSink;
use crate::validate::{validate_game, GameValidation};
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A game is written on at most this many sheets.
pub const MAX_PAGES: usize = 2;

/// Smallest accepted page side, in pixels.
pub const MIN_PAGE_SIDE: u32 = 64;

/// Scan one or two scoresheet pages into a validated game.
///
/// # Returns
/// `Ok(ScanOutput)` even when columns failed or moves were unreadable;
/// check `output.issues` and the validation table.
///
/// # Errors
/// Only fatal problems: no pages, too many or too small pages, no
/// recogniser available, or an impossible position during replay.
pub async fn scan(
    pages: &[RasterImage],
    metadata: Option<&GameMetadata>,
    config: &ScanConfig,
) -> Result<ScanOutput, ScanError> {
    let total_start = Instant::now();
    info!("Starting scan: {} page(s), {}", pages.len(), config.language);

    // ── Step 1: Check pages ─────────────────────────────────────────────
    check_pages(pages)?;

    // ── Step 2: Resolve recogniser ──────────────────────────────────────
    let recognizer = resolve_recognizer(config).await?;
    debug!("Using recogniser '{}'", recognizer.name());

    // ── Step 3: Geometry ────────────────────────────────────────────────
    let layouts = analyze_pages(pages, config).await?;

    let mut issues = Vec::new();
    let mut reports = Vec::with_capacity(pages.len());
    let mut jobs = Vec::new();
    let mut debug_artifacts = config.debug.then(DebugArtifacts::default);

    for (idx, (image, layout)) in pages.iter().zip(&layouts).enumerate() {
        let page = idx + 1;
        if layout.table_fallback {
            warn!("Page {}: no ruled table found, using the full image", page);
            issues.push(RunIssue::GeometryAmbiguous {
                page,
                detail: "no ruled table found; using the full image".into(),
            });
        }
        if layout.columns_fallback {
            warn!("Page {}: column gaps not found, using equal division", page);
            issues.push(RunIssue::GeometryAmbiguous {
                page,
                detail: "column gaps not found; using equal division".into(),
            });
        }

        // ── Step 4: Column crops ────────────────────────────────────────
        let crops = extract_columns(image, layout);
        if let Some(artifacts) = debug_artifacts.as_mut() {
            artifacts.overlays.push(create_image_with_boundaries(image, layout));
            artifacts.columns.push(crops.clone());
            artifacts.corners.push(layout.corners.clone());
        }
        reports.push(PageReport {
            page,
            width: image.width(),
            height: image.height(),
            table: layout.table,
            table_fallback: layout.table_fallback,
            columns: column_boundaries(layout.table, &layout.columns),
            columns_fallback: layout.columns_fallback,
            failed_columns: Vec::new(),
            included: true,
        });
        jobs.extend(
            crops
                .into_iter()
                .enumerate()
                .map(|(c, crop)| (page, c + 1, crop)),
        );
    }

    // ── Step 5: Recognise columns ───────────────────────────────────────
    let total_columns = jobs.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_scan_start(total_columns);
    }
    let recognition_start = Instant::now();
    let mut outcomes = recognize_columns(&recognizer, jobs, config).await;
    let recognition_duration_ms = recognition_start.elapsed().as_millis() as u64;
    outcomes.sort_by_key(|o| (o.page, o.column));

    let succeeded = outcomes.iter().filter(|o| o.transcript.is_ok()).count();
    info!(
        "Recognised {}/{} columns in {}ms",
        succeeded, total_columns, recognition_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_scan_complete(total_columns, succeeded);
    }

    // ── Step 6: Drop pages with failed columns ──────────────────────────
    let mut transcripts = Vec::new();
    let mut stats = ScanStats {
        pages: pages.len(),
        columns: total_columns,
        failed_columns: total_columns - succeeded,
        recognition_duration_ms,
        ..ScanStats::default()
    };
    for outcome in &outcomes {
        stats.total_input_tokens += outcome.input_tokens as u64;
        stats.total_output_tokens += outcome.output_tokens as u64;
        if let Err(error) = &outcome.transcript {
            let report = &mut reports[outcome.page - 1];
            report.failed_columns.push(outcome.column);
            report.included = false;
            issues.push(RunIssue::ExtractionFailed {
                error: error.clone(),
            });
        }
    }
    for outcome in outcomes {
        if let Ok(transcript) = outcome.transcript {
            if let Some(artifacts) = debug_artifacts.as_mut() {
                artifacts.transcripts.push(transcript.clone());
            }
            if reports[transcript.page - 1].included {
                transcripts.push(transcript);
            }
        }
    }
    for report in reports.iter().filter(|r| !r.included) {
        warn!(
            "Page {}: dropped, columns {:?} failed",
            report.page, report.failed_columns
        );
    }

    // ── Step 7: Normalize, validate, assemble ───────────────────────────
    let mut output = finish(transcripts, metadata, config, issues, stats).await?;
    output.pages = reports;
    output.debug = debug_artifacts;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Scan complete: {} valid, {} corrected, {} invalid, {}ms total",
        output.stats.valid, output.stats.corrected, output.stats.invalid, output.stats.total_duration_ms
    );
    Ok(output)
}

/// Run normalize → validate → assemble on already-recognised text.
///
/// Transcripts are read in slice order. Needs no recogniser or API key.
pub async fn scan_transcripts(
    transcripts: &[RawTranscript],
    metadata: Option<&GameMetadata>,
    config: &ScanConfig,
) -> Result<ScanOutput, ScanError> {
    let start = Instant::now();
    let stats = ScanStats {
        columns: transcripts.len(),
        ..ScanStats::default()
    };
    let mut output = finish(transcripts.to_vec(), metadata, config, Vec::new(), stats).await?;
    output.stats.total_duration_ms = start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Load page images from paths or URLs, then [`scan`] them.
pub async fn scan_files<S: AsRef<str>>(
    inputs: &[S],
    metadata: Option<&GameMetadata>,
    config: &ScanConfig,
) -> Result<ScanOutput, ScanError> {
    if inputs.is_empty() {
        return Err(ScanError::NoPages);
    }
    if inputs.len() > MAX_PAGES {
        return Err(ScanError::TooManyPages {
            count: inputs.len(),
            max: MAX_PAGES,
        });
    }
    let mut pages = Vec::with_capacity(inputs.len());
    for input in inputs {
        pages.push(input::load_image(input.as_ref(), config.download_timeout_secs).await?);
    }
    scan(&pages, metadata, config).await
}

/// [`scan`] and hand the result to `sink`.
pub async fn scan_into(
    pages: &[RasterImage],
    metadata: Option<&GameMetadata>,
    config: &ScanConfig,
    sink: &dyn ValidationSink,
) -> Result<ScanStats, ScanError> {
    let output = scan(pages, metadata, config).await?;
    sink.store(&output).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`scan`].
///
/// Creates a temporary tokio runtime internally.
pub fn scan_sync(
    pages: &[RasterImage],
    metadata: Option<&GameMetadata>,
    config: &ScanConfig,
) -> Result<ScanOutput, ScanError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ScanError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(scan(pages, metadata, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn check_pages(pages: &[RasterImage]) -> Result<(), ScanError> {
    if pages.is_empty() {
        return Err(ScanError::NoPages);
    }
    if pages.len() > MAX_PAGES {
        return Err(ScanError::TooManyPages {
            count: pages.len(),
            max: MAX_PAGES,
        });
    }
    for (idx, page) in pages.iter().enumerate() {
        if page.width() < MIN_PAGE_SIDE || page.height() < MIN_PAGE_SIDE {
            return Err(ScanError::ImageTooSmall {
                page: idx + 1,
                width: page.width(),
                height: page.height(),
                min: MIN_PAGE_SIDE,
            });
        }
    }
    Ok(())
}

async fn analyze_pages(
    pages: &[RasterImage],
    config: &ScanConfig,
) -> Result<Vec<SheetLayout>, ScanError> {
    let options = LayoutOptions {
        expected_columns: config.expected_columns,
        auto_crop: config.auto_crop,
        use_heuristics: config.use_heuristics,
        corners: config.debug,
    };
    let handles: Vec<_> = pages
        .iter()
        .map(|page| {
            let page = page.clone();
            let params = config.geometry.clone();
            tokio::task::spawn_blocking(move || SheetLayout::analyze(&page, &params, options))
        })
        .collect();

    let mut layouts = Vec::with_capacity(handles.len());
    for joined in futures::future::join_all(handles).await {
        layouts.push(joined.map_err(|e| ScanError::Internal(format!("geometry task panicked: {e}")))?);
    }
    Ok(layouts)
}

async fn recognize_columns(
    recognizer: &Arc<dyn NotationRecognizer>,
    jobs: Vec<(usize, usize, RasterImage)>,
    config: &ScanConfig,
) -> Vec<ColumnOutcome> {
    let total = jobs.len();
    let throttle = RequestThrottle::new(Duration::from_millis(config.request_interval_ms));
    let throttle = &throttle;

    stream::iter(jobs.into_iter().map(|(page, column, image)| {
        let recognizer = Arc::clone(recognizer);
        async move {
            if let Some(ref cb) = config.progress_callback {
                cb.on_column_start(page, column, total);
            }
            let outcome = recognize::extract_column(
                recognizer.as_ref(),
                Some(throttle),
                &image,
                page,
                column,
                config,
            )
            .await;
            if let Some(ref cb) = config.progress_callback {
                match &outcome.transcript {
                    Ok(t) => cb.on_column_complete(page, column, total, t.lines.len()),
                    Err(e) => cb.on_column_error(page, column, total, &e.to_string()),
                }
            }
            outcome
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await
}

async fn finish(
    transcripts: Vec<RawTranscript>,
    metadata: Option<&GameMetadata>,
    config: &ScanConfig,
    mut issues: Vec<RunIssue>,
    mut stats: ScanStats,
) -> Result<ScanOutput, ScanError> {
    let candidates = normalize_transcripts(&transcripts, config.language, &config.notation);
    stats.candidates = candidates.len();
    if candidates.is_empty() {
        warn!("No move candidates could be read");
        issues.push(RunIssue::NormalizationEmpty);
    }

    let correction = config.correction.clone();
    let validation: GameValidation =
        tokio::task::spawn_blocking(move || validate_game(&candidates, &correction))
            .await
            .map_err(|e| ScanError::Internal(format!("validation task panicked: {e}")))??;
    stats.tally(&validation);

    let pgn = assemble(&validation, metadata);
    Ok(ScanOutput {
        pgn,
        validation,
        pages: Vec::new(),
        issues,
        stats,
        debug: None,
    })
}

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, ScanError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ScanError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the recogniser, from most-specific to least-specific.
///
/// 1. **Pre-built recogniser** (`config.recognizer`), used as-is.
/// 2. **Pre-built provider** (`config.provider`), wrapped in a
///    [`VisionRecognizer`].
/// 3. **Named provider + model** (`config.provider_name`); the API key is
///    read from the provider's usual environment variable.
/// 4. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 5. **`OPENAI_API_KEY`** present: OpenAI with the configured model.
/// 6. **Full auto-detection** (`ProviderFactory::from_env`).
pub async fn resolve_recognizer(
    config: &ScanConfig,
) -> Result<Arc<dyn NotationRecognizer>, ScanError> {
    if let Some(ref recognizer) = config.recognizer {
        return Ok(Arc::clone(recognizer));
    }
    let provider = resolve_provider(config)?;
    Ok(Arc::new(VisionRecognizer::new(provider, config)))
}

fn resolve_provider(config: &ScanConfig) -> Result<Arc<dyn LLMProvider>, ScanError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ScanError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
