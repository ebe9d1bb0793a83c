//! End-to-end pipeline tests with a scripted recogniser.
//!
//! No network and no API key: the recogniser answers from a table keyed by
//! (page, column), so every stage after geometry is deterministic.

use futures::future::BoxFuture;
use image::{GrayImage, Luma};
use scoresheet2pgn::{
    scan, scan_into, GameMetadata, Language, MemorySink, MoveStatus, NotationRecognizer,
    RasterImage, Recognition, RecognitionRequest, RecognizerError, RunIssue, ScanConfig,
    ScanError, ScanProgressCallback,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

struct Scripted {
    answers: HashMap<(usize, usize), Result<&'static str, &'static str>>,
    seen_prompts: Mutex<Vec<String>>,
}

impl Scripted {
    fn new(answers: &[((usize, usize), Result<&'static str, &'static str>)]) -> Arc<Self> {
        Arc::new(Self {
            answers: answers.iter().cloned().collect(),
            seen_prompts: Mutex::new(Vec::new()),
        })
    }
}

impl NotationRecognizer for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn recognize<'a>(
        &'a self,
        request: &'a RecognitionRequest,
    ) -> BoxFuture<'a, Result<Recognition, RecognizerError>> {
        Box::pin(async move {
            self.seen_prompts
                .lock()
                .unwrap()
                .push(request.system_prompt.clone());
            match self.answers.get(&(request.page, request.column)) {
                Some(Ok(text)) => Ok(Recognition {
                    text: text.to_string(),
                    input_tokens: 50,
                    output_tokens: 10,
                }),
                Some(Err(e)) => Err(RecognizerError::Provider(e.to_string())),
                None => Ok(Recognition::default()),
            }
        })
    }
}

#[derive(Default)]
struct Counts {
    started: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    total: AtomicUsize,
}

impl ScanProgressCallback for Counts {
    fn on_scan_start(&self, total_columns: usize) {
        self.total.store(total_columns, Ordering::SeqCst);
    }
    fn on_column_start(&self, _page: usize, _column: usize, _total: usize) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }
    fn on_column_complete(&self, _page: usize, _column: usize, _total: usize, _lines: usize) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
    fn on_column_error(&self, _page: usize, _column: usize, _total: usize, _error: &str) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Ruled table with four columns on a white page. Inner rules are 4 px so
/// they read as clear gaps in the column profile.
fn ruled_sheet() -> RasterImage {
    let mut img = GrayImage::from_pixel(400, 300, Luma([255]));
    for &(x, w) in &[(40u32, 2u32), (120, 4), (200, 4), (280, 4), (360, 2)] {
        for y in 30..=271 {
            for dx in 0..w {
                img.put_pixel(x + dx, y, Luma([0]));
            }
        }
    }
    for y in (30u32..=270).step_by(30) {
        for x in 40..=361 {
            img.put_pixel(x, y, Luma([0]));
            img.put_pixel(x, y + 1, Luma([0]));
        }
    }
    RasterImage::from(img)
}

fn blank_sheet() -> RasterImage {
    RasterImage::from(GrayImage::from_pixel(200, 150, Luma([255])))
}

fn config(recognizer: Arc<Scripted>) -> ScanConfig {
    ScanConfig::builder()
        .recognizer(recognizer)
        .request_interval_ms(0)
        .max_retries(0)
        .build()
        .unwrap()
}

fn movetext(pgn: &str) -> &str {
    pgn.split("\n\n").nth(1).unwrap().trim_end()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_page_reads_across_columns() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let rec = Scripted::new(&[
        ((1, 1), Ok("1. e4 e5\n2. Nf3")),
        ((1, 2), Ok("2... Nc6\n3. Bb5 a6")),
    ]);
    let out = scan(&[ruled_sheet()], None, &config(rec)).await.unwrap();

    assert_eq!(movetext(&out.pgn), "1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 *");
    assert_eq!(out.stats.valid, 6);
    assert_eq!(out.stats.columns, 4);
    assert_eq!(out.stats.failed_columns, 0);
    assert_eq!(out.stats.total_input_tokens, 100);
    assert_eq!(out.pages.len(), 1);
    assert!(!out.pages[0].table_fallback);
    assert!(!out.pages[0].columns_fallback);
    assert!(out.issues.is_empty(), "{:?}", out.issues);
    assert_eq!(out.pages[0].columns.len(), 4);
    assert!(out.debug.is_none());
}

#[tokio::test]
async fn german_sheet_uses_german_prompt_and_glyphs() {
    let rec = Scripted::new(&[((1, 1), Ok("1. e4 e5\n2. Sf3 Sc6\n3. Lb5 a6"))]);
    let cfg = ScanConfig::builder()
        .recognizer(rec.clone())
        .language(Language::German)
        .request_interval_ms(0)
        .build()
        .unwrap();
    let out = scan(&[ruled_sheet()], None, &cfg).await.unwrap();

    assert_eq!(movetext(&out.pgn), "1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 *");
    let prompts = rec.seen_prompts.lock().unwrap();
    assert_eq!(prompts.len(), 4);
    assert!(prompts.iter().all(|p| p.contains("german")));
}

#[tokio::test]
async fn greek_sheet_validates_every_move() {
    let rec = Scripted::new(&[((1, 1), Ok("1. e4 e5\n2. Νφ3 Νχ6"))]);
    let cfg = ScanConfig::builder()
        .recognizer(rec)
        .language(Language::Greek)
        .request_interval_ms(0)
        .max_retries(0)
        .build()
        .unwrap();
    let out = scan(&[ruled_sheet()], None, &cfg).await.unwrap();

    assert_eq!(movetext(&out.pgn), "1. e4 e5 2. Nf3 Nc6 *");
    assert_eq!(out.stats.valid, 4);
    assert_eq!(out.stats.invalid, 0);
    assert!(out
        .validation
        .moves()
        .all(|m| m.status == MoveStatus::Valid));
}

#[tokio::test]
async fn written_result_is_not_read_as_a_move() {
    for text in [
        "1. e4 e5\n2. Nf3 Nc6 1/2-1/2",
        "1. e4 e5\n2. Nf3 Nc6 ½-½",
        "1. e4 e5\n2. Nf3 Nc6 *",
    ] {
        let rec = Scripted::new(&[((1, 1), Ok(text))]);
        let out = scan(&[ruled_sheet()], None, &config(rec)).await.unwrap();

        assert_eq!(movetext(&out.pgn), "1. e4 e5 2. Nf3 Nc6 *", "{text}");
        assert_eq!(out.stats.valid, 4, "{text}");
        assert_eq!(out.stats.invalid, 0, "{text}");
    }
}

#[tokio::test]
async fn second_page_continues_the_game() {
    let rec = Scripted::new(&[
        ((1, 1), Ok("1. d4 Nf6\n2. c4 e6")),
        ((2, 1), Ok("3. Nc3 Bb4")),
    ]);
    let out = scan(&[ruled_sheet(), ruled_sheet()], None, &config(rec))
        .await
        .unwrap();
    assert_eq!(movetext(&out.pgn), "1. d4 Nf6 2. c4 e6 3. Nc3 Bb4 *");
    assert!(out.pages.iter().all(|p| p.included));
    assert_eq!(out.stats.pages, 2);
}

#[tokio::test]
async fn failed_column_drops_its_page() {
    let rec = Scripted::new(&[
        ((1, 1), Ok("1. e4 e5\n2. Nf3 Nc6")),
        ((2, 1), Ok("3. Bb5 a6")),
        ((2, 3), Err("HTTP 503")),
    ]);
    let counts = Arc::new(Counts::default());
    let cfg = ScanConfig::builder()
        .recognizer(rec)
        .request_interval_ms(0)
        .max_retries(0)
        .progress_callback(counts.clone())
        .build()
        .unwrap();

    let out = scan(&[ruled_sheet(), ruled_sheet()], None, &cfg).await.unwrap();

    assert_eq!(movetext(&out.pgn), "1. e4 e5 2. Nf3 Nc6 *");
    assert!(out.pages[0].included);
    assert!(!out.pages[1].included);
    assert_eq!(out.pages[1].failed_columns, vec![3]);
    assert!(out.issues.iter().any(|i| matches!(
        i,
        RunIssue::ExtractionFailed { error } if error.page() == 2
    )));
    assert_eq!(counts.total.load(Ordering::SeqCst), 8);
    assert_eq!(counts.started.load(Ordering::SeqCst), 8);
    assert_eq!(counts.completed.load(Ordering::SeqCst), 7);
    assert_eq!(counts.failed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unreadable_move_is_reported_not_fatal() {
    let rec = Scripted::new(&[((1, 1), Ok("1. e4 Nf7\n2. Nf3 Nc6"))]);
    let out = scan(&[ruled_sheet()], None, &config(rec)).await.unwrap();

    let moves: Vec<_> = out.validation.moves().collect();
    assert_eq!(moves[1].status, MoveStatus::Invalid);
    assert!(moves[1].explanation.contains("Nf7"));
    // Black is still to move, so "Nf3" cannot be played and "Nc6" can.
    assert_eq!(moves[2].status, MoveStatus::Invalid);
    assert_eq!(moves[3].status, MoveStatus::Valid);
    assert_eq!(out.stats.invalid, 2);
}

#[tokio::test]
async fn blank_page_degrades_with_geometry_issues() {
    let rec = Scripted::new(&[((1, 2), Ok("1. d4 d5"))]);
    let out = scan(&[blank_sheet()], None, &config(rec)).await.unwrap();

    assert!(out.pages[0].table_fallback);
    assert!(out
        .issues
        .iter()
        .any(|i| matches!(i, RunIssue::GeometryAmbiguous { page: 1, .. })));
    assert_eq!(movetext(&out.pgn), "1. d4 d5 *");
}

#[tokio::test]
async fn nothing_readable_gives_empty_game() {
    let rec = Scripted::new(&[]);
    let out = scan(&[ruled_sheet()], None, &config(rec)).await.unwrap();
    assert!(out.validation.is_empty());
    assert!(out.issues.contains(&RunIssue::NormalizationEmpty));
    assert_eq!(movetext(&out.pgn), "*");
}

#[tokio::test]
async fn debug_mode_keeps_artifacts() {
    let rec = Scripted::new(&[((1, 1), Ok("1. c4"))]);
    let cfg = ScanConfig::builder()
        .recognizer(rec)
        .request_interval_ms(0)
        .debug(true)
        .build()
        .unwrap();
    let out = scan(&[ruled_sheet()], None, &cfg).await.unwrap();

    let debug = out.debug.expect("debug artifacts");
    assert_eq!(debug.overlays.len(), 1);
    assert_eq!(debug.columns[0].len(), 4);
    assert_eq!(debug.transcripts.len(), 4);
    assert!(!debug.corners[0].is_empty());
}

#[tokio::test]
async fn metadata_and_sink() {
    let rec = Scripted::new(&[((1, 1), Ok("1. f3 e5\n2. g4 Qh4#"))]);
    let meta = GameMetadata {
        white: Some("Fool".into()),
        ..GameMetadata::default()
    };
    let sink = MemorySink::new();
    let stats = scan_into(&[ruled_sheet()], Some(&meta), &config(rec), &sink)
        .await
        .unwrap();
    assert_eq!(stats.valid, 4);

    let stored = sink.outputs();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].pgn.contains("[White \"Fool\"]"));
    assert!(stored[0].pgn.contains("[Result \"0-1\"]"));
}

#[tokio::test]
async fn input_errors_are_fatal() {
    let rec = Scripted::new(&[]);
    let err = scan(&[], None, &config(rec.clone())).await.unwrap_err();
    assert!(matches!(err, ScanError::NoPages));

    let tiny = RasterImage::from(GrayImage::from_pixel(20, 20, Luma([255])));
    let err = scan(&[tiny], None, &config(rec)).await.unwrap_err();
    assert!(matches!(err, ScanError::ImageTooSmall { page: 1, .. }));
}
