//! CLI binary for scoresheet2pgn.
//!
//! A thin shim over the library crate that maps CLI flags to `ScanConfig`
//! and `GameMetadata`, then prints PGN, JSON or the status table.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use scoresheet2pgn::pipeline::encode::png_bytes;
use scoresheet2pgn::sink::write_atomic;
use scoresheet2pgn::{
    scan_files, scan_transcripts, GameMetadata, GeometryParams, Language, NotationTables,
    PgnFileSink, ProgressCallback, RawTranscript, ScanConfig, ScanOutput, ScanProgressCallback,
    ValidationSink,
};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per column. Columns finish out of
/// order, so start times are keyed by (page, column).
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<(usize, usize), Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Finding the move table…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} columns  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Reading");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page: usize, column: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(&(page, column))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ScanProgressCallback for CliProgressCallback {
    fn on_scan_start(&self, total_columns: usize) {
        self.activate_bar(total_columns);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reading {total_columns} columns…"))
        ));
    }

    fn on_column_start(&self, page: usize, column: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert((page, column), Instant::now());
        self.bar.set_message(format!("page {page} column {column}"));
    }

    fn on_column_complete(&self, page: usize, column: usize, _total: usize, lines: usize) {
        let secs = self.elapsed_secs(page, column);
        self.bar.println(format!(
            "  {} Page {} column {:<2}  {:<10}  {}",
            green("✓"),
            page,
            column,
            dim(&format!("{lines:>3} lines")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_column_error(&self, page: usize, column: usize, _total: usize, error: &str) {
        let secs = self.elapsed_secs(page, column);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {} column {:<2}  {}  {}",
            red("✗"),
            page,
            column,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_scan_complete(&self, total_columns: usize, succeeded: usize) {
        let failed = total_columns.saturating_sub(succeeded);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} columns read",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} columns read  ({} failed)",
                if failed == total_columns {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&succeeded.to_string()),
                total_columns,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One sheet, PGN on stdout
  sheet2pgn sheet.jpg

  # Front and back of a two-page sheet, German notation, to a file
  sheet2pgn --language de front.jpg back.jpg -o game.pgn

  # Player names and event tags
  sheet2pgn sheet.png --white "Carlsen" --black "Nepo" --event "Club Open" --round 3

  # Text that was already transcribed (no API key needed)
  sheet2pgn --transcript moves.txt --language el

  # Full JSON report, with overlays and crops for inspection
  sheet2pgn sheet.jpg --json --debug-dir debug/ > report.json

  # Three columns per page, no table cropping
  sheet2pgn --columns 3 --no-auto-crop photo.jpg

LANGUAGES:
  en english   K Q R B N
  de german    K D T L S
  fr french    R D T F C
  es spanish   R D T A C
  it italian   R D T A C
  nl dutch     K D T L P
  ru russian   Кр Ф Л С К   (Cyrillic files а–г)
  el greek     Ρ Β Π Α Ι    (Greek files α–θ)

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  RUST_LOG                Log filter, e.g. scoresheet2pgn=debug
"#;

/// Convert photographed chess scoresheets to PGN.
#[derive(Parser, Debug)]
#[command(
    name = "sheet2pgn",
    version,
    about = "Convert photographed chess scoresheets to PGN using Vision LLMs",
    long_about = "Read handwritten chess scoresheets (PNG/JPEG files or URLs), validate every \
move against the rules of chess, and write the game as PGN. Unreadable moves are corrected \
when exactly one legal move fits, and reported otherwise.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// One or two scoresheet images (paths or HTTP/HTTPS URLs).
    #[arg(required_unless_present_any = ["transcript", "list_languages"], num_args = 1..=2)]
    inputs: Vec<String>,

    /// Read moves from a text file ("-" for stdin) instead of images.
    #[arg(long, conflicts_with = "inputs")]
    transcript: Option<PathBuf>,

    /// Write to this file instead of stdout (.json writes the full report).
    #[arg(short, long, env = "SHEET2PGN_OUTPUT")]
    output: Option<PathBuf>,

    /// Notation language: code or name (en, de, fr, es, it, nl, ru, el).
    #[arg(short, long, env = "SHEET2PGN_LANGUAGE", default_value = "en")]
    language: Language,

    /// Move columns per page.
    #[arg(long, env = "SHEET2PGN_COLUMNS", default_value_t = 4,
          value_parser = clap::value_parser!(u16).range(1..=12))]
    columns: u16,

    /// Use the whole image instead of cropping to the ruled table.
    #[arg(long, env = "SHEET2PGN_NO_AUTO_CROP")]
    no_auto_crop: bool,

    /// Split columns at exact equal widths instead of searching for gaps.
    #[arg(long, env = "SHEET2PGN_NO_HEURISTICS")]
    no_heuristics: bool,

    /// JSON file with geometry thresholds (missing fields keep defaults).
    #[arg(long, env = "SHEET2PGN_GEOMETRY")]
    geometry: Option<PathBuf>,

    /// JSON file with glyph tables replacing the built-in ones.
    #[arg(long, env = "SHEET2PGN_TABLES")]
    tables: Option<PathBuf>,

    /// Largest edit distance accepted when repairing garbled moves (0–3).
    #[arg(long, env = "SHEET2PGN_MAX_EDIT_DISTANCE", default_value_t = 1)]
    max_edit_distance: usize,

    /// Report every imperfect move as invalid instead of correcting it.
    #[arg(long, env = "SHEET2PGN_NO_CORRECTION")]
    no_correction: bool,

    // ── Game metadata ──────────────────────────────────────────────────
    #[arg(long, help_heading = "Game tags")]
    event: Option<String>,
    #[arg(long, help_heading = "Game tags")]
    site: Option<String>,
    /// Date as YYYY.MM.DD.
    #[arg(long, help_heading = "Game tags")]
    date: Option<String>,
    #[arg(long, help_heading = "Game tags")]
    round: Option<String>,
    #[arg(long, help_heading = "Game tags")]
    white: Option<String>,
    #[arg(long, help_heading = "Game tags")]
    black: Option<String>,
    /// 1-0, 0-1, 1/2-1/2 or *.
    #[arg(long, help_heading = "Game tags")]
    result: Option<String>,
    /// Extra tag as NAME=VALUE (repeatable).
    #[arg(long = "tag", value_name = "NAME=VALUE", help_heading = "Game tags")]
    tags: Vec<String>,

    // ── Recogniser ─────────────────────────────────────────────────────
    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Number of concurrent recogniser calls.
    #[arg(short, long, env = "SHEET2PGN_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Minimum milliseconds between the starts of two recogniser calls.
    #[arg(long, env = "SHEET2PGN_REQUEST_INTERVAL", default_value_t = 250)]
    request_interval: u64,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "SHEET2PGN_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens per column.
    #[arg(long, env = "SHEET2PGN_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "SHEET2PGN_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Retries per column on recogniser failure.
    #[arg(long, env = "SHEET2PGN_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "SHEET2PGN_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-column recogniser timeout in seconds.
    #[arg(long, env = "SHEET2PGN_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    // ── Output ─────────────────────────────────────────────────────────
    /// Output the full JSON report instead of PGN.
    #[arg(long, env = "SHEET2PGN_JSON")]
    json: bool,

    /// Print the per-move status table to stderr.
    #[arg(long, env = "SHEET2PGN_STATUS")]
    status: bool,

    /// Write overlays, column crops and transcripts into this directory.
    #[arg(long, env = "SHEET2PGN_DEBUG_DIR")]
    debug_dir: Option<PathBuf>,

    /// List supported languages and exit.
    #[arg(long)]
    list_languages: bool,

    /// Disable progress bar.
    #[arg(long, env = "SHEET2PGN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SHEET2PGN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SHEET2PGN_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress =
        !cli.quiet && !cli.no_progress && !cli.json && cli.transcript.is_none();
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.list_languages {
        for language in Language::ALL {
            println!("{}  {}", language.code(), language.name());
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ScanProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;
    let metadata = build_metadata(&cli)?;

    // ── Run scan ─────────────────────────────────────────────────────────
    let output = if let Some(ref path) = cli.transcript {
        let text = read_transcript(path).await?;
        let transcript = RawTranscript {
            page: 0,
            column: 0,
            lines: text.lines().map(str::to_string).collect(),
        };
        scan_transcripts(&[transcript], Some(&metadata), &config)
            .await
            .context("Validation failed")?
    } else {
        scan_files(&cli.inputs, Some(&metadata), &config)
            .await
            .context("Scan failed")?
    };

    if let Some(ref dir) = cli.debug_dir {
        write_debug_dir(dir, &output).await?;
    }

    // ── Emit ─────────────────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let sink = PgnFileSink::new(output_path);
        sink.store(&output).await.context("Failed to write output")?;
    } else if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.pgn.as_bytes())
            .context("Failed to write to stdout")?;
    }

    if cli.status {
        eprint!("{}", output.validation.status_table());
    }

    if !cli.quiet {
        print_summary(&output, cli.output.as_deref());
    }

    Ok(())
}

fn print_summary(output: &ScanOutput, path: Option<&Path>) {
    for issue in &output.issues {
        eprintln!("{} {}", cyan("⚠"), issue);
    }
    let s = &output.stats;
    let mark = if s.invalid == 0 && output.issues.is_empty() {
        green("✔")
    } else {
        cyan("⚠")
    };
    let target = path
        .map(|p| format!("  →  {}", bold(&p.display().to_string())))
        .unwrap_or_default();
    eprintln!(
        "{mark}  {} valid, {} corrected, {} invalid  {}ms{target}",
        s.valid, s.corrected, s.invalid, s.total_duration_ms,
    );
    if s.total_input_tokens > 0 {
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&s.total_input_tokens.to_string()),
            dim(&s.total_output_tokens.to_string()),
        );
    }
}

/// Map CLI args to `ScanConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ScanConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = ScanConfig::builder()
        .language(cli.language)
        .expected_columns(usize::from(cli.columns))
        .auto_crop(!cli.no_auto_crop)
        .use_heuristics(!cli.no_heuristics)
        .max_edit_distance(cli.max_edit_distance)
        .correction_enabled(!cli.no_correction)
        .concurrency(cli.concurrency)
        .request_interval_ms(cli.request_interval)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout)
        .debug(cli.debug_dir.is_some());

    if let Some(ref path) = cli.geometry {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read geometry parameters from {:?}", path))?;
        let params: GeometryParams =
            serde_json::from_str(&json).context("Invalid geometry parameters")?;
        builder = builder.geometry(params);
    }
    if let Some(ref path) = cli.tables {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read glyph tables from {:?}", path))?;
        let tables = NotationTables::from_json(&json).context("Invalid glyph tables")?;
        builder = builder.notation(Arc::new(tables));
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Map the tag flags to `GameMetadata`.
fn build_metadata(cli: &Cli) -> Result<GameMetadata> {
    let mut meta = GameMetadata {
        event: cli.event.clone(),
        site: cli.site.clone(),
        date: cli.date.clone(),
        round: cli.round.clone(),
        white: cli.white.clone(),
        black: cli.black.clone(),
        result: cli.result.clone(),
        ..GameMetadata::default()
    };
    for tag in &cli.tags {
        let (name, value) = parse_tag(tag)?;
        meta = meta.with_tag(name, value);
    }
    Ok(meta)
}

/// Parse `--tag NAME=VALUE`.
fn parse_tag(s: &str) -> Result<(String, String)> {
    let (name, value) = s
        .split_once('=')
        .with_context(|| format!("Invalid tag '{s}': expected NAME=VALUE"))?;
    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        anyhow::bail!("Invalid tag name '{}': use letters, digits and '_'", name);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

async fn read_transcript(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read transcript from stdin")?;
        return Ok(text);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read transcript from {:?}", path))
}

/// Dump debug artefacts: overlays, column crops, transcripts, page reports.
async fn write_debug_dir(dir: &Path, output: &ScanOutput) -> Result<()> {
    let Some(ref artifacts) = output.debug else {
        return Ok(());
    };

    for (idx, overlay) in artifacts.overlays.iter().enumerate() {
        let bytes = png_bytes(overlay).context("Failed to encode overlay")?;
        write_atomic(&dir.join(format!("page{}_overlay.png", idx + 1)), &bytes).await?;
    }
    for (p, columns) in artifacts.columns.iter().enumerate() {
        for (c, crop) in columns.iter().enumerate() {
            let bytes = png_bytes(crop).context("Failed to encode column crop")?;
            write_atomic(&dir.join(format!("page{}_col{}.png", p + 1, c + 1)), &bytes).await?;
        }
    }
    for t in &artifacts.transcripts {
        let text = t.lines.join("\n") + "\n";
        write_atomic(
            &dir.join(format!("page{}_col{}.txt", t.page, t.column)),
            text.as_bytes(),
        )
        .await?;
    }
    let pages = serde_json::to_vec_pretty(&output.pages).context("Failed to serialise pages")?;
    write_atomic(&dir.join("pages.json"), &pages).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tag_splits_on_first_equals() {
        assert_eq!(
            parse_tag("Annotator=A=B").unwrap(),
            ("Annotator".to_string(), "A=B".to_string())
        );
        assert!(parse_tag("NoEquals").is_err());
        assert!(parse_tag("Bad Name=x").is_err());
    }

    #[test]
    fn cli_parses_language_codes_and_names() {
        let cli = Cli::parse_from(["sheet2pgn", "--language", "el", "sheet.png"]);
        assert_eq!(cli.language, Language::Greek);
        let cli = Cli::parse_from(["sheet2pgn", "-l", "German", "a.png", "b.png"]);
        assert_eq!(cli.language, Language::German);
        assert_eq!(cli.inputs.len(), 2);
    }

    #[test]
    fn cli_rejects_three_pages() {
        assert!(Cli::try_parse_from(["sheet2pgn", "a.png", "b.png", "c.png"]).is_err());
    }
}
