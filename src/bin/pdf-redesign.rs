//! CLI binary for pdf-redesign.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `RedesignConfig` and a `DesignBrief`, streams the run, and saves results.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_redesign::keystore::{API_KEY_VAR, DEFAULT_KEY_FILE};
use pdf_redesign::pipeline::encode::load_image_file;
use pdf_redesign::{
    export, redesign_stream, ApiKeyStore, AspectRatio, DesignBrief, GeneratedImage, PageSelection,
    ProgressCallback, RedesignConfig, RunProgressCallback, RunState, RunStatus,
};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar with one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the page in flight. Pages never overlap.
    page_started: Mutex<Instant>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(SPINNER);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Rendering PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(Instant::now()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Redesigning");
        self.bar.reset_eta();
    }

    fn page_elapsed(&self) -> String {
        let started = *self
            .page_started
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        dim(&format!("{:.1}s", started.elapsed().as_secs_f64()))
    }
}

impl RunProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Redesigning {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        *self
            .page_started
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            self.page_elapsed(),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            self.page_elapsed(),
        ));
        self.bar.finish_and_clear();
    }

    fn on_run_stopped(&self, completed: usize, total: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} Stopped after {}/{} pages",
            yellow("■"),
            bold(&completed.to_string()),
            total
        );
    }

    fn on_run_complete(&self, total: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages redesigned",
            green("✔"),
            bold(&total.to_string())
        );
    }
}

/// What the `presses`-th Ctrl-C does: the first stops gracefully, any
/// further one quits without waiting for the page in flight.
#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    Stop,
    Abort,
}

fn interrupt_action(presses: usize) -> Interrupt {
    if presses <= 1 {
        Interrupt::Stop
    } else {
        Interrupt::Abort
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Redesign every page, results in ./redesigned/
  pdf-redesign deck.pdf --prompt "Flat design, navy and coral palette"

  # Widescreen output plus a zip of all pages
  pdf-redesign deck.pdf -p "Minimal, lots of whitespace" --aspect-ratio 16:9 --zip deck.zip

  # Style reference for every page, special instruction for the first page
  pdf-redesign deck.pdf -p "Match the brand" --reference brand.png \
      --page-prompt "1=Bold title slide with a large hero image"

  # Only pages 3 to 8
  pdf-redesign deck.pdf -p "Dark theme" --pages 3-8

  # Save the API key to .env.local for later runs
  pdf-redesign --set-api-key AIza...

Press Ctrl-C during a run to stop after the page in flight; pages finished
so far are still saved.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Generative Language API key
  PDF_REDESIGN_MODEL      Override the image model
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
"#;

/// Redesign each page of a PDF with a generative image model.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-redesign",
    version,
    about = "Redesign each page of a PDF with a generative image model",
    long_about = "Rasterise a PDF (local file or URL) and ask a Gemini image model to redesign \
every page from a text prompt. Pages are generated in order and each finished page is sent \
along with the next one so the whole deck keeps a consistent look.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    #[arg(required_unless_present = "set_api_key")]
    input: Option<String>,

    /// Design instruction applied to every page.
    #[arg(short, long, env = "PDF_REDESIGN_PROMPT", required_unless_present = "set_api_key")]
    prompt: Option<String>,

    /// Instruction for one page, as N=TEXT (N is the 1-based position in the run). Repeatable.
    #[arg(long = "page-prompt", value_name = "N=TEXT", value_parser = parse_page_pair)]
    page_prompts: Vec<(usize, String)>,

    /// Style reference image sent with every page.
    #[arg(short, long, value_name = "PATH")]
    reference: Option<PathBuf>,

    /// Style reference for one page, as N=PATH. Repeatable.
    #[arg(long = "page-reference", value_name = "N=PATH", value_parser = parse_page_pair)]
    page_references: Vec<(usize, String)>,

    /// Output aspect ratio: original, 16:9, 4:3, 1:1, 9:16.
    #[arg(long, env = "PDF_REDESIGN_ASPECT_RATIO", default_value = "original")]
    aspect_ratio: AspectRatio,

    /// Directory for the redesigned pages.
    #[arg(short, long, env = "PDF_REDESIGN_OUTPUT_DIR", default_value = "redesigned")]
    output_dir: PathBuf,

    /// Also write every page into this zip archive.
    #[arg(long, value_name = "PATH")]
    zip: Option<PathBuf>,

    /// Image model ID.
    #[arg(long, env = "PDF_REDESIGN_MODEL")]
    model: Option<String>,

    /// API key. Falls back to the key file when unset.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// dotenv-style file the API key is read from and saved to.
    #[arg(long, env = "PDF_REDESIGN_KEY_FILE", default_value = DEFAULT_KEY_FILE)]
    key_file: PathBuf,

    /// Save this API key to the key file. Exits when no input is given.
    #[arg(long, value_name = "KEY")]
    set_api_key: Option<String>,

    /// Render scale relative to 72 DPI (0.5–6.0).
    #[arg(long, default_value_t = 3.0)]
    scale: f32,

    /// JPEG quality of the page images sent to the model (1–100).
    #[arg(long, default_value_t = 80)]
    quality: u8,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF_REDESIGN_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF_REDESIGN_PASSWORD")]
    password: Option<String>,

    /// Per-page API timeout in seconds. Default: wait indefinitely.
    #[arg(long, env = "PDF_REDESIGN_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// HTTP download timeout in seconds.
    #[arg(long, default_value_t = 120)]
    download_timeout: u64,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar gives all the feedback that matters; keep library
    // INFO logs out of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    let store = ApiKeyStore::new(&cli.key_file);

    // ── Key management ───────────────────────────────────────────────────
    if let Some(ref key) = cli.set_api_key {
        store
            .set(key)
            .await
            .with_context(|| format!("Failed to save API key to {}", cli.key_file.display()))?;
        if !cli.quiet {
            eprintln!(
                "{} API key saved to {}",
                green("✔"),
                bold(&cli.key_file.display().to_string())
            );
        }
        if cli.input.is_none() {
            return Ok(());
        }
    }

    let (Some(input), Some(prompt)) = (cli.input.clone(), cli.prompt.clone()) else {
        anyhow::bail!("An input PDF and --prompt are required");
    };

    let api_key = resolve_api_key(&cli, &store).await?;

    // ── Build config and brief ───────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn RunProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, api_key, progress_cb)?;
    let brief = build_brief(&cli, prompt).await?;

    // ── Run ──────────────────────────────────────────────────────────────
    let started = Instant::now();
    let (orchestrator, mut states) = redesign_stream(&input, brief, &config)
        .await
        .context("Redesign could not start")?;

    {
        let orchestrator = Arc::clone(&orchestrator);
        let quiet = cli.quiet;
        tokio::spawn(async move {
            let mut presses = 0;
            while tokio::signal::ctrl_c().await.is_ok() {
                presses += 1;
                match interrupt_action(presses) {
                    Interrupt::Stop => {
                        if !quiet {
                            eprintln!(
                                "{} Stopping after the current page… (Ctrl-C again to quit now)",
                                yellow("■")
                            );
                        }
                        orchestrator.stop();
                    }
                    Interrupt::Abort => {
                        eprintln!("{} Interrupted", red("✗"));
                        std::process::exit(130);
                    }
                }
            }
        });
    }

    let mut last = RunState::idle();
    while let Some(state) = states.next().await {
        last = state;
    }

    // ── Save results (also partial ones) ─────────────────────────────────
    let results = last.generated();
    if !results.is_empty() {
        let written = export::save_results(&cli.output_dir, &results)
            .await
            .context("Failed to save redesigned pages")?;
        if let Some(ref zip_path) = cli.zip {
            export::write_archive(zip_path, &results)
                .await
                .context("Failed to write zip archive")?;
        }
        if !cli.quiet {
            print_summary(&cli, &last, &results, written.len(), started.elapsed());
        }
    }

    match last.status {
        RunStatus::Completed => Ok(()),
        RunStatus::Stopped => {
            if !cli.quiet && !show_progress {
                eprintln!("Stopped after {}/{} pages", last.results.len(), last.total_pages);
            }
            Ok(())
        }
        RunStatus::Failed { .. } => {
            last.into_result().context("Redesign failed")?;
            Ok(())
        }
        RunStatus::Idle | RunStatus::Running => anyhow::bail!("Redesign ended unexpectedly"),
    }
}

/// `--api-key` / `GEMINI_API_KEY`, then the key file.
async fn resolve_api_key(cli: &Cli, store: &ApiKeyStore) -> Result<String> {
    if let Some(key) = cli.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }
    let stored = store
        .get()
        .await
        .with_context(|| format!("Failed to read {}", store.path().display()))?;
    if stored.is_empty() {
        anyhow::bail!(
            "{} is not set.\nPass --api-key, export {}, or save one with --set-api-key.",
            API_KEY_VAR,
            API_KEY_VAR
        );
    }
    Ok(stored)
}

/// Map CLI args to `RedesignConfig`.
fn build_config(
    cli: &Cli,
    api_key: String,
    progress: Option<ProgressCallback>,
) -> Result<RedesignConfig> {
    let mut builder = RedesignConfig::builder()
        .scale(cli.scale)
        .jpeg_quality(cli.quality)
        .pages(parse_pages(&cli.pages)?)
        .aspect_ratio(cli.aspect_ratio)
        .api_key(api_key)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Collect the prompt, per-page prompts, and reference images.
async fn build_brief(cli: &Cli, prompt: String) -> Result<DesignBrief> {
    let mut brief = DesignBrief::new(prompt);

    for (n, text) in &cli.page_prompts {
        brief = brief.with_page_prompt(n - 1, text.clone());
    }

    if let Some(ref path) = cli.reference {
        let image = load_image_file(path)
            .await
            .with_context(|| format!("Failed to load reference image {}", path.display()))?;
        brief = brief.with_global_reference(image);
    }

    for (n, path) in &cli.page_references {
        let path = PathBuf::from(path);
        let image = load_image_file(&path)
            .await
            .with_context(|| format!("Failed to load reference image {}", path.display()))?;
        brief = brief.with_page_reference(n - 1, image);
    }

    Ok(brief)
}

fn print_summary(
    cli: &Cli,
    state: &RunState,
    results: &[GeneratedImage],
    written: usize,
    elapsed: Duration,
) {
    let text_only = results.iter().filter(|r| r.is_fallback_text()).count();
    eprintln!(
        "{}  {}/{} pages  {:.1}s  →  {}",
        if state.status == RunStatus::Completed {
            green("✔")
        } else {
            cyan("⚠")
        },
        written,
        state.total_pages,
        elapsed.as_secs_f64(),
        bold(&cli.output_dir.display().to_string()),
    );
    if text_only > 0 {
        eprintln!(
            "   {}",
            yellow(&format!(
                "{text_only} page(s) came back as text instead of an image (saved as .txt)"
            ))
        );
    }
    if let Some(ref zip_path) = cli.zip {
        eprintln!("   archive: {}", dim(&zip_path.display().to_string()));
    }
}

/// Parse `N=VALUE` with a 1-based page number.
fn parse_page_pair(s: &str) -> Result<(usize, String), String> {
    let (n, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected N=VALUE, got '{s}'"))?;
    let n: usize = n
        .trim()
        .parse()
        .map_err(|_| format!("invalid page number '{}'", n.trim()))?;
    if n < 1 {
        return Err("pages are 1-indexed, minimum is 1".to_string());
    }
    if value.trim().is_empty() {
        return Err(format!("empty value for page {n}"));
    }
    Ok((n, value.to_string()))
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}
