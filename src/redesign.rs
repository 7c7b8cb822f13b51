//! End-to-end entry points: PDF in, redesigned pages out.
//!
//! These wire the pieces together for the common case. Callers that need
//! their own client, or want to drive runs from existing page images, use
//! [`crate::orchestrator::Orchestrator`] directly.

use crate::config::RedesignConfig;
use crate::error::RedesignError;
use crate::export;
use crate::orchestrator::{DesignBrief, GenerationJob, Orchestrator, RunState};
use crate::output::Document;
use crate::pipeline::remote::GeminiClient;
use crate::pipeline::{input, render};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Resolve `input` (path or URL) and rasterise the selected pages.
pub async fn load_document(
    input_str: impl AsRef<str>,
    config: &RedesignConfig,
) -> Result<Document, RedesignError> {
    let input_str = input_str.as_ref();
    let start = Instant::now();

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let document = render::render_document(resolved.path(), config).await?;

    info!(
        "Loaded {}: {}/{} pages rasterised in {}ms",
        input_str,
        document.len(),
        document.total_pages,
        start.elapsed().as_millis()
    );
    Ok(document)
}

/// Like [`load_document`], but a failure only logs a warning and yields an
/// empty document. Meant for showing thumbnails before a run.
pub async fn preview(input_str: impl AsRef<str>, config: &RedesignConfig) -> Document {
    let input_str = input_str.as_ref();
    match load_document(input_str, config).await {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Preview of {} failed: {}", input_str, e);
            Document::default()
        }
    }
}

/// Build an orchestrator backed by [`GeminiClient`] with the config's
/// progress callback attached.
pub fn orchestrator_from_config(config: &RedesignConfig) -> Result<Orchestrator, RedesignError> {
    let client = GeminiClient::from_config(config)?;
    Ok(Orchestrator::new(Arc::new(client)).with_progress(config.progress_callback.clone()))
}

/// Redesign every selected page of `input` and return the terminal run state.
///
/// Validation problems (blank prompt, missing API key, empty document) are
/// returned as `Err` before any generation request. A page failure is not an
/// `Err` here: inspect `state.status` or call [`RunState::into_result`].
pub async fn redesign_pdf(
    input_str: impl AsRef<str>,
    brief: DesignBrief,
    config: &RedesignConfig,
) -> Result<RunState, RedesignError> {
    if brief.prompt.trim().is_empty() {
        return Err(RedesignError::EmptyPrompt);
    }
    let orchestrator = orchestrator_from_config(config)?;

    let document = load_document(input_str, config).await?;
    let job = GenerationJob::new(document.page_images(), brief).with_aspect_ratio(config.aspect_ratio);

    orchestrator.run(job).await
}

/// A finished run together with the outcome of writing it to disk.
#[derive(Debug)]
pub struct SavedRun {
    pub state: RunState,
    /// First error hit while writing page files or the archive. The results
    /// in `state` are kept either way.
    pub export_error: Option<RedesignError>,
}

impl SavedRun {
    /// Fold an export failure into an `Err`, dropping the state.
    pub fn into_result(self) -> Result<RunState, RedesignError> {
        match self.export_error {
            Some(e) => Err(e),
            None => Ok(self.state),
        }
    }
}

/// Write every produced page of `state` into `out_dir` and, when `archive`
/// is given, a zip of all pages.
///
/// The archive is attempted even if writing the page files failed.
pub async fn save_run(state: RunState, out_dir: &Path, archive: Option<&Path>) -> SavedRun {
    let results = state.generated();
    if results.is_empty() {
        warn!("No pages were redesigned; nothing to save");
        return SavedRun {
            state,
            export_error: None,
        };
    }

    let mut export_error = None;
    if let Err(e) = export::save_results(out_dir, &results).await {
        warn!("Saving pages to {} failed: {}", out_dir.display(), e);
        export_error = Some(e);
    }
    if let Some(path) = archive {
        if let Err(e) = export::write_archive(path, &results).await {
            warn!("Writing archive {} failed: {}", path.display(), e);
            export_error.get_or_insert(e);
        }
    }
    SavedRun {
        state,
        export_error,
    }
}

/// [`redesign_pdf`], then [`save_run`].
///
/// Partial results of a stopped or failed run are written too. Export
/// failures are reported in [`SavedRun::export_error`], never as `Err`.
pub async fn redesign_to_dir(
    input_str: impl AsRef<str>,
    brief: DesignBrief,
    config: &RedesignConfig,
    out_dir: impl AsRef<Path>,
    archive: Option<&Path>,
) -> Result<SavedRun, RedesignError> {
    let state = redesign_pdf(input_str, brief, config).await?;
    Ok(save_run(state, out_dir.as_ref(), archive).await)
}

/// Synchronous wrapper around [`redesign_pdf`].
///
/// Creates a temporary tokio runtime internally.
pub fn redesign_pdf_sync(
    input_str: impl AsRef<str>,
    brief: DesignBrief,
    config: &RedesignConfig,
) -> Result<RunState, RedesignError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| RedesignError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(redesign_pdf(input_str, brief, config))
}
