//! Generation orchestrator: redesign a document one page at a time.
//!
//! ## Run loop
//!
//! ```text
//! for each page i (in order):
//!   stopped? ──yes──▶ Stopped (page i never dispatched)
//!   compose prompt      (page override, global prompt, consistency clause)
//!   build references    (global, page reference, previous result)
//!   client.redesign ──err──▶ Failed { page i } (pages 0..i kept)
//!   record result, thread it forward as the next page's reference
//! Completed
//! ```
//!
//! Exactly one page is in flight at any time. [`Orchestrator::stop`] only
//! raises a flag that the loop checks before dispatching the next page, so a
//! request already sent is allowed to finish; callers should expect up to
//! one page of extra latency between `stop()` and the run halting.
//!
//! An orchestrator owns at most one run at a time; `run` and `start` return
//! [`RedesignError::RunInProgress`] until the active run reaches a terminal
//! state.

use crate::config::AspectRatio;
use crate::error::RedesignError;
use crate::output::{GeneratedImage, PageOutput};
use crate::pipeline::encode::ImageData;
use crate::pipeline::references::build_references;
use crate::pipeline::remote::{GenerationRequest, RedesignClient};
use crate::progress::ProgressCallback;
use crate::prompts::compose_prompt;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What the user asked for, independent of the document it applies to.
///
/// Per-page maps are keyed by the 0-based position of the page in the run.
#[derive(Debug, Clone, Default)]
pub struct DesignBrief {
    /// Global design instruction. Required.
    pub prompt: String,
    /// Page-specific instructions; they take priority over `prompt`.
    pub page_prompts: HashMap<usize, String>,
    /// Page-specific reference images.
    pub page_references: HashMap<usize, ImageData>,
    /// Reference image applied to every page.
    pub global_reference: Option<ImageData>,
}

impl DesignBrief {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_page_prompt(mut self, page_index: usize, prompt: impl Into<String>) -> Self {
        self.page_prompts.insert(page_index, prompt.into());
        self
    }

    pub fn with_page_reference(mut self, page_index: usize, image: ImageData) -> Self {
        self.page_references.insert(page_index, image);
        self
    }

    pub fn with_global_reference(mut self, image: ImageData) -> Self {
        self.global_reference = Some(image);
        self
    }
}

/// Inputs of one run. Owned by the run, so later edits by the caller never
/// reach pages that have not been processed yet.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub pages: Vec<ImageData>,
    pub brief: DesignBrief,
    pub aspect_ratio: AspectRatio,
}

impl GenerationJob {
    pub fn new(pages: Vec<ImageData>, brief: DesignBrief) -> Self {
        Self {
            pages,
            brief,
            aspect_ratio: AspectRatio::default(),
        }
    }

    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    fn validate(&self) -> Result<(), RedesignError> {
        if self.pages.is_empty() {
            return Err(RedesignError::MissingDocument);
        }
        if self.brief.prompt.trim().is_empty() {
            return Err(RedesignError::EmptyPrompt);
        }
        Ok(())
    }
}

/// Lifecycle of a run: `Idle → Running → {Completed | Stopped | Failed}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    /// Halted by [`Orchestrator::stop`]. Not a failure.
    Stopped,
    /// A page could not be generated; later pages were never attempted.
    Failed { page_index: usize, message: String },
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Stopped | RunStatus::Failed { .. }
        )
    }
}

/// Snapshot of a run.
///
/// `results` never outgrows `current_page_index`, and `previous_result` is
/// always the last entry of `results` (or `None` before the first success).
#[derive(Debug, Clone)]
pub struct RunState {
    pub total_pages: usize,
    /// Number of pages processed so far; the next page to dispatch.
    pub current_page_index: usize,
    pub status: RunStatus,
    pub results: Vec<PageOutput>,
    pub previous_result: Option<GeneratedImage>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::idle()
    }
}

impl RunState {
    pub fn idle() -> Self {
        Self {
            total_pages: 0,
            current_page_index: 0,
            status: RunStatus::Idle,
            results: Vec::new(),
            previous_result: None,
        }
    }

    fn running(total_pages: usize) -> Self {
        Self {
            total_pages,
            status: RunStatus::Running,
            ..Self::idle()
        }
    }

    /// `(completed, total)` pages.
    pub fn progress(&self) -> (usize, usize) {
        (self.current_page_index, self.total_pages)
    }

    /// Generated results in page order.
    pub fn generated(&self) -> Vec<GeneratedImage> {
        self.results.iter().map(|p| p.result.clone()).collect()
    }

    /// Treat a failed run as an error. Stopped and completed runs are `Ok`.
    pub fn into_result(self) -> Result<Self, RedesignError> {
        match self.status {
            RunStatus::Failed {
                page_index,
                message,
            } => Err(RedesignError::PageFailed {
                page: page_index + 1,
                detail: message,
            }),
            _ => Ok(self),
        }
    }
}

/// A stream of run snapshots: one `Running` snapshot when the run starts,
/// one per completed page, and a final terminal snapshot.
pub type RunStream = Pin<Box<dyn Stream<Item = RunState> + Send>>;

/// Drives generation runs against a [`RedesignClient`].
pub struct Orchestrator {
    client: Arc<dyn RedesignClient>,
    progress: Option<ProgressCallback>,
    cancel: Mutex<CancellationToken>,
    active: Arc<AtomicBool>,
}

/// Marks the orchestrator busy for as long as it lives.
struct ActiveRun(Arc<AtomicBool>);

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Orchestrator {
    pub fn new(client: Arc<dyn RedesignClient>) -> Self {
        Self {
            client,
            progress: None,
            cancel: Mutex::new(CancellationToken::new()),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Ask the current run to halt before its next page. Idempotent.
    pub fn stop(&self) {
        let token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        if !token.is_cancelled() {
            info!("Stop requested; the page in flight will be allowed to finish");
        }
        token.cancel();
    }

    /// True while a run started by `run` or `start` has not reached a
    /// terminal state.
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Claim the orchestrator for a new run and hand it a fresh cancellation
    /// flag. Only one run may be active at a time.
    fn begin_run(&self) -> Result<(ActiveRun, CancellationToken), RedesignError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Rejected new run: a run is already in progress");
            return Err(RedesignError::RunInProgress);
        }
        let active = ActiveRun(Arc::clone(&self.active));
        let mut guard = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = CancellationToken::new();
        Ok((active, guard.clone()))
    }

    /// Run `job` to completion and return the terminal state.
    ///
    /// Returns `Err` only for validation failures or when another run is
    /// still active, before any request is made. A page failure is reported
    /// as [`RunStatus::Failed`].
    pub async fn run(&self, job: GenerationJob) -> Result<RunState, RedesignError> {
        job.validate()?;
        let (_active, cancel) = self.begin_run()?;
        Ok(drive(self.client.as_ref(), self.progress.as_ref(), &cancel, job, |_| {}).await)
    }

    /// Start `job` on a background task and stream its state updates.
    ///
    /// Must be called inside a Tokio runtime. Validation errors and
    /// [`RedesignError::RunInProgress`] are returned immediately; no task is
    /// spawned in either case.
    pub fn start(&self, job: GenerationJob) -> Result<RunStream, RedesignError> {
        job.validate()?;
        let (active, cancel) = self.begin_run()?;
        let client = Arc::clone(&self.client);
        let progress = self.progress.clone();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            drive(client.as_ref(), progress.as_ref(), &cancel, job, |state| {
                // A dropped receiver just means nobody is watching any more.
                let _ = tx.send(state.clone());
            })
            .await;
            // Release before closing the stream so a caller that has drained
            // it can start the next run straight away.
            drop(active);
            drop(tx);
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

async fn drive<F>(
    client: &dyn RedesignClient,
    progress: Option<&ProgressCallback>,
    cancel: &CancellationToken,
    job: GenerationJob,
    mut emit: F,
) -> RunState
where
    F: FnMut(&RunState),
{
    let GenerationJob {
        pages,
        brief,
        aspect_ratio,
    } = job;
    let total = pages.len();
    let mut state = RunState::running(total);

    info!("Starting redesign run: {} pages, aspect ratio {}", total, aspect_ratio);
    if let Some(cb) = progress {
        cb.on_run_start(total);
    }
    emit(&state);

    for (i, page_image) in pages.into_iter().enumerate() {
        let page_num = i + 1;

        if cancel.is_cancelled() {
            info!("Run stopped before page {} ({}/{} pages redesigned)", page_num, i, total);
            state.status = RunStatus::Stopped;
            if let Some(cb) = progress {
                cb.on_run_stopped(i, total);
            }
            emit(&state);
            return state;
        }

        let previous_image = state.previous_result.as_ref().and_then(GeneratedImage::as_image);
        let prompt = compose_prompt(
            i,
            &brief.prompt,
            brief.page_prompts.get(&i).map(String::as_str),
            previous_image.is_some(),
        );
        let reference_images = build_references(
            brief.global_reference.as_ref(),
            brief.page_references.get(&i),
            previous_image,
        );
        let request = GenerationRequest {
            page_index: i,
            page_image,
            prompt,
            reference_images,
            aspect_ratio,
        };

        if let Some(cb) = progress {
            cb.on_page_start(page_num, total);
        }
        debug!(
            "Page {}/{}: dispatching with {} reference(s)",
            page_num,
            total,
            request.reference_images.len()
        );

        let started = Instant::now();
        let outcome = match request.validate() {
            Ok(()) => client.redesign(&request).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => {
                if result.is_fallback_text() {
                    warn!("Page {}: model returned text instead of an image", page_num);
                }
                state.results.push(PageOutput {
                    page_index: i,
                    result: result.clone(),
                    duration_ms: started.elapsed().as_millis() as u64,
                });
                state.previous_result = Some(result);
                state.current_page_index = page_num;
                debug!("Page {}/{} redesigned in {:?}", page_num, total, started.elapsed());
                if let Some(cb) = progress {
                    cb.on_page_complete(page_num, total);
                }
                emit(&state);
            }
            Err(e) => {
                let message = e.to_string();
                warn!("Page {}/{} failed, aborting run: {}", page_num, total, message);
                if let Some(cb) = progress {
                    cb.on_page_error(page_num, total, &message);
                }
                state.status = RunStatus::Failed {
                    page_index: i,
                    message,
                };
                emit(&state);
                return state;
            }
        }
    }

    info!("Redesign run complete: {} pages", total);
    state.status = RunStatus::Completed;
    if let Some(cb) = progress {
        cb.on_run_complete(total);
    }
    emit(&state);
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes each page back as a PNG tagged with the page index.
    struct EchoClient {
        calls: AtomicUsize,
    }

    impl RedesignClient for EchoClient {
        fn redesign<'a>(
            &'a self,
            request: &'a GenerationRequest,
        ) -> BoxFuture<'a, Result<GeneratedImage, RedesignError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let tag = request.page_index as u8;
            Box::pin(async move { Ok(GeneratedImage::Image(ImageData::new("image/png", vec![tag]))) })
        }
    }

    fn pages(n: usize) -> Vec<ImageData> {
        (0..n)
            .map(|i| ImageData::new("image/jpeg", vec![0xFF, i as u8]))
            .collect()
    }

    #[tokio::test]
    async fn empty_document_fails_fast() {
        let client = Arc::new(EchoClient { calls: AtomicUsize::new(0) });
        let orch = Orchestrator::new(client.clone());
        let err = orch
            .run(GenerationJob::new(vec![], DesignBrief::new("pastel")))
            .await
            .unwrap_err();
        assert!(matches!(err, RedesignError::MissingDocument));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_prompt_fails_fast() {
        let client = Arc::new(EchoClient { calls: AtomicUsize::new(0) });
        let orch = Orchestrator::new(client.clone());
        assert!(matches!(
            orch.start(GenerationJob::new(pages(2), DesignBrief::new("  "))),
            Err(RedesignError::EmptyPrompt)
        ));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn full_run_threads_previous_result() {
        let client = Arc::new(EchoClient { calls: AtomicUsize::new(0) });
        let orch = Orchestrator::new(client);
        let state = orch
            .run(GenerationJob::new(pages(3), DesignBrief::new("pastel")))
            .await
            .unwrap();

        assert_eq!(state.status, RunStatus::Completed);
        assert_eq!(state.progress(), (3, 3));
        assert_eq!(state.results.len(), 3);
        for (i, out) in state.results.iter().enumerate() {
            assert_eq!(out.page_index, i);
        }
        assert_eq!(state.previous_result.as_ref(), Some(&state.results[2].result));
    }

    #[tokio::test]
    async fn stop_before_start_does_not_leak_into_next_run() {
        let client = Arc::new(EchoClient { calls: AtomicUsize::new(0) });
        let orch = Orchestrator::new(client);
        orch.stop();
        orch.stop();
        let state = orch
            .run(GenerationJob::new(pages(2), DesignBrief::new("pastel")))
            .await
            .unwrap();
        assert_eq!(state.status, RunStatus::Completed);
    }

    #[test]
    fn into_result_maps_failure_to_one_indexed_error() {
        let state = RunState {
            status: RunStatus::Failed {
                page_index: 2,
                message: "HTTP 500".into(),
            },
            ..RunState::running(5)
        };
        match state.into_result() {
            Err(RedesignError::PageFailed { page, detail }) => {
                assert_eq!(page, 3);
                assert_eq!(detail, "HTTP 500");
            }
            other => panic!("unexpected: {other:?}"),
        }

        let stopped = RunState {
            status: RunStatus::Stopped,
            ..RunState::running(5)
        };
        assert!(stopped.into_result().is_ok());
    }

    #[test]
    fn idle_state_is_not_terminal() {
        let s = RunState::default();
        assert_eq!(s.status, RunStatus::Idle);
        assert!(!s.status.is_terminal());
        assert!(RunStatus::Stopped.is_terminal());
    }
}
