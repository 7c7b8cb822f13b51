//! Streaming API: watch a run page by page and stop it mid-way.
//!
//! [`crate::redesign::redesign_pdf`] only returns once the run is over. For
//! progress displays, or to offer a "stop" action, use [`redesign_stream`]:
//! it hands back the [`Orchestrator`] driving the run together with the
//! stream of [`RunState`](crate::orchestrator::RunState) snapshots.
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use pdf_redesign::{redesign_stream, DesignBrief, RedesignConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RedesignConfig::builder().api_key("...").build()?;
//! let (orchestrator, mut states) =
//!     redesign_stream("deck.pdf", DesignBrief::new("Flat pastel style"), &config).await?;
//!
//! while let Some(state) = states.next().await {
//!     let (done, total) = state.progress();
//!     println!("{done}/{total}");
//!     if done == 2 {
//!         orchestrator.stop();
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::RedesignConfig;
use crate::error::RedesignError;
use crate::orchestrator::{DesignBrief, GenerationJob, Orchestrator, RunStream};
use crate::redesign::{load_document, orchestrator_from_config};
use std::sync::Arc;
use tracing::info;

/// Load `input` and start redesigning it in the background.
///
/// The stream ends after the terminal snapshot (`Completed`, `Stopped` or
/// `Failed`). Must be called inside a Tokio runtime.
pub async fn redesign_stream(
    input_str: impl AsRef<str>,
    brief: DesignBrief,
    config: &RedesignConfig,
) -> Result<(Arc<Orchestrator>, RunStream), RedesignError> {
    let input_str = input_str.as_ref();
    info!("Starting streaming redesign: {}", input_str);

    if brief.prompt.trim().is_empty() {
        return Err(RedesignError::EmptyPrompt);
    }
    let orchestrator = Arc::new(orchestrator_from_config(config)?);

    let document = load_document(input_str, config).await?;
    let job = GenerationJob::new(document.page_images(), brief).with_aspect_ratio(config.aspect_ratio);

    let states = orchestrator.start(job)?;
    Ok((orchestrator, states))
}
