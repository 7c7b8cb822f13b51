//! # pdf-redesign
//!
//! Redesign every page of a PDF with a generative image model.
//!
//! Each page is rasterised and sent to the model together with a design
//! prompt and optional style references. Pages are processed strictly in
//! order and every finished page is passed to the next request as a
//! reference, so the deck keeps one visual identity while each page gets a
//! layout suited to its own content.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Render     rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Encode     JPEG ImageData per page
//!  ├─ 4. Generate   one page at a time: prompt + references → image model
//!  └─ 5. Export     files per page, or one zip archive
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_redesign::{redesign_to_dir, DesignBrief, RedesignConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RedesignConfig::builder()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .build()?;
//!     let brief = DesignBrief::new("Modern flat design, navy and coral palette")
//!         .with_page_prompt(0, "Make this a bold title slide");
//!     let saved = redesign_to_dir("deck.pdf", brief, &config, "out", None).await?;
//!     eprintln!("{:?}: {} pages", saved.state.status, saved.state.results.len());
//!     if let Some(e) = saved.export_error {
//!         eprintln!("could not save: {e}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-redesign` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-redesign = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod keystore;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod redesign;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AspectRatio, PageSelection, RedesignConfig, RedesignConfigBuilder};
pub use error::RedesignError;
pub use export::{build_archive, result_file_name, save_result, save_results, write_archive};
pub use keystore::ApiKeyStore;
pub use orchestrator::{
    DesignBrief, GenerationJob, Orchestrator, RunState, RunStatus, RunStream,
};
pub use output::{Document, GeneratedImage, PageImage, PageOutput};
pub use pipeline::encode::ImageData;
pub use pipeline::remote::{GeminiClient, GenerationRequest, RedesignClient};
pub use progress::{NoopProgressCallback, ProgressCallback, RunProgressCallback};
pub use redesign::{
    load_document, preview, redesign_pdf, redesign_pdf_sync, redesign_to_dir, save_run, SavedRun,
};
pub use stream::redesign_stream;
