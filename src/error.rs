//! Error types for the pdf-redesign library.
//!
//! Everything fatal is a [`RedesignError`]. Two outcomes are deliberately
//! *not* errors:
//!
//! * **Cancellation**: a stopped run ends in
//!   [`crate::orchestrator::RunStatus::Stopped`] and is never logged or
//!   reported as a failure.
//! * **Page failure during a run**: recorded as
//!   [`crate::orchestrator::RunStatus::Failed`] inside the returned
//!   [`crate::orchestrator::RunState`] so that the pages produced before the
//!   failure stay available. Call
//!   [`crate::orchestrator::RunState::into_result`] to turn it into
//!   [`RedesignError::PageFailed`].

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf-redesign library.
#[derive(Debug, Error)]
pub enum RedesignError {
    // ── Validation errors (no network call is attempted) ──────────────────
    /// The document has no pages (nothing was selected or rasterised).
    #[error("No document pages to redesign.\nSelect a PDF with at least one page.")]
    MissingDocument,

    /// The global design instruction is empty.
    #[error("A design prompt is required.\nDescribe the redesign with --prompt \"...\".")]
    EmptyPrompt,

    /// No API key was supplied through flag, environment, or key store.
    #[error("GEMINI_API_KEY is not set.\nPass --api-key, export GEMINI_API_KEY, or save one with --set-api-key.")]
    MissingApiKey,

    /// The request handed to the remote client is incomplete.
    #[error("Invalid redesign request for page {page}: {reason}")]
    InvalidRequest { page: usize, reason: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// A reference image could not be read or its format is unsupported.
    #[error("Unsupported reference image '{path}': {detail}")]
    UnsupportedImage { path: PathBuf, detail: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install pdfium system-wide or point PDFIUM_LIB_PATH at the directory\n\
containing libpdfium (pdfium.dll on Windows).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Remote errors ─────────────────────────────────────────────────────
    /// The image-generation API answered with a non-success status.
    #[error("Image API error (HTTP {status}): {message}")]
    RemoteApi { status: u16, message: String },

    /// The request never produced a response (connection, TLS, decoding).
    #[error("Image API request failed: {0}")]
    RemoteTransport(String),

    /// The API call exceeded the configured per-page timeout.
    #[error("Image API call timed out after {secs}s")]
    RemoteTimeout { secs: u64 },

    /// The API answered but returned neither an image nor any text.
    #[error("Image API returned no content")]
    EmptyResponse,

    /// A run stopped because one page could not be generated.
    ///
    /// `page` is 1-indexed, matching what the user sees.
    #[error("Failed to generate design for page {page}: {detail}")]
    PageFailed { page: usize, detail: String },

    /// `start`/`run` was called while the orchestrator already had a run
    /// in progress.
    #[error("A redesign run is already in progress.\nStop it and wait for it to finish first.")]
    RunInProgress,

    // ── Export errors ─────────────────────────────────────────────────────
    /// Building the zip archive of results failed.
    #[error("Failed to create zip archive: {0}")]
    ArchiveFailed(String),

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The API-key file could not be read or written.
    #[error("API key store '{path}' is not accessible: {source}")]
    KeyStore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RedesignError {
    /// True for the errors raised before any network call because the
    /// caller's input is incomplete.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RedesignError::MissingDocument
                | RedesignError::EmptyPrompt
                | RedesignError::MissingApiKey
                | RedesignError::InvalidRequest { .. }
        )
    }
}
