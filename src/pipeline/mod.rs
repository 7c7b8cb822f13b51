//! Pipeline stages for redesigning PDF pages.
//!
//! Each submodule implements one step. The orchestrator in
//! [`crate::orchestrator`] strings [`references`] and [`remote`] together per
//! page; [`input`], [`render`] and [`encode`] prepare the pages beforehand.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ references ──▶ remote
//! (URL/path) (pdfium)  (JPEG)     (style refs)    (image model)
//! ```
//!
//! 1. [`input`]: canonicalise the user-supplied path or URL to a local file
//! 2. [`render`]: rasterise selected pages; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`]: JPEG-encode each page into an [`encode::ImageData`]
//! 4. [`references`]: order the style references sent with a page
//! 5. [`remote`]: the image-model call; the only stage with network I/O
//!    during a run

pub mod encode;
pub mod input;
pub mod references;
pub mod remote;
pub mod render;
