//! Data produced by the pipeline: rasterised documents and generated pages.

use crate::pipeline::encode::ImageData;
use std::path::PathBuf;

/// One rasterised page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// 0-based page index in the source PDF.
    pub source_page: usize,
    pub image: ImageData,
}

/// The ordered page images of a PDF. Immutable once rendered.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Path the pages were rendered from.
    pub source: PathBuf,
    /// Page count of the whole PDF, including unselected pages.
    pub total_pages: usize,
    /// Selected pages, in document order.
    pub pages: Vec<PageImage>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// The page images in order, ready for a [`crate::orchestrator::GenerationJob`].
    pub fn page_images(&self) -> Vec<ImageData> {
        self.pages.iter().map(|p| p.image.clone()).collect()
    }
}

/// What the model returned for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedImage {
    Image(ImageData),
    /// The model answered with a description instead of an image. Kept as a
    /// degraded result rather than treated as a failure.
    Text(String),
}

impl GeneratedImage {
    pub fn as_image(&self) -> Option<&ImageData> {
        match self {
            GeneratedImage::Image(img) => Some(img),
            GeneratedImage::Text(_) => None,
        }
    }

    pub fn is_fallback_text(&self) -> bool {
        matches!(self, GeneratedImage::Text(_))
    }
}

/// A generated page together with its position in the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutput {
    /// 0-based position in the run.
    pub page_index: usize,
    pub result: GeneratedImage,
    pub duration_ms: u64,
}
