//! Configuration types for a PDF redesign run.
//!
//! Rendering, remote-model, and progress settings all live in
//! [`RedesignConfig`], built via [`RedesignConfigBuilder`]. Per-run inputs
//! (the prompt, per-page overrides, reference images) are not configuration;
//! they travel in [`crate::orchestrator::GenerationJob`].

use crate::error::RedesignError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default Gemini model able to return images.
pub const DEFAULT_MODEL: &str = "gemini-3-pro-image-preview";

/// Default endpoint of the Generative Language API.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Configuration for rasterising a PDF and redesigning its pages.
///
/// # Example
/// ```rust
/// use pdf_redesign::{AspectRatio, RedesignConfig};
///
/// let config = RedesignConfig::builder()
///     .scale(2.0)
///     .aspect_ratio(AspectRatio::Widescreen)
///     .api_key("my-key")
///     .build()
///     .unwrap();
/// assert_eq!(config.aspect_ratio.as_str(), "16:9");
/// ```
#[derive(Clone)]
pub struct RedesignConfig {
    /// Render scale relative to the PDF's 72-DPI page size. Range: 0.5–6.0. Default: 3.0.
    ///
    /// 3.0 (216 DPI) keeps small print legible for the image model.
    pub scale: f32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 4000.
    ///
    /// Caps oversized pages (posters, A0 drawings) regardless of `scale`.
    pub max_rendered_pixels: u32,

    /// JPEG quality of the rasterised page images. Range: 1–100. Default: 80.
    pub jpeg_quality: u8,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Image model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// API key for the Generative Language API.
    pub api_key: Option<String>,

    /// Base URL of the API. Default: [`DEFAULT_API_BASE_URL`].
    pub api_base_url: String,

    /// Output aspect ratio hint sent with every page. Default: original.
    pub aspect_ratio: AspectRatio,

    /// Per-page API timeout in seconds. Default: None (wait indefinitely).
    ///
    /// Image generation routinely takes over a minute per page, so no bound
    /// is applied unless asked for. A timed-out page fails the run.
    pub api_timeout_secs: Option<u64>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives run lifecycle events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RedesignConfig {
    fn default() -> Self {
        Self {
            scale: 3.0,
            max_rendered_pixels: 4000,
            jpeg_quality: 80,
            pages: PageSelection::default(),
            password: None,
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            aspect_ratio: AspectRatio::default(),
            api_timeout_secs: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RedesignConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedesignConfig")
            .field("scale", &self.scale)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("pages", &self.pages)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("aspect_ratio", &self.aspect_ratio)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn RunProgressCallback>"),
            )
            .finish()
    }
}

impl RedesignConfig {
    /// Create a new builder for `RedesignConfig`.
    pub fn builder() -> RedesignConfigBuilder {
        RedesignConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RedesignConfig`].
#[derive(Debug)]
pub struct RedesignConfigBuilder {
    config: RedesignConfig,
}

impl RedesignConfigBuilder {
    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale.clamp(0.5, 6.0);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.config.aspect_ratio = ratio;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RedesignConfig, RedesignError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(RedesignError::InvalidConfig("model must not be empty".into()));
        }
        if !c.api_base_url.starts_with("http://") && !c.api_base_url.starts_with("https://") {
            return Err(RedesignError::InvalidConfig(format!(
                "API base URL must be http(s), got '{}'",
                c.api_base_url
            )));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(RedesignError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Aspect ratio requested for every generated page.
///
/// `Original` sends no hint and lets the model follow the page image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    Original,
    /// 16:9
    Widescreen,
    /// 4:3
    Standard,
    /// 1:1
    Square,
    /// 9:16
    Portrait,
}

impl AspectRatio {
    /// The identifier used in prompts and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Original => "original",
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Standard => "4:3",
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "9:16",
        }
    }

    /// The ratio to request from the model, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            AspectRatio::Original => None,
            other => Some(other.as_str()),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = RedesignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "original" => Ok(AspectRatio::Original),
            "16:9" | "widescreen" => Ok(AspectRatio::Widescreen),
            "4:3" | "standard" => Ok(AspectRatio::Standard),
            "1:1" | "square" => Ok(AspectRatio::Square),
            "9:16" | "portrait" => Ok(AspectRatio::Portrait),
            other => Err(RedesignError::InvalidConfig(format!(
                "unknown aspect ratio '{other}' (expected original, 16:9, 4:3, 1:1, 9:16)"
            ))),
        }
    }
}

/// Specifies which pages of the PDF to rasterise and redesign.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// All pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) if (1..=total_pages).contains(p) => vec![p - 1],
            PageSelection::Single(_) => vec![],
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
