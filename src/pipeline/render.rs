//! PDF rasterisation: render selected pages to JPEG page images via pdfium.
//!
//! pdfium is a blocking C library, so all work happens inside
//! `tokio::task::spawn_blocking`. Pages are scaled by
//! [`RedesignConfig::scale`] and capped at `max_rendered_pixels` on either
//! edge so poster-sized pages cannot exhaust memory.

use crate::config::RedesignConfig;
use crate::error::RedesignError;
use crate::output::{Document, PageImage};
use crate::pipeline::encode;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming a pdfium library file or the directory holding it.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Rasterise the pages selected by `config.pages`.
pub async fn render_document(
    pdf_path: &Path,
    config: &RedesignConfig,
) -> Result<Document, RedesignError> {
    let path = pdf_path.to_path_buf();
    let settings = RenderSettings {
        scale: config.scale,
        max_pixels: config.max_rendered_pixels,
        quality: config.jpeg_quality,
        password: config.password.clone(),
        selection: config.pages.clone(),
    };

    tokio::task::spawn_blocking(move || render_blocking(&path, &settings))
        .await
        .map_err(|e| RedesignError::Internal(format!("Render task panicked: {}", e)))?
}

struct RenderSettings {
    scale: f32,
    max_pixels: u32,
    quality: u8,
    password: Option<String>,
    selection: crate::config::PageSelection,
}

/// Bind pdfium from `PDFIUM_LIB_PATH`, the working directory, or the system.
fn bind_pdfium() -> Result<Pdfium, RedesignError> {
    let bindings = match std::env::var(PDFIUM_LIB_PATH_ENV) {
        Ok(p) if !p.is_empty() => {
            let p = PathBuf::from(p);
            let lib = if p.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&p)
            } else {
                p
            };
            Pdfium::bind_to_library(lib)
        }
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| RedesignError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn open_error(pdf_path: &Path, password: Option<&str>, e: PdfiumError) -> RedesignError {
    let detail = format!("{:?}", e);
    if detail.to_lowercase().contains("password") {
        let path = pdf_path.to_path_buf();
        return match password {
            Some(_) => RedesignError::WrongPassword { path },
            None => RedesignError::PasswordRequired { path },
        };
    }
    RedesignError::CorruptPdf {
        path: pdf_path.to_path_buf(),
        detail,
    }
}

fn render_blocking(pdf_path: &Path, settings: &RenderSettings) -> Result<Document, RedesignError> {
    let pdfium = bind_pdfium()?;
    let password = settings.password.as_deref();

    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| open_error(pdf_path, password, e))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    let indices = settings.selection.to_indices(total_pages);
    info!("PDF loaded: {} pages, {} selected", total_pages, indices.len());

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(settings.scale)
        .set_maximum_width(settings.max_pixels as i32)
        .set_maximum_height(settings.max_pixels as i32);

    let mut rendered = Vec::with_capacity(indices.len());
    for idx in indices {
        let failed = |detail: String| RedesignError::RasterisationFailed {
            page: idx + 1,
            detail,
        };

        let page = pages.get(idx as u16).map_err(|e| failed(format!("{:?}", e)))?;
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| failed(format!("{:?}", e)))?;
        let image = bitmap.as_image();
        let encoded = encode::encode_page(&image, settings.quality)
            .map_err(|e| failed(format!("JPEG encoding failed: {}", e)))?;

        debug!(
            "Rendered page {} → {}x{} px, {} bytes",
            idx + 1,
            image.width(),
            image.height(),
            encoded.bytes.len()
        );

        rendered.push(PageImage {
            source_page: idx,
            image: encoded,
        });
    }

    Ok(Document {
        source: pdf_path.to_path_buf(),
        total_pages,
        pages: rendered,
    })
}
