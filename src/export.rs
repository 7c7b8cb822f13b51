//! Export of generated pages: individual files and a single zip archive.
//!
//! Entries are named by their 1-based position in the result list, so the
//! archive always reads `redesigned-page-1`, `redesigned-page-2`, ... in
//! order even when only a subset of the PDF was selected.

use crate::error::RedesignError;
use crate::output::GeneratedImage;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const FILE_STEM: &str = "redesigned-page";

/// File name for the result at 0-based `index`.
///
/// Images take their extension from the mime type; text fallbacks are saved
/// as `.txt`.
pub fn result_file_name(index: usize, result: &GeneratedImage) -> String {
    let ext = match result {
        GeneratedImage::Image(img) => img.extension(),
        GeneratedImage::Text(_) => "txt",
    };
    format!("{}-{}.{}", FILE_STEM, index + 1, ext)
}

fn result_bytes(result: &GeneratedImage) -> &[u8] {
    match result {
        GeneratedImage::Image(img) => &img.bytes,
        GeneratedImage::Text(text) => text.as_bytes(),
    }
}

/// Write one result into `dir` and return the path written.
pub async fn save_result(
    dir: &Path,
    index: usize,
    result: &GeneratedImage,
) -> Result<PathBuf, RedesignError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| RedesignError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source,
        })?;

    let path = dir.join(result_file_name(index, result));
    tokio::fs::write(&path, result_bytes(result))
        .await
        .map_err(|source| RedesignError::OutputWriteFailed {
            path: path.clone(),
            source,
        })?;

    debug!("Saved {}", path.display());
    Ok(path)
}

/// Write every result into `dir`, in order.
pub async fn save_results(
    dir: &Path,
    results: &[GeneratedImage],
) -> Result<Vec<PathBuf>, RedesignError> {
    let mut written = Vec::with_capacity(results.len());
    for (i, result) in results.iter().enumerate() {
        written.push(save_result(dir, i, result).await?);
    }
    info!("Saved {} page(s) to {}", written.len(), dir.display());
    Ok(written)
}

/// Pack `results` into an in-memory zip archive with one entry per result.
pub fn build_archive(results: &[GeneratedImage]) -> Result<Vec<u8>, RedesignError> {
    let archive_err = |e: zip::result::ZipError| RedesignError::ArchiveFailed(e.to_string());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (i, result) in results.iter().enumerate() {
        zip.start_file(result_file_name(i, result), options)
            .map_err(archive_err)?;
        zip.write_all(result_bytes(result))
            .map_err(|e| RedesignError::ArchiveFailed(e.to_string()))?;
    }

    let cursor = zip.finish().map_err(archive_err)?;
    Ok(cursor.into_inner())
}

/// Build the archive and write it to `path`.
pub async fn write_archive(path: &Path, results: &[GeneratedImage]) -> Result<(), RedesignError> {
    let bytes = build_archive(results)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| RedesignError::OutputWriteFailed {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|source| RedesignError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    info!(
        "Wrote archive with {} entries ({} bytes) to {}",
        results.len(),
        bytes.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::ImageData;
    use std::io::Read;
    use zip::ZipArchive;

    fn png(tag: u8) -> GeneratedImage {
        GeneratedImage::Image(ImageData::new("image/png", vec![0x89, b'P', tag]))
    }

    #[test]
    fn file_names_are_one_indexed() {
        assert_eq!(result_file_name(0, &png(1)), "redesigned-page-1.png");
        assert_eq!(
            result_file_name(4, &GeneratedImage::Image(ImageData::new("image/jpeg", vec![1]))),
            "redesigned-page-5.jpg"
        );
        assert_eq!(
            result_file_name(1, &GeneratedImage::Text("no image".into())),
            "redesigned-page-2.txt"
        );
    }

    #[test]
    fn archive_has_one_entry_per_result() {
        let results = vec![png(1), png(2), png(3)];
        let bytes = build_archive(&results).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 3);
        for i in 0..3 {
            let mut entry = archive.by_index(i).unwrap();
            assert_eq!(entry.name(), format!("redesigned-page-{}.png", i + 1));
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            assert_eq!(content, vec![0x89, b'P', (i + 1) as u8]);
        }
    }

    #[test]
    fn empty_results_give_empty_archive() {
        let bytes = build_archive(&[]).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }

    #[tokio::test]
    async fn save_results_writes_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let results = vec![png(7), GeneratedImage::Text("sorry".into())];

        let written = save_results(&out, &results).await.unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with("redesigned-page-1.png"));
        assert_eq!(std::fs::read(&written[1]).unwrap(), b"sorry");
    }

    #[tokio::test]
    async fn write_archive_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/redesigned.zip");
        write_archive(&path, &[png(1)]).await.unwrap();
        let archive = ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
    }
}
