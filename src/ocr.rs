//! OCR fallback for scanned documents.
//!
//! Pages are rasterized with `pdftoppm` at 300 dpi, enhanced (contrast and
//! sharpness) to help Tesseract with low-quality scans, then OCRed with
//! several page-segmentation modes. The longest output per page wins; mode
//! failures are not fatal. Requires `pdftoppm` and `tesseract` on PATH;
//! when either is missing the fallback simply yields nothing.

use std::fs;
use std::path::Path;
use std::process::Command;

use tracing::{debug, warn};

/// Page-segmentation modes tried per page, roughly ordered from structured
/// to sparse layouts.
const PSM_MODES: &[&str] = &["3", "4", "6", "11"];

const RASTER_DPI: &str = "300";

/// OCR every page of the PDF at `path` and return the concatenated text.
/// Empty string on any setup failure.
pub fn extract_text_via_ocr(path: &Path) -> String {
    let temp_dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            warn!(error = %e, "cannot create OCR scratch directory");
            return String::new();
        }
    };

    let prefix = temp_dir.path().join("page");
    let rasterize = Command::new("pdftoppm")
        .arg("-r")
        .arg(RASTER_DPI)
        .arg("-png")
        .arg(path.as_os_str())
        .arg(prefix.as_os_str())
        .output();
    match rasterize {
        Ok(output) if output.status.success() => {}
        Ok(output) => {
            warn!(
                status = output.status.code().unwrap_or(-1),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "pdftoppm failed"
            );
            return String::new();
        }
        Err(e) => {
            warn!(error = %e, "pdftoppm not available");
            return String::new();
        }
    }

    let mut page_images: Vec<_> = match fs::read_dir(temp_dir.path()) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.extension().map(|ext| ext == "png").unwrap_or(false))
            .collect(),
        Err(e) => {
            warn!(error = %e, "cannot list rasterized pages");
            return String::new();
        }
    };
    page_images.sort();

    let mut pages = Vec::with_capacity(page_images.len());
    for image_path in &page_images {
        enhance_image(image_path);
        let text = ocr_page(image_path);
        debug!(page = %image_path.display(), chars = text.len(), "page OCRed");
        if !text.trim().is_empty() {
            pages.push(text);
        }
    }
    pages.join("\n")
}

/// Boost contrast and sharpness in place. Enhancement failures leave the
/// original raster for Tesseract to try as-is.
fn enhance_image(path: &Path) {
    let img = match image::open(path) {
        Ok(img) => img,
        Err(e) => {
            warn!(error = %e, "cannot open rasterized page");
            return;
        }
    };
    let enhanced = img.adjust_contrast(30.0).unsharpen(1.5, 2);
    if let Err(e) = enhanced.save(path) {
        warn!(error = %e, "cannot save enhanced page");
    }
}

/// Run tesseract with each segmentation mode and keep the longest output.
fn ocr_page(image_path: &Path) -> String {
    let mut best = String::new();
    for psm in PSM_MODES {
        let output = Command::new("tesseract")
            .arg(image_path.as_os_str())
            .arg("stdout")
            .arg("--psm")
            .arg(psm)
            .output();
        let text = match output {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).to_string()
            }
            Ok(output) => {
                debug!(
                    psm,
                    status = output.status.code().unwrap_or(-1),
                    "tesseract mode failed"
                );
                continue;
            }
            Err(e) => {
                warn!(error = %e, "tesseract not available");
                return best;
            }
        };
        if text.len() > best.len() {
            best = text;
        }
    }
    best
}
