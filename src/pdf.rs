//! PDF collaborators: text extraction, per-page table recovery and the
//! embedded-image census used by the OCR gate.
//!
//! Text comes from `pdf-extract` first; when that fails the document is
//! re-read page by page through `lopdf`. Table recovery is a whitespace
//! column heuristic over per-page text, good enough for the ruled layouts
//! the vendor-specific extractor consumes.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{CoaError, CoaResult};

/// Rows of cells; cells may contain embedded newlines.
pub type Table = Vec<Vec<String>>;

#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub number: usize,
    pub text: String,
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, Default)]
pub struct PdfDocument {
    /// Concatenated text of all pages; empty on total extraction failure.
    pub text: String,
    pub pages: Vec<PageContent>,
    /// Number of embedded image XObjects, used to decide whether OCR can
    /// plausibly recover anything.
    pub image_count: usize,
}

pub fn load_document(path: &Path) -> CoaResult<PdfDocument> {
    let data = fs::read(path).map_err(|e| {
        CoaError::invalid_input(format!("cannot read {}: {}", path.display(), e))
    })?;
    Ok(parse_document(&data))
}

fn parse_document(data: &[u8]) -> PdfDocument {
    let mut text = match pdf_extract::extract_text_from_mem(data) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "primary text extraction failed");
            String::new()
        }
    };

    let mut pages = Vec::new();
    let mut image_count = 0;

    match lopdf::Document::load_mem(data) {
        Ok(doc) => {
            for (&number, _) in doc.get_pages().iter() {
                let page_text = doc.extract_text(&[number]).unwrap_or_default();
                let tables = detect_tables(&page_text);
                pages.push(PageContent {
                    number: number as usize,
                    text: page_text,
                    tables,
                });
            }
            image_count = count_images(&doc);
            if text.trim().is_empty() {
                // secondary extraction path
                text = pages
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
            }
        }
        Err(e) => warn!(error = %e, "secondary PDF parse failed"),
    }

    if pages.is_empty() {
        pages.push(PageContent {
            number: 1,
            text: text.clone(),
            tables: detect_tables(&text),
        });
    }

    debug!(
        chars = text.len(),
        pages = pages.len(),
        image_count,
        "document loaded"
    );
    PdfDocument {
        text,
        pages,
        image_count,
    }
}

fn count_images(doc: &lopdf::Document) -> usize {
    doc.objects
        .values()
        .filter(|object| match object {
            lopdf::Object::Stream(stream) => stream
                .dict
                .get(b"Subtype")
                .and_then(|o| o.as_name())
                .map(|name| name == b"Image")
                .unwrap_or(false),
            _ => false,
        })
        .count()
}

static CELL_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}|\t").unwrap());

/// Recover tabular regions from page text: consecutive lines that split into
/// two or more columns on wide whitespace runs form one table.
pub fn detect_tables(page_text: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut current: Table = Vec::new();

    for line in page_text.lines() {
        let cells: Vec<String> = CELL_SPLIT
            .split(line.trim_end())
            .map(|cell| cell.trim().to_string())
            .filter(|cell| !cell.is_empty())
            .collect();
        if cells.len() >= 2 {
            current.push(cells);
        } else if !current.is_empty() {
            if current.len() >= 2 {
                tables.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
        }
    }
    if current.len() >= 2 {
        tables.push(current);
    }
    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_column_aligned_tables() {
        let text = "Certificate of Analysis\n\
                    Analyte      Weight-%   Method\n\
                    PC           14.41      NMR\n\
                    PE           3.20       NMR\n\
                    End of report";
        let tables = detect_tables(text);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].len(), 3);
        assert_eq!(tables[0][1], vec!["PC", "14.41", "NMR"]);
    }

    #[test]
    fn isolated_wide_lines_are_not_tables() {
        let text = "Some heading\nkey:  value\nplain prose follows here\n";
        assert!(detect_tables(text).is_empty());
    }
}
