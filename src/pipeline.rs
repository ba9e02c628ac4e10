//! Extraction pipeline: one document in, one flat JSON record out.
//!
//! Sources contribute in fixed precedence order: the vendor table extractor
//! first, the regex pass next, the language model last. A populated value is
//! never overwritten by a lower-priority source; the post-processing passes
//! then enrich the merged record.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::ai::AiClient;
use crate::catalog::ColumnCatalog;
use crate::classify::is_spectral_report;
use crate::error::{CoaError, CoaResult};
use crate::extract::extract_parameters;
use crate::identifiers::find_identifiers;
use crate::ocr;
use crate::pdf::{self, detect_tables, PageContent};
use crate::postprocess;
use crate::spectral::extract_lipid_panel;

/// Minimum extracted-text length; anything shorter triggers the OCR
/// fallback or the insufficient-content failure.
const MIN_TEXT_LEN: usize = 50;

/// Phospholipid-panel keys: trusted from the language model only for
/// vendor-layout documents, where the deterministic table extractor can
/// confirm them.
const PHOSPHOLIPID_KEYS: &[&str] = &["PC", "PE", "PI", "PA", "P", "PL", "LPC", "1-LPC", "2-LPC"];

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionRequest {
    pub pdf_path: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default = "default_phase")]
    pub phase: i64,
}

fn default_phase() -> i64 {
    1
}

/// Process one document end to end.
pub async fn run(request: &ExtractionRequest, ai: Option<&AiClient>) -> CoaResult<Map<String, Value>> {
    let path = Path::new(&request.pdf_path);
    if request.pdf_path.is_empty() || !path.exists() {
        return Err(CoaError::invalid_input("Missing or invalid pdf_path"));
    }

    let document = pdf::load_document(path)?;
    let (text, pages) = ensure_content(path, document.text, document.pages, document.image_count)?;

    let catalog = ColumnCatalog::new(request.columns.clone());
    let ai_data = match ai {
        Some(client) => client.extract(&text, &catalog).await,
        None => {
            debug!("no model credential configured, skipping model pass");
            BTreeMap::new()
        }
    };

    Ok(assemble(
        &text,
        &pages,
        &request.pdf_path,
        &catalog,
        request.phase,
        ai_data,
    ))
}

/// Gate on content length: short text with embedded images gets one OCR
/// attempt; short text without them, or with OCR still short, is the hard
/// insufficient-content failure.
fn ensure_content(
    path: &Path,
    text: String,
    pages: Vec<PageContent>,
    image_count: usize,
) -> CoaResult<(String, Vec<PageContent>)> {
    let text_len = text.trim().len();
    if text_len >= MIN_TEXT_LEN {
        return Ok((text, pages));
    }

    if image_count == 0 {
        return Err(CoaError::InsufficientContent {
            text_len,
            ocr_len: 0,
            image_count,
        });
    }

    warn!(text_len, image_count, "text too short, trying OCR");
    let ocr_text = ocr::extract_text_via_ocr(path);
    let ocr_len = ocr_text.trim().len();
    if ocr_len < MIN_TEXT_LEN {
        return Err(CoaError::InsufficientContent {
            text_len,
            ocr_len,
            image_count,
        });
    }

    info!(ocr_len, "OCR recovered the document text");
    let tables = detect_tables(&ocr_text);
    let pages = vec![PageContent {
        number: 1,
        text: ocr_text.clone(),
        tables,
    }];
    Ok((ocr_text, pages))
}

/// Deterministic tail of the pipeline: merge all source contributions over
/// already-extracted text and page content.
pub fn assemble(
    text: &str,
    pages: &[PageContent],
    path_hint: &str,
    catalog: &ColumnCatalog,
    phase: i64,
    ai_data: BTreeMap<String, String>,
) -> Map<String, Value> {
    let ids = find_identifiers(text);
    let is_spectral = is_spectral_report(text);

    let mut results: BTreeMap<String, String> = BTreeMap::new();
    if let Some(sample_id) = ids.sample_id {
        results.insert("sample_id".to_string(), sample_id);
    }
    if let Some(batch_id) = ids.batch_id {
        results.insert("batch_id".to_string(), batch_id);
    }

    if is_spectral {
        let panel = extract_lipid_panel(pages);
        info!(fields = panel.len(), "vendor lipid panel extracted");
        for (key, value) in panel {
            let target = catalog
                .resolve(&[key.as_str()])
                .map(str::to_string)
                .unwrap_or(key);
            results.insert(target, value);
        }
    }

    let regex_data = extract_parameters(text, catalog, path_hint);
    merge(&mut results, regex_data);

    // the model pass already maps its keys onto the catalog, but callers of
    // this function may hand in arbitrary data; only catalog keys merge
    let ai_data = filter_to_catalog(ai_data, catalog);
    let ai_data = if is_spectral {
        ai_data
    } else {
        filter_phospholipids(ai_data)
    };
    merge(&mut results, ai_data);

    postprocess::apply(&mut results, text, is_spectral);

    let mut record = Map::new();
    for (key, value) in results {
        record.insert(key, Value::String(value));
    }
    record.insert("extraction_phase".to_string(), json!(phase));
    if is_spectral {
        record.insert(
            "document_type".to_string(),
            Value::String("Spectral Service AG".to_string()),
        );
    }
    record
}

/// Lower-priority values only fill keys that are absent or empty.
fn merge(results: &mut BTreeMap<String, String>, incoming: BTreeMap<String, String>) {
    for (key, value) in incoming {
        let occupied = results.get(&key).map(|v| !v.is_empty()).unwrap_or(false);
        if !occupied && !value.is_empty() {
            results.insert(key, value);
        }
    }
}

fn filter_to_catalog(
    data: BTreeMap<String, String>,
    catalog: &ColumnCatalog,
) -> BTreeMap<String, String> {
    data.into_iter()
        .filter_map(|(key, value)| {
            catalog
                .resolve(&[key.as_str()])
                .map(|target| (target.to_string(), value))
        })
        .collect()
}

fn filter_phospholipids(data: BTreeMap<String, String>) -> BTreeMap<String, String> {
    data.into_iter()
        .filter(|(key, _)| !PHOSPHOLIPID_KEYS.iter().any(|p| p.eq_ignore_ascii_case(key)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(columns: &[&str]) -> ColumnCatalog {
        ColumnCatalog::new(columns.iter().map(|c| c.to_string()).collect())
    }

    fn page(text: &str) -> PageContent {
        PageContent {
            number: 1,
            text: text.to_string(),
            tables: detect_tables(text),
        }
    }

    #[test]
    fn regex_pass_feeds_the_record() {
        let text = "Sample description: Lecithin, M20251234\n\
                    Acid value 19,3 mg KOH/g\nBA001750";
        let out = assemble(
            text,
            &[page(text)],
            "report.pdf",
            &catalog(&["AV"]),
            1,
            BTreeMap::new(),
        );
        assert_eq!(out.get("AV"), Some(&json!("19.3")));
        assert_eq!(out.get("sample_id"), Some(&json!("M20251234")));
        assert_eq!(out.get("batch_id"), Some(&json!("BA001750")));
        assert_eq!(out.get("extraction_phase"), Some(&json!(1)));
        assert!(!out.contains_key("document_type"));
    }

    #[test]
    fn spectral_documents_carry_the_type_marker_and_panel() {
        let text = "Spectral Service AG\n\
                    Analyte      Weight-%\n\
                    PC           14.41\n\
                    PE           3.20\n";
        let out = assemble(
            text,
            &[page(text)],
            "report.pdf",
            &catalog(&["PC", "PE"]),
            2,
            BTreeMap::new(),
        );
        assert_eq!(out.get("document_type"), Some(&json!("Spectral Service AG")));
        assert_eq!(out.get("PC"), Some(&json!("14.41")));
        assert_eq!(out.get("extraction_phase"), Some(&json!(2)));
    }

    #[test]
    fn model_data_never_overwrites_deterministic_values() {
        let text = "Acid value 19,3 mg KOH/g with plenty of surrounding text";
        let mut ai_data = BTreeMap::new();
        ai_data.insert("AV".to_string(), "99".to_string());
        ai_data.insert("Moisture".to_string(), "0.7".to_string());
        let out = assemble(
            text,
            &[page(text)],
            "report.pdf",
            &catalog(&["AV", "Moisture"]),
            1,
            ai_data,
        );
        assert_eq!(out.get("AV"), Some(&json!("19.3")));
        assert_eq!(out.get("Moisture"), Some(&json!("0.7")));
    }

    #[test]
    fn model_phospholipids_are_dropped_for_generic_documents() {
        let text = "Generic lab report with no vendor markers anywhere";
        let mut ai_data = BTreeMap::new();
        ai_data.insert("PC".to_string(), "14.41".to_string());
        ai_data.insert("AV".to_string(), "19.3".to_string());
        let out = assemble(
            text,
            &[page(text)],
            "report.pdf",
            &catalog(&["PC", "AV"]),
            1,
            ai_data,
        );
        assert!(!out.contains_key("PC"));
        assert_eq!(out.get("AV"), Some(&json!("19.3")));
    }

    #[test]
    fn model_keys_outside_the_catalog_never_reach_the_record() {
        let text = "Generic lab report with no vendor markers anywhere";
        let mut ai_data = BTreeMap::new();
        ai_data.insert("Colour".to_string(), "10.5".to_string());
        let out = assemble(
            text,
            &[page(text)],
            "report.pdf",
            &catalog(&["AV"]),
            1,
            ai_data,
        );
        assert!(!out.contains_key("Colour"));
    }

    #[test]
    fn cataloged_counts_are_reduced_to_plain_integers() {
        let text = "Microbiology\nTotal plate count 1,9E+04 cfu/g\nmore text";
        let out = assemble(
            text,
            &[page(text)],
            "report.pdf",
            &catalog(&["Total Plate Count"]),
            1,
            BTreeMap::new(),
        );
        assert_eq!(out.get("Total Plate Count"), Some(&json!("19000")));
    }

    #[test]
    fn insufficient_content_without_images_is_terminal() {
        let err = ensure_content(Path::new("/nonexistent.pdf"), "tiny".to_string(), Vec::new(), 0)
            .unwrap_err();
        match err {
            CoaError::InsufficientContent {
                text_len,
                ocr_len,
                image_count,
            } => {
                assert_eq!(text_len, 4);
                assert_eq!(ocr_len, 0);
                assert_eq!(image_count, 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn postprocess_runs_over_the_merged_record() {
        let text = "Routine panel\nSum MOAH 0,8 mg/kg\nTotal Plate Count 1,9E+04 cfu/g";
        let out = assemble(text, &[page(text)], "report.pdf", &catalog(&[]), 1, BTreeMap::new());
        assert_eq!(out.get("MOH (MOSH/MOAH)"), Some(&json!("0.8")));
        assert_eq!(out.get("Total Plate Count"), Some(&json!("19000")));
    }
}
