//! Sample and batch identifier extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Sample id: the letter M followed by 8 digits, optionally with a decimal
/// suffix; labs sometimes typeset a space between the M and the digits.
static SAMPLE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bM\s*\d{8}(?:\.\d+)?\b").unwrap());
static SAMPLE_DESCRIPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Sample\s+description:\s*([^\n\r]*)").unwrap());
static SAMPLE_NO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Sample\s+No:\s*([^\n\r]*)").unwrap());

/// Batch id: either BA + 6 digits or the CSnn-nn-nnnn reference format.
static BATCH_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:BA\d{6}|CS\d{2}-\d{2}-\d{4})\b").unwrap());

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentIds {
    pub sample_id: Option<String>,
    pub batch_id: Option<String>,
}

/// Locate sample and batch identifiers. The sample id is searched in
/// priority order: the "Sample description" field, then "Sample No", then
/// the whole document; the first hit wins.
pub fn find_identifiers(text: &str) -> DocumentIds {
    let mut sample_id = None;

    for field in [&SAMPLE_DESCRIPTION, &SAMPLE_NO] {
        if let Some(caps) = field.captures(text) {
            if let Some(m) = SAMPLE_ID.find(&caps[1]) {
                sample_id = Some(m.as_str().replace(' ', ""));
                debug!(sample_id = ?sample_id, field = &caps[0], "sample id from labeled field");
                break;
            }
        }
    }
    if sample_id.is_none() {
        if let Some(m) = SAMPLE_ID.find(text) {
            sample_id = Some(m.as_str().replace(' ', ""));
            debug!(sample_id = ?sample_id, "sample id from full-document search");
        }
    }

    let batch_id = BATCH_ID.find(text).map(|m| m.as_str().to_string());

    DocumentIds {
        sample_id,
        batch_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_id_from_description_field() {
        let text = "Report\nSample description: Product X, M20251234, batch ref\nSample No: M99999999";
        let ids = find_identifiers(text);
        assert_eq!(ids.sample_id.as_deref(), Some("M20251234"));
    }

    #[test]
    fn sample_id_tolerates_embedded_space() {
        let ids = find_identifiers("Sample description: lecithin M 20251234 retained");
        assert_eq!(ids.sample_id.as_deref(), Some("M20251234"));
    }

    #[test]
    fn sample_id_falls_back_to_whole_document() {
        let ids = find_identifiers("analysis of M20257777.1 follows");
        assert_eq!(ids.sample_id.as_deref(), Some("M20257777.1"));
    }

    #[test]
    fn batch_id_accepts_both_formats() {
        assert_eq!(
            find_identifiers("Batch BA001750 released").batch_id.as_deref(),
            Some("BA001750")
        );
        assert_eq!(
            find_identifiers("reference CS30-00-1195 on file").batch_id.as_deref(),
            Some("CS30-00-1195")
        );
    }

    #[test]
    fn first_batch_pattern_in_document_order_wins() {
        let ids = find_identifiers("ref CS30-00-1195 then BA001750");
        assert_eq!(ids.batch_id.as_deref(), Some("CS30-00-1195"));
    }
}
