//! Vendor-specific lipid-panel extraction (Spectral Service AG layout).
//!
//! These reports carry the phospholipid panel (PC/PE/PI/PA/P/PL/LPC) in a
//! table with a "Weight-%" column. A known data-entry defect in the source
//! system sometimes packs every value of the column into a single multi-line
//! cell instead of one value per row; that case is reconciled by matching
//! numeric lines to parameter rows positionally. LPC is never read directly:
//! it is derived from its 1-LPC and 2-LPC positional isomers.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::normalize::normalize;
use crate::pdf::{PageContent, Table};
use crate::value::format_derived;

const PARAM_HEADER_TOKENS: &[&str] = &["analyte", "component", "compound"];

/// Row labels that are table furniture, not parameters.
const LABEL_STOPLIST: &[&str] = &["no.", "nr.", "unit", "method", "date", "page", "remark", "result"];

/// Cells in the packed defect case hold one bare number per line, sometimes
/// with a leading "<".
static NUMERIC_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<?\s*\d+(?:[.,]\d+)?$").unwrap());
static TEXT_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:[.,]\d+)?)\s*%?").unwrap());

// value patterns anchored after the label, so digits inside the label
// ("1-LPC", "LysoPC(18:1)") are never mistaken for the reading
static ONE_LPC_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:1-lpc|lysopc\(16:0\))\D*?(\d+(?:[.,]\d+)?)\s*%?").unwrap()
});
static TWO_LPC_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:2-lpc|lysopc\(18[^)\s]*\)?)\D*?(\d+(?:[.,]\d+)?)\s*%?").unwrap()
});

/// Line patterns for the raw-text fallback, one per directly-reported
/// parameter.
static PARAM_LINES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    ["PC", "PE", "PI", "PA", "P"]
        .iter()
        .map(|param| {
            let re = Regex::new(&format!(r"(?i)\b{}\b.*?(\d+(?:[.,]\d+)?)\s*%?", param)).unwrap();
            (*param, re)
        })
        .collect()
});

/// Extract the lipid panel from a Spectral-layout document. Tables are tried
/// first across all pages; the raw-text fallback runs only on pages whose
/// text confirms the vendor layout. The first page whose extraction yields
/// anything wins; results are never merged across pages.
pub fn extract_lipid_panel(pages: &[PageContent]) -> BTreeMap<String, String> {
    for page in pages {
        for table in &page.tables {
            if table.len() < 2 {
                continue;
            }
            let results = extract_from_table(table);
            if !results.is_empty() {
                debug!(page = page.number, ?results, "lipid panel from table");
                return results;
            }
        }
    }

    for page in pages {
        if page.text.to_lowercase().contains("weight-%") {
            let results = extract_from_text(&page.text);
            if !results.is_empty() {
                debug!(page = page.number, ?results, "lipid panel from text fallback");
                return results;
            }
        }
    }

    BTreeMap::new()
}

fn extract_from_table(table: &Table) -> BTreeMap<String, String> {
    let Some(weight_col) = find_weight_column(table) else {
        return BTreeMap::new();
    };
    let param_col = find_parameter_column(table, weight_col);

    let mut panel = LipidPanel::default();

    let packed_cell = table
        .iter()
        .filter_map(|row| row.get(weight_col))
        .find(|cell| numeric_lines(cell).len() >= 5);

    if let Some(cell) = packed_cell {
        extract_packed(table, weight_col, param_col, cell, &mut panel);
    } else {
        for row in table.iter().skip(1) {
            let label = row.get(param_col.unwrap_or(0)).map(String::as_str).unwrap_or("");
            let value = row.get(weight_col).map(String::as_str).unwrap_or("");
            if label.trim().is_empty() || value.trim().is_empty() {
                continue;
            }
            panel.record(label.trim(), &normalize(value, label.trim()));
        }
    }

    panel.finish()
}

/// Reconcile the packed-cell defect: the ordered parameter rows are matched
/// positionally to the numeric lines of the packed cell. Sum/Total and
/// Phosphorus rows are excluded from the positional match because the Sum
/// row's own cell carries the PL total on its first line and Phosphorus on
/// its second.
fn extract_packed(
    table: &Table,
    weight_col: usize,
    param_col: Option<usize>,
    packed_cell: &str,
    panel: &mut LipidPanel,
) {
    let values = numeric_lines(packed_cell);

    let mut labels: Vec<String> = Vec::new();
    let mut sum_cell: Option<&String> = None;
    for row in table {
        let label = row
            .get(param_col.unwrap_or(0))
            .map(|s| s.trim())
            .unwrap_or("");
        if label.is_empty() {
            continue;
        }
        let lower = label.to_lowercase();
        if is_header_label(&lower) || LABEL_STOPLIST.iter().any(|stop| lower == *stop) {
            continue;
        }
        if lower == "sum" || lower.contains("total") {
            sum_cell = row.get(weight_col);
            continue;
        }
        if lower == "p" || lower == "phosphorus" {
            continue;
        }
        labels.push(label.to_string());
    }

    debug!(labels = labels.len(), values = values.len(), "packed-cell reconciliation");
    for (label, value) in labels.iter().zip(values.iter()) {
        panel.record(label, &normalize(value, label));
    }

    if let Some(cell) = sum_cell {
        let lines = numeric_lines(cell);
        if let Some(first) = lines.first() {
            panel.record("Sum", &normalize(first, "PL"));
        }
        if let Some(second) = lines.get(1) {
            panel.record("P", &normalize(second, "P"));
        }
    }
}

fn extract_from_text(text: &str) -> BTreeMap<String, String> {
    let mut panel = LipidPanel::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        for (param, re) in PARAM_LINES.iter() {
            if let Some(caps) = re.captures(line) {
                panel.record(param, &normalize(&caps[1], param));
            }
        }

        if let Some(caps) = ONE_LPC_VALUE.captures(line) {
            panel.record("1-LPC", &normalize(&caps[1], "1-LPC"));
        }
        if let Some(caps) = TWO_LPC_VALUE.captures(line) {
            panel.record("2-LPC", &normalize(&caps[1], "2-LPC"));
        }
        let lower = line.to_lowercase();
        if (lower.contains("sum") || lower.contains("total")) && lower.contains("weight") {
            if let Some(caps) = TEXT_VALUE.captures(line) {
                panel.record("Sum", &normalize(&caps[1], "PL"));
            }
        }
    }

    panel.finish()
}

/// Accumulates panel values under canonical keys; LPC components are held
/// apart until [`LipidPanel::finish`] derives the single LPC value.
#[derive(Debug, Default)]
struct LipidPanel {
    results: BTreeMap<String, String>,
    one_lpc: Option<f64>,
    two_lpc: Option<f64>,
}

impl LipidPanel {
    fn record(&mut self, label: &str, cleaned: &str) {
        let Ok(parsed) = cleaned.replace(',', ".").parse::<f64>() else {
            return;
        };
        let lower = label.trim().to_lowercase();
        let key = if lower == "pc" || lower.contains("phosphatidylcholine") {
            "PC"
        } else if lower == "pe" || lower.contains("phosphatidylethanolamine") {
            "PE"
        } else if lower == "pi" || lower.contains("phosphatidylinositol") {
            "PI"
        } else if lower == "pa" || lower.contains("phosphatidic acid") {
            "PA"
        } else if lower == "p" || lower == "phosphorus" {
            "P"
        } else if lower.contains("1-lpc") || lower.contains("lysopc(16:0)") {
            self.one_lpc = Some(parsed);
            return;
        } else if lower.contains("2-lpc") || lower.contains("lysopc(18:") {
            self.two_lpc = Some(parsed);
            return;
        } else if lower == "sum" || lower.contains("total") {
            "PL"
        } else {
            return;
        };
        self.results.insert(key.to_string(), cleaned.to_string());
    }

    fn finish(mut self) -> BTreeMap<String, String> {
        let lpc = match (self.one_lpc, self.two_lpc) {
            (Some(a), Some(b)) => Some(a + b),
            (Some(a), None) | (None, Some(a)) => Some(a),
            (None, None) => None,
        };
        if let Some(lpc) = lpc {
            self.results.insert("LPC".to_string(), format_derived(lpc, 2));
        }
        self.results
    }
}

fn find_weight_column(table: &Table) -> Option<usize> {
    // the header is not always the first row, so scan everything
    for row in table {
        for (idx, cell) in row.iter().enumerate() {
            let lower = cell.to_lowercase();
            if lower.contains("weight-") && lower.contains('%') {
                return Some(idx);
            }
        }
    }
    None
}

fn find_parameter_column(table: &Table, weight_col: usize) -> Option<usize> {
    for row in table {
        for (idx, cell) in row.iter().enumerate() {
            if idx == weight_col {
                continue;
            }
            let lower = cell.to_lowercase();
            if PARAM_HEADER_TOKENS.iter().any(|token| lower.contains(token)) {
                return Some(idx);
            }
        }
    }
    None
}

fn is_header_label(lower: &str) -> bool {
    lower.contains("weight-")
        || lower == "parameter"
        || PARAM_HEADER_TOKENS.iter().any(|token| lower.contains(token))
}

fn numeric_lines(cell: &str) -> Vec<String> {
    cell.lines()
        .map(str::trim)
        .filter(|line| NUMERIC_LINE.is_match(line))
        .map(|line| line.to_string())
        .collect()
}
