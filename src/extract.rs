//! Deterministic parameter extraction (regex pass).
//!
//! Generic driver over the rule table in [`crate::rules`]: for each
//! parameter the ordered patterns are tried until one yields a plausible
//! candidate, the candidate is cleaned by the value normalizer and the
//! result is emitted under the caller's catalog name. Parameters absent from
//! the catalog are dropped, except that metal values always feed the derived
//! Heavy Metals sum.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::catalog::ColumnCatalog;
use crate::normalize::{normalize_value, repair_spaced_characters};
use crate::rules::{CaptureMode, HEAVY_METAL_COMPONENTS, RULES};
use crate::value::{format_derived, CanonicalValue, Qualifier};

/// Compiled pattern lists, one inner vec per rule, in table order.
static COMPILED_RULES: Lazy<Vec<Vec<Regex>>> = Lazy::new(|| {
    RULES
        .iter()
        .map(|rule| {
            rule.patterns
                .iter()
                .map(|p| Regex::new(p.pattern).expect("invalid parameter pattern"))
                .collect()
        })
        .collect()
});

static NEGATIVE_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:not\s*detected|negative|absent|nd)\b").unwrap());
static UNCERTAINTY_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*±.*$").unwrap());
static VALUED_CANDIDATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d|not\s+detected|less\s+than").unwrap());
static RESULT_UNIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:meq|mg|µg|ug)\s*(?:O2)?\s*/\s*k?g").unwrap());

/// Run the regex pass over the full document text. `path_hint` is the source
/// file path, consulted only by the retest-document heuristic.
pub fn extract_parameters(
    text: &str,
    catalog: &ColumnCatalog,
    path_hint: &str,
) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let mut metals: HashMap<&'static str, f64> = HashMap::new();
    let is_retest_document =
        path_hint.to_lowercase().contains("retest") || path_hint.contains("TI");

    for (rule, patterns) in RULES.iter().zip(COMPILED_RULES.iter()) {
        let mut resolved: Option<String> = None;

        for (pattern_rule, re) in rule.patterns.iter().zip(patterns.iter()) {
            if pattern_rule.mode == CaptureMode::RetestPercent && !is_retest_document {
                continue;
            }

            let candidate = if rule.prefer_valued_occurrence {
                select_valued_occurrence(re, text)
            } else {
                re.captures(text)
                    .map(|caps| caps[1].trim().to_string())
            };
            let Some(candidate) = candidate else { continue };
            if candidate.is_empty() {
                continue;
            }
            let lower = candidate.to_lowercase();
            if rule.reject.iter().any(|word| lower.contains(word)) {
                debug!(parameter = rule.name, candidate, "candidate rejected as method text");
                continue;
            }

            let value = match pattern_rule.mode {
                CaptureMode::Scalar | CaptureMode::RetestPercent => {
                    plausible(normalize_value(&candidate, rule.name))
                }
                CaptureMode::AppendPercent => {
                    plausible(normalize_value(&format!("{} %", candidate), rule.name))
                }
                CaptureMode::NegativeKeyword => {
                    if is_negative_phrase(&candidate) {
                        Some(Qualifier::Negative.as_str().to_string())
                    } else {
                        plausible(normalize_value(&candidate, rule.name))
                    }
                }
                CaptureMode::NegativeOnly => {
                    is_negative_phrase(&candidate)
                        .then(|| Qualifier::Negative.as_str().to_string())
                }
                CaptureMode::StripUncertainty => {
                    let stripped = UNCERTAINTY_SUFFIX.replace(&candidate, "");
                    plausible(normalize_value(stripped.trim(), rule.name))
                }
            };

            if let Some(value) = value {
                resolved = Some(value);
                break;
            }
        }

        let Some(value) = resolved else { continue };

        if let Some(metal) = rule.metal {
            if let Ok(parsed) = value.parse::<f64>() {
                metals.insert(metal, parsed);
            }
        }

        match catalog.resolve(rule.synonyms) {
            Some(key) => {
                debug!(parameter = rule.name, key, value, "parameter extracted");
                out.insert(key.to_string(), value);
            }
            None => debug!(parameter = rule.name, "parameter not in catalog, dropped"),
        }
    }

    derive_heavy_metals(&metals, catalog, &mut out);
    out
}

/// Sum Arsenic + Cadmium + Lead + Mercury (never Iron) into the catalog's
/// "Heavy Metals" key when at least one component was found.
fn derive_heavy_metals(
    metals: &HashMap<&'static str, f64>,
    catalog: &ColumnCatalog,
    out: &mut BTreeMap<String, String>,
) {
    let Some(key) = catalog.resolve(&["Heavy Metals"]) else { return };
    let components: Vec<(&str, f64)> = HEAVY_METAL_COMPONENTS
        .iter()
        .filter_map(|metal| metals.get(metal).map(|v| (*metal, *v)))
        .collect();
    if components.is_empty() {
        return;
    }
    let sum: f64 = components.iter().map(|(_, v)| v).sum();
    debug!(?components, sum, "heavy metals derived");
    out.insert(key.to_string(), format_derived(sum, 4));
}

/// The label can occur several times (result row plus accreditation
/// footnote). Prefer the occurrence carrying a result unit, then the last
/// one carrying any value-like content, then the last occurrence.
fn select_valued_occurrence(re: &Regex, text: &str) -> Option<String> {
    let candidates: Vec<String> = re
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .collect();
    if candidates.is_empty() {
        return None;
    }
    candidates
        .iter()
        .find(|c| RESULT_UNIT.is_match(c))
        .or_else(|| candidates.iter().rev().find(|c| VALUED_CANDIDATE.is_match(c)))
        .cloned()
        .or_else(|| candidates.last().cloned())
}

fn is_negative_phrase(candidate: &str) -> bool {
    NEGATIVE_PHRASE.is_match(&repair_spaced_characters(candidate))
}

fn plausible(value: CanonicalValue) -> Option<String> {
    value.is_plausible().then(|| value.into_string())
}
