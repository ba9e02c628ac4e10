//! Enrichment passes applied after the table, regex and AI results are
//! merged. Each pass writes at most one key and is skipped when that key is
//! already populated, except the microbiology pass which also re-normalizes
//! values the earlier passes recorded.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static PESTICIDE_ALL_CLEAR: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?is)pesticide[^\n]{0,120}?(?:nothing|none)\s+detected",
        r"(?is)(?:nothing|none)\s+detected[^\n]{0,120}?pesticide",
        r"(?is)no\s+pesticides?\s+(?:residues?\s+)?detected",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static PESTICIDE_MENTIONS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?im)pesticides?\s*(?:residues?)?\s*([^\n\r]*)",
        r"(?im)organochlorines?\s*([^\n\r]*)",
        r"(?im)organophosphates?\s*([^\n\r]*)",
        r"(?im)chlorpyrifos\s*([^\n\r]*)",
        r"(?im)dimethoate\s*([^\n\r]*)",
        r"(?im)malathion\s*([^\n\r]*)",
        r"(?im)atrazine\s*([^\n\r]*)",
        r"(?im)glyphosate\s*([^\n\r]*)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static MOAH_SUM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)sum\s*MOAH[^0-9<\n]*(<?\s*\d+(?:[.,]\d+)?)\s*(?:mg\s*/\s*kg|ppm)").unwrap()
});

static SOY_CONTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)soy\s+(?:protein\s+content|allergen)[^0-9<\n]*(\d+(?:[.,]\d+)?)\s*(?:mg\s*/\s*kg|ppm|%)")
        .unwrap()
});

// not-detected alternatives come first so "not detected" never matches as
// a bare "detected"
static CRONOBACTER_STATUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)cronobacter[^\n]{0,160}?\b(not\s+detected|absent|negative|detected|positive)\b")
        .unwrap()
});

static MICRO_FIELDS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("Enterobacteriaceae", r"(?i)enterobacteriaceae"),
        ("Coliforms (in 1g)", r"(?i)coliforms?"),
        ("E. coli", r"(?i)\bE\.?\s*coli\b"),
        ("Total Plate Count", r"(?i)total\s+plate\s+count|aerobic\s+plate\s+count"),
        ("Total Viable count", r"(?i)total\s+viable\s+count"),
    ]
    .iter()
    .map(|(field, pattern)| (*field, Regex::new(pattern).unwrap()))
    .collect()
});

static MICRO_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(<?\s*\d[\d.,]*(?:\s*E\s*[+-]?\d+)?)\s*(?:cfu|kbe)\s*/\s*g").unwrap()
});

const ACCREDITATION_VOCABULARY: &[&str] = &["accredit", "iso ", "din en"];

static BATCH_BACKFILL: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)batch\s*#\s*(CS\d{2}-\d{2}-\d{4}|BA\d{6})",
        r"(?is)Disponent\s+Number.*?Reference\s*:?\s*batch\s*#?\s*([A-Z]{2}[\w-]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// (output key, label-specific pattern chain); the combined TEQ label is
/// matched by requiring "+DL" after PCDD/F, so the plain chain cannot fire
/// inside it.
static DIOXIN_CHAINS: Lazy<Vec<(&'static str, Vec<Regex>)>> = Lazy::new(|| {
    vec![
        (
            "WHO-PCDD/F-TEQ",
            vec![
                Regex::new(r"(?i)WHO[-\s]?PCDD/?F[-\s]?TEQ[^0-9<\n]*(<?\s*\d+(?:[.,]\d+)?)").unwrap(),
                Regex::new(r"(?i)PCDD/?F[-\s]?TEQ[^0-9<\n]*(<?\s*\d+(?:[.,]\d+)?)").unwrap(),
            ],
        ),
        (
            "WHO-PCDD/F + DL-PCB-TEQ",
            vec![
                Regex::new(r"(?i)WHO[-\s]?PCDD/?F\s*\+\s*DL[-\s]?PCBs?[-\s]?TEQ[^0-9<\n]*(<?\s*\d+(?:[.,]\d+)?)")
                    .unwrap(),
                Regex::new(r"(?i)PCDD/?F\s*\+\s*DL[-\s]?PCBs?[^0-9<\n]*(<?\s*\d+(?:[.,]\d+)?)").unwrap(),
            ],
        ),
        (
            "Sum PCB (28, 52, 101, 138, 153, 180)",
            vec![
                Regex::new(r"(?i)PCB\s*\(?28[,\s]+52[,\s]+101[,\s]+138[,\s]+153[,\s]+180\)?[^0-9<\n]*(<?\s*\d+(?:[.,]\d+)?)")
                    .unwrap(),
                Regex::new(r"(?i)sum\s+(?:of\s+)?(?:ndl[-\s]?)?PCBs?[^0-9<\n]*(<?\s*\d+(?:[.,]\d+)?)").unwrap(),
            ],
        ),
    ]
});

/// Run every enrichment pass over the merged result. Spectral lipid-panel
/// reports skip the pesticide pass: they never carry pesticide panels and
/// their footnotes trip the compound mentions.
pub fn apply(results: &mut BTreeMap<String, String>, raw_text: &str, is_spectral: bool) {
    if !is_spectral {
        pesticide_pass(results, raw_text);
    }
    moah_pass(results, raw_text);
    soy_pass(results, raw_text);
    cronobacter_pass(results, raw_text);
    microbiology_pass(results, raw_text);
    batch_backfill_pass(results, raw_text);
    dioxin_pass(results, raw_text);
}

fn pesticide_pass(results: &mut BTreeMap<String, String>, raw_text: &str) {
    // older records carry the key in lowercase; both mean already processed
    if is_populated(results, "Pesticides") || is_populated(results, "pesticides") {
        return;
    }

    if PESTICIDE_ALL_CLEAR.iter().any(|re| re.is_match(raw_text)) {
        results.insert("Pesticides".to_string(), "Negative".to_string());
        return;
    }

    let mut detected = 0usize;
    let mut not_detected = 0usize;
    for re in PESTICIDE_MENTIONS.iter() {
        for caps in re.captures_iter(raw_text) {
            let rest = caps[1].trim().to_lowercase();
            if rest.contains("not detected") || rest.contains("negative") || rest.contains('<') {
                not_detected += 1;
            } else if rest.contains("detected")
                || rest.contains("positive")
                || rest.chars().any(|c| c.is_ascii_digit())
            {
                detected += 1;
            }
        }
    }

    debug!(detected, not_detected, "pesticide classification");
    if detected > 0 {
        results.insert("Pesticides".to_string(), "review".to_string());
    } else if not_detected > 0 {
        results.insert("Pesticides".to_string(), "Negative".to_string());
    }
}

fn moah_pass(results: &mut BTreeMap<String, String>, raw_text: &str) {
    if is_populated(results, "MOH (MOSH/MOAH)") {
        return;
    }
    let Some(caps) = MOAH_SUM.captures(raw_text) else {
        return;
    };
    let raw = caps[1].trim().to_string();
    let Some((value, _)) = parse_bounded_number(&raw) else {
        return;
    };
    let recorded = if value < 2.0 {
        raw.replace(' ', "").replace(',', ".")
    } else {
        "review".to_string()
    };
    results.insert("MOH (MOSH/MOAH)".to_string(), recorded);
}

fn soy_pass(results: &mut BTreeMap<String, String>, raw_text: &str) {
    if is_populated(results, "Soy Allergen") {
        return;
    }
    let Some(caps) = SOY_CONTENT.captures(raw_text) else {
        return;
    };
    let Ok(value) = caps[1].replace(',', ".").parse::<f64>() else {
        return;
    };
    let recorded = if value < 2.5 { "Negative" } else { "review" };
    results.insert("Soy Allergen".to_string(), recorded.to_string());
}

fn cronobacter_pass(results: &mut BTreeMap<String, String>, raw_text: &str) {
    if is_populated(results, "Cronobacter spp.") {
        return;
    }
    let Some(caps) = CRONOBACTER_STATUS.captures(raw_text) else {
        return;
    };
    let status = caps[1].to_lowercase();
    let recorded = if status.contains("detected") && !status.contains("not") || status == "positive" {
        "Review"
    } else {
        "Negative"
    };
    results.insert("Cronobacter spp.".to_string(), recorded.to_string());
}

/// Re-scan microbiology counts with unit-qualified patterns, parsing
/// scientific notation ("1,9E+04") and collapsing trace counts to
/// "Negative". Values already recorded by earlier passes are re-normalized
/// under the same rule.
fn microbiology_pass(results: &mut BTreeMap<String, String>, raw_text: &str) {
    for (field, label) in MICRO_FIELDS.iter() {
        if !is_populated(results, field) {
            for line in raw_text.lines() {
                if !label.is_match(line) || is_accreditation_line(line) {
                    continue;
                }
                let Some(caps) = MICRO_VALUE.captures(line) else {
                    continue;
                };
                if let Some(interpreted) = interpret_count(&caps[1]) {
                    results.insert(field.to_string(), interpreted);
                    break;
                }
            }
        } else {
            let reinterpreted = results.get(*field).and_then(|value| interpret_stored_count(value));
            if let Some(interpreted) = reinterpreted {
                results.insert(field.to_string(), interpreted);
            }
        }
    }
}

fn batch_backfill_pass(results: &mut BTreeMap<String, String>, raw_text: &str) {
    if is_populated(results, "batch_id") {
        return;
    }
    for re in BATCH_BACKFILL.iter() {
        if let Some(caps) = re.captures(raw_text) {
            debug!(batch_id = &caps[1], "batch id backfilled");
            results.insert("batch_id".to_string(), caps[1].to_string());
            return;
        }
    }
}

fn dioxin_pass(results: &mut BTreeMap<String, String>, raw_text: &str) {
    for (key, chain) in DIOXIN_CHAINS.iter() {
        if is_populated(results, key) {
            continue;
        }
        for re in chain {
            let Some(caps) = re.captures(raw_text) else {
                continue;
            };
            let raw = caps[1].trim().to_string();
            if parse_bounded_number(&raw).is_some() {
                results.insert(key.to_string(), raw);
                break;
            }
        }
    }
}

fn is_populated(results: &BTreeMap<String, String>, key: &str) -> bool {
    results.get(key).map(|v| !v.is_empty()).unwrap_or(false)
}

fn is_accreditation_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    ACCREDITATION_VOCABULARY.iter().any(|word| lower.contains(word))
}

/// Parse a possibly "<"-prefixed number, comma decimals accepted. Returns
/// the numeric value and whether the bound marker was present.
fn parse_bounded_number(raw: &str) -> Option<(f64, bool)> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let (body, bounded) = match compact.strip_prefix('<') {
        Some(rest) => (rest, true),
        None => (compact.as_str(), false),
    };
    body.replace(',', ".").parse::<f64>().ok().map(|v| (v, bounded))
}

/// Values recorded by the earlier passes may still carry their unit
/// ("1,9E+04 cfu/g" survives the sci-notation pass-through verbatim); pull
/// the numeric token out before interpreting.
fn interpret_stored_count(raw: &str) -> Option<String> {
    let token = MICRO_VALUE
        .captures(raw)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| raw.to_string());
    interpret_count(&token)
}

/// Microbiology count interpretation: below-bound or trace counts collapse
/// to "Negative", everything else is truncated to an integer string.
fn interpret_count(raw: &str) -> Option<String> {
    let (value, bounded) = parse_bounded_number(raw)?;
    if bounded || value < 10.0 {
        Some("Negative".to_string())
    } else {
        Some(format!("{}", value.trunc() as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> BTreeMap<String, String> {
        let mut results = BTreeMap::new();
        apply(&mut results, text, false);
        results
    }

    #[test]
    fn comprehensive_negative_short_circuits_pesticides() {
        let out = run("Pesticide screening (GC-MS): nothing detected above LOQ");
        assert_eq!(out.get("Pesticides").map(String::as_str), Some("Negative"));
    }

    #[test]
    fn detected_compound_forces_review() {
        let out = run("chlorpyrifos 0.12 mg/kg\nmalathion <0.01 mg/kg\n");
        assert_eq!(out.get("Pesticides").map(String::as_str), Some("review"));
    }

    #[test]
    fn bounded_results_alone_are_negative() {
        let out = run("chlorpyrifos <0.01 mg/kg\ndimethoate not detected\n");
        assert_eq!(out.get("Pesticides").map(String::as_str), Some("Negative"));
    }

    #[test]
    fn pesticide_pass_is_suppressed_for_spectral_reports() {
        let mut results = BTreeMap::new();
        apply(&mut results, "chlorpyrifos 0.12 mg/kg", true);
        assert!(!results.contains_key("Pesticides"));
    }

    #[test]
    fn moah_below_threshold_records_value() {
        let out = run("Sum MOAH  0,8 mg/kg");
        assert_eq!(out.get("MOH (MOSH/MOAH)").map(String::as_str), Some("0.8"));
        let out = run("Sum MOAH  3.1 mg/kg");
        assert_eq!(out.get("MOH (MOSH/MOAH)").map(String::as_str), Some("review"));
    }

    #[test]
    fn soy_threshold() {
        let out = run("Soy protein content 1.0 mg/kg");
        assert_eq!(out.get("Soy Allergen").map(String::as_str), Some("Negative"));
        let out = run("Soy allergen 4,2 mg/kg");
        assert_eq!(out.get("Soy Allergen").map(String::as_str), Some("review"));
    }

    #[test]
    fn cronobacter_status_words() {
        let out = run("Cronobacter spp. in 10 g: not detected");
        assert_eq!(out.get("Cronobacter spp.").map(String::as_str), Some("Negative"));
        let out = run("Cronobacter spp. detected in 10 g");
        assert_eq!(out.get("Cronobacter spp.").map(String::as_str), Some("Review"));
        assert!(!run("plain microbiology report").contains_key("Cronobacter spp."));
    }

    #[test]
    fn microbiology_scientific_notation() {
        let out = run("Total Plate Count  1,9E+04 cfu/g");
        assert_eq!(out.get("Total Plate Count").map(String::as_str), Some("19000"));
    }

    #[test]
    fn microbiology_trace_counts_are_negative() {
        let out = run("Enterobacteriaceae <10 cfu/g\nE. coli 4 cfu/g");
        assert_eq!(out.get("Enterobacteriaceae").map(String::as_str), Some("Negative"));
        assert_eq!(out.get("E. coli").map(String::as_str), Some("Negative"));
    }

    #[test]
    fn accreditation_numbers_are_not_counts() {
        let out = run("Coliforms determined by accredited method 1234 cfu/g reference");
        assert!(!out.contains_key("Coliforms (in 1g)"));
    }

    #[test]
    fn present_counts_are_renormalized() {
        let mut results = BTreeMap::new();
        results.insert("Total Viable count".to_string(), "8".to_string());
        apply(&mut results, "", false);
        assert_eq!(results.get("Total Viable count").map(String::as_str), Some("Negative"));
    }

    #[test]
    fn present_counts_with_units_are_renormalized() {
        // the sci-notation pass-through stores the capture verbatim, unit
        // included, when the field is in the caller's catalog
        let mut results = BTreeMap::new();
        results.insert("Total Plate Count".to_string(), "1,9E+04 cfu/g".to_string());
        results.insert("Enterobacteriaceae".to_string(), "<10 cfu/g".to_string());
        apply(&mut results, "", false);
        assert_eq!(results.get("Total Plate Count").map(String::as_str), Some("19000"));
        assert_eq!(results.get("Enterobacteriaceae").map(String::as_str), Some("Negative"));
    }

    #[test]
    fn lowercase_pesticides_key_counts_as_processed() {
        let mut results = BTreeMap::new();
        results.insert("pesticides".to_string(), "negative".to_string());
        apply(&mut results, "chlorpyrifos 0.12 mg/kg", false);
        assert!(!results.contains_key("Pesticides"));
    }

    #[test]
    fn batch_backfill_from_contextual_patterns() {
        let out = run("order details\nbatch # CS30-00-1195\n");
        assert_eq!(out.get("batch_id").map(String::as_str), Some("CS30-00-1195"));

        let mut results = BTreeMap::new();
        results.insert("batch_id".to_string(), "BA001750".to_string());
        apply(&mut results, "batch # CS30-00-1195", false);
        assert_eq!(results.get("batch_id").map(String::as_str), Some("BA001750"));
    }

    #[test]
    fn dioxin_panel_records_parseable_values_verbatim() {
        let text = "WHO-PCDD/F-TEQ  0.25 pg/g\n\
                    WHO-PCDD/F+DL-PCBs-TEQ  0.41 pg/g\n\
                    PCB (28, 52, 101, 138, 153, 180)  1.2 µg/kg";
        let out = run(text);
        assert_eq!(out.get("WHO-PCDD/F-TEQ").map(String::as_str), Some("0.25"));
        assert_eq!(out.get("WHO-PCDD/F + DL-PCB-TEQ").map(String::as_str), Some("0.41"));
        assert_eq!(
            out.get("Sum PCB (28, 52, 101, 138, 153, 180)").map(String::as_str),
            Some("1.2")
        );
    }
}
