//! Value Normalizer
//!
//! Turns one raw textual lab value ("Less than 0,01 %", "4183 cP",
//! "Not detected µg/kg") into one canonical value. Branch order matters and
//! first match wins:
//!
//! 1. spaced-character repair ("d e t e c t e d" -> "detected")
//! 2. not-detected / nd -> negative, short-circuiting everything else
//! 3. "less than N" extraction, with sub-threshold percent zeroing and the
//!    viscosity-at-25°C /1000 conversion
//! 4. scientific-notation pass-through (deferred to the microbiology pass)
//! 5. generic numeric extraction, comma decimal normalized to dot
//! 6. trailing "less than N" override for values buried after parenthetical
//!    chemical identifiers
//! 7. sub-threshold percent zeroing on the plain-numeric path
//! 8. viscosity-at-25°C conversion guarded against double application

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::value::{CanonicalValue, Qualifier};

static SPACED_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:[A-Za-z] ){2,}[A-Za-z]\b").unwrap());
static NOT_DETECTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:not\s*detected|nd)\b").unwrap());
static LESS_THAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)less\s+than\s+(\d+(?:[,.]\d+)?)").unwrap());
static SCI_NOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d+[.,]?\d*e[+-]?\d+").unwrap());
static NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:[,.]\d+)?)").unwrap());
static TRAILING_LESS_THAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is).*less\s+than\s+(\d+(?:[,.]\d+)?)").unwrap());
static VISCOSITY_UNIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:cp|centipoise|mpa[\s.·]?s|pa\.?s)\b").unwrap());
static PLAIN_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(?:[,.]\d+)?$").unwrap());

/// Collapse runs of single characters separated by single spaces, an OCR/PDF
/// artifact that would otherwise defeat keyword matching.
pub fn repair_spaced_characters(text: &str) -> String {
    SPACED_CHARS
        .replace_all(text, |caps: &regex::Captures| caps[0].replace(' ', ""))
        .into_owned()
}

/// Clean one raw COA value. `parameter_name` selects parameter-specific
/// conversions (currently only viscosity at 25°C); pass "" when unknown.
pub fn normalize(raw: &str, parameter_name: &str) -> String {
    normalize_value(raw, parameter_name).into_string()
}

/// Typed variant of [`normalize`]; see the module docs for the branch order.
pub fn normalize_value(raw: &str, parameter_name: &str) -> CanonicalValue {
    let original = raw.trim();
    if original.is_empty() {
        return CanonicalValue::raw(original);
    }

    let value = repair_spaced_characters(original);
    let parameter_lower = parameter_name.to_lowercase();
    let is_viscosity_25 = parameter_lower.contains("viscosity") && parameter_lower.contains("25");

    if NOT_DETECTED.is_match(&value) {
        return CanonicalValue::Qualitative(Qualifier::Negative);
    }

    if let Some(caps) = LESS_THAN.captures(&value) {
        let numeric = caps[1].replace(',', ".");
        // Sub-threshold percentages are reported as zero, not as the
        // detection limit.
        if value.contains('%') {
            if let Ok(n) = numeric.parse::<f64>() {
                if n <= 0.01 {
                    return CanonicalValue::numeric("0.00");
                }
            }
        }
        if is_viscosity_25 {
            match numeric.parse::<f64>() {
                Ok(n) => {
                    let converted = n / 1000.0;
                    debug!(raw = original, converted, "viscosity less-than conversion");
                    return CanonicalValue::numeric(format!("{}", converted));
                }
                Err(_) => {
                    debug!(raw = original, "viscosity conversion failed, keeping plain value");
                }
            }
        }
        return CanonicalValue::Numeric(numeric);
    }

    // Scientific notation is left for the microbiology pass, which knows how
    // to interpret the exponent.
    if SCI_NOTATION.is_match(&value) {
        return CanonicalValue::raw(original);
    }

    let numeric = match NUMERIC.captures(&value) {
        Some(caps) => caps[1].replace(',', "."),
        None => return CanonicalValue::raw(original),
    };

    // A trailing "less than N" wins over the first-number extraction, e.g.
    // "Pb) (7439-92-1) Less than 0,02 mg/kg".
    if let Some(caps) = TRAILING_LESS_THAN.captures(&value) {
        return CanonicalValue::Numeric(caps[1].replace(',', "."));
    }

    if value.contains('%') {
        if let Ok(n) = numeric.parse::<f64>() {
            if n < 0.01 {
                return CanonicalValue::numeric("0.00");
            }
        }
    }

    if is_viscosity_25 {
        let has_units = VISCOSITY_UNIT.is_match(original);
        let has_less_than = original.to_lowercase().contains("less than");
        let is_plain_number = PLAIN_NUMBER.is_match(original);
        // Only raw readings carry units; a bare number has already been
        // converted once and must not be divided again.
        if (has_units || has_less_than) && !is_plain_number {
            if let Ok(n) = numeric.parse::<f64>() {
                let converted = n / 1000.0;
                debug!(raw = original, converted, "viscosity conversion");
                return CanonicalValue::numeric(format!("{}", converted));
            }
            debug!(raw = original, "viscosity conversion failed, keeping plain value");
        } else {
            debug!(raw = original, "viscosity value has no units, treating as converted");
        }
    }

    CanonicalValue::Numeric(numeric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_units_and_normalizes_decimal_separator() {
        assert_eq!(normalize("19,3 mg KOH/g", "AV"), "19.3");
        assert_eq!(normalize("65,3 %", "AI"), "65.3");
        assert_eq!(normalize("0,19 % (w/w)", ""), "0.19");
        assert_eq!(normalize("660 cfu/g", ""), "660");
    }

    #[test]
    fn not_detected_beats_numeric_content() {
        assert_eq!(normalize("Not detected per 25", ""), "negative");
        assert_eq!(normalize("Not detected µg/kg", ""), "negative");
        assert_eq!(normalize("nd (LOQ 0,01)", ""), "negative");
        assert_eq!(normalize("ND", ""), "negative");
    }

    #[test]
    fn repairs_character_spaced_artifacts() {
        assert_eq!(repair_spaced_characters("n o t d e t e c t e d"), "notdetected");
        assert_eq!(normalize("n o t d e t e c t e d", ""), "negative");
    }

    #[test]
    fn less_than_extracts_the_limit() {
        assert_eq!(normalize("Less than 0,5 meq", "POV"), "0.5");
        assert_eq!(normalize("less than 10", ""), "10");
        assert_eq!(normalize("Pb) (7439-92-1) Less than 0,02 mg/kg", "Lead"), "0.02");
    }

    #[test]
    fn sub_threshold_percentages_report_zero() {
        assert_eq!(normalize("Less than 0,01 %", ""), "0.00");
        assert_eq!(normalize("0,005 %", ""), "0.00");
        // the threshold is 0.01, not 0.1
        assert_eq!(normalize("Less than 0,1 %", ""), "0.1");
    }

    #[test]
    fn viscosity_at_25c_divides_by_1000() {
        assert_eq!(normalize("4183 cP", "Viscosity at 25°C"), "4.183");
        assert_eq!(normalize("Less than 300 cP", "Viscosity at 25°C"), "0.3");
        // other parameters keep the raw reading
        assert_eq!(normalize("Less than 300 cP", ""), "300");
    }

    #[test]
    fn viscosity_normalization_is_idempotent() {
        let once = normalize("4183 cP", "Viscosity at 25°C");
        assert_eq!(once, "4.183");
        assert_eq!(normalize(&once, "Viscosity at 25°C"), "4.183");
    }

    #[test]
    fn scientific_notation_passes_through() {
        assert_eq!(normalize("1,9E+04 cfu/g", ""), "1,9E+04 cfu/g");
        assert_eq!(normalize("2.5e3", ""), "2.5e3");
    }

    #[test]
    fn non_numeric_content_passes_through() {
        assert_eq!(normalize("complies", ""), "complies");
        assert_eq!(normalize("", "AV"), "");
    }

    proptest! {
        #[test]
        fn not_detected_always_wins(prefix in "[A-Za-z0-9,. ]{0,20}", suffix in "[A-Za-z0-9,. ]{0,20}") {
            let input = format!("{} not detected {}", prefix, suffix);
            prop_assert_eq!(normalize(&input, ""), "negative");
        }

        #[test]
        fn comma_and_dot_decimals_agree(int_part in 0u32..10_000, frac_part in 0u32..100) {
            let comma = format!("{},{:02} mg/kg", int_part, frac_part);
            let dot = format!("{}.{:02} mg/kg", int_part, frac_part);
            prop_assert_eq!(normalize(&comma, ""), normalize(&dot, ""));
            prop_assert!(!normalize(&comma, "").contains(','));
        }
    }
}
