//! Document classification.
//!
//! Spectral Service AG reports carry their lipid panel in a table layout the
//! generic regex pass cannot read, so they take a dedicated extraction
//! branch. Detection is a plain substring check; a false positive only costs
//! an extra table scan.

const SPECTRAL_INDICATORS: &[&str] = &[
    "spectral service ag",
    "spectral service",
    "spectral ag",
    "weight-%",
];

pub fn is_spectral_report(text: &str) -> bool {
    let lower = text.to_lowercase();
    SPECTRAL_INDICATORS
        .iter()
        .any(|indicator| lower.contains(indicator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_vendor_phrases_case_insensitively() {
        assert!(is_spectral_report("Analysed by SPECTRAL Service AG, Cologne"));
        assert!(is_spectral_report("Component Weight-% Method"));
        assert!(!is_spectral_report("Generic Lab GmbH certificate"));
    }
}
