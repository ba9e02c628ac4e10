//! Per-parameter extraction rules.
//!
//! One record per lab parameter: the canonical name handed to the value
//! normalizer, the catalog synonyms it may resolve to, an ordered pattern
//! list (most specific first, generic line-capture last) and a rejection
//! vocabulary that filters out accreditation/method footnotes masquerading
//! as results. The generic driver in [`crate::extract`] consumes this table;
//! adding a parameter means adding a record, not control flow.

/// How a pattern's capture becomes a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Normalize the capture with the rule's parameter name.
    Scalar,
    /// Capture is a bare number that the document reports as a percentage;
    /// append "%" before normalizing so sub-threshold zeroing applies.
    AppendPercent,
    /// Collapse to "negative" when the capture carries a negative phrase
    /// (not detected / nd / negative / absent in N g), otherwise normalize.
    NegativeKeyword,
    /// Succeed only when the capture carries a negative phrase.
    NegativeOnly,
    /// Drop a trailing "± uncertainty" block before normalizing.
    StripUncertainty,
    /// Retest-document heuristic: only applied when the source path hints at
    /// a retest, where the first bare percentage in the text is the result.
    RetestPercent,
}

#[derive(Debug, Clone, Copy)]
pub struct PatternRule {
    pub pattern: &'static str,
    pub mode: CaptureMode,
}

const fn pat(pattern: &'static str, mode: CaptureMode) -> PatternRule {
    PatternRule { pattern, mode }
}

#[derive(Debug, Clone, Copy)]
pub struct ParamRule {
    /// Canonical parameter name, passed to the normalizer.
    pub name: &'static str,
    /// Catalog candidates, tried in order.
    pub synonyms: &'static [&'static str],
    pub patterns: &'static [PatternRule],
    /// Candidates containing any of these (lowercase) substrings are
    /// footnote text, not results.
    pub reject: &'static [&'static str],
    /// The label appears multiple times in some layouts; prefer the
    /// occurrence that carries a unit or a value over accreditation lines.
    pub prefer_valued_occurrence: bool,
    /// Cleaned value also feeds the heavy-metals accumulator under this name.
    pub metal: Option<&'static str>,
}

const fn rule(
    name: &'static str,
    synonyms: &'static [&'static str],
    patterns: &'static [PatternRule],
) -> ParamRule {
    ParamRule {
        name,
        synonyms,
        patterns,
        reject: &[],
        prefer_valued_occurrence: false,
        metal: None,
    }
}

const METHOD_VOCABULARY: &[&str] = &["iso", "accredit", "method"];

use CaptureMode::*;

pub const RULES: &[ParamRule] = &[
    ParamRule {
        reject: METHOD_VOCABULARY,
        ..rule(
            "AI",
            &["AI", "Acetone Insoluble", "Aceton insoluble"],
            &[
                pat(
                    r"(?i)(?:acetone|aceton)\s+insolubles?(?:\s+matter)?[^\n\r]{0,40}?(\d+(?:[,.]\d+)?\s*%)",
                    Scalar,
                ),
                pat(
                    r"(?i)(?:acetone|aceton)\s+insolubles?(?:\s+matter)?\s*:?\s*([^\n\r]+)",
                    Scalar,
                ),
            ],
        )
    },
    rule(
        "AV",
        &["AV", "Acid Value"],
        &[pat(r"(?i)acid\s+value\s*:?\s*([^\n\r]+)", Scalar)],
    ),
    ParamRule {
        reject: METHOD_VOCABULARY,
        prefer_valued_occurrence: true,
        ..rule(
            "POV",
            &["POV", "Peroxide Value"],
            &[pat(r"(?i)peroxide\s+value\s*:?\s*([^\n\r]+)", Scalar)],
        )
    },
    rule(
        "Color Gardner (10% dil.)",
        &["Color Gardner (10% dil.)"],
        &[pat(
            r"(?i)color\s+gardner[^\n\r]*?10\s*%?[^\n\r]*?(\d+(?:[.,]\d+)?)\b",
            Scalar,
        )],
    ),
    rule(
        "Viscosity at 25°C",
        &["Viscosity at 25°C"],
        &[
            pat(r"(?i)viscosity\s+at\s+25\s*°?\s*C[\s:]*([^\n\r]+)", Scalar),
            // value may sit on the following line
            pat(r"(?i)viscosity\s+at\s+25\s*°?\s*C[\s:]*([\s\S]{0,40})", Scalar),
        ],
    ),
    rule(
        "Hexane Insolubles",
        &["Hexane Insolubles", "Hexane insoluble matter"],
        &[pat(
            r"(?i)hexane\s+insolubles?(?:\s+matter)?\s*:?\s*([^\n\r]+)",
            Scalar,
        )],
    ),
    ParamRule {
        reject: METHOD_VOCABULARY,
        ..rule(
            "Toluene Insolubles",
            &["Toluene Insolubles", "Toluene insoluble matter"],
            &[
                pat(
                    r"(?i)toluene\s+insolubles?(?:\s+matter)?[^\n\r]{0,40}?(\d+(?:[,.]\d+)?\s*%)",
                    Scalar,
                ),
                pat(
                    r"(?i)toluene\s+insolubles?(?:\s+matter)?[\s:]+(\d+(?:[,.]\d+)?)\b",
                    AppendPercent,
                ),
                pat(
                    r"(?i)toluene\s+insolubles?[\s\S]{0,100}?(\d+(?:[,.]\d+)?\s*%)",
                    Scalar,
                ),
                pat(r"(\d+(?:[,.]\d+)?)\s*%", RetestPercent),
                pat(
                    r"(?i)toluene\s+insolubles?(?:\s+matter)?\s*:?\s*([^\n\r]+)",
                    Scalar,
                ),
            ],
        )
    },
    rule(
        "Moisture",
        &["Moisture"],
        &[pat(r"(?i)moisture[\s\S]{0,30}?(\d+[.,]\d+\s*%[^\n\r]*)", Scalar)],
    ),
    ParamRule {
        metal: Some("Iron"),
        ..rule(
            "Iron (Fe)",
            &["Iron (Fe)", "Iron"],
            &[
                pat(r"(?i)iron\s*\(Fe\)(?:\s*\([^)]+\))?\s*:?\s*([^\n\r]+)", Scalar),
                pat(r"(?i)\biron\b\s*:?\s*([^\n\r]+)", Scalar),
            ],
        )
    },
    ParamRule {
        metal: Some("Lead"),
        ..rule(
            "Lead",
            &["Lead", "Lead (Pb)"],
            &[
                pat(r"(?i)lead\s*\(Pb\)(?:\s*\([^)]+\))?\s*:?\s*([^\n\r]+)", Scalar),
                pat(r"(?i)\blead\b\s*:?\s*([^\n\r]+)", Scalar),
            ],
        )
    },
    ParamRule {
        metal: Some("Arsenic"),
        ..rule(
            "Arsenic",
            &["Arsenic", "Arsenic (As)"],
            &[
                pat(r"(?i)arsenic\s*\(As\)(?:\s*\([^)]+\))?\s*:?\s*([^\n\r]+)", Scalar),
                pat(r"(?i)\barsenic\b\s*:?\s*([^\n\r]+)", Scalar),
            ],
        )
    },
    ParamRule {
        metal: Some("Mercury"),
        ..rule(
            "Mercury",
            &["Mercury", "Mercury (Hg)"],
            &[
                pat(r"(?i)mercury\s*\(Hg\)(?:\s*\([^)]+\))?\s*:?\s*([^\n\r]+)", Scalar),
                pat(r"(?i)\bmercury\b\s*:?\s*([^\n\r]+)", Scalar),
            ],
        )
    },
    ParamRule {
        metal: Some("Cadmium"),
        ..rule(
            "Cadmium",
            &["Cadmium", "Cadmium (Cd)"],
            &[
                pat(r"(?i)cadmium\s*\(Cd\)(?:\s*\([^)]+\))?\s*:?\s*([^\n\r]+)", Scalar),
                pat(r"(?i)\bcadmium\b\s*:?\s*([^\n\r]+)", Scalar),
            ],
        )
    },
    rule(
        "Enterobacteriaceae",
        &["Enterobacteriaceae"],
        &[pat(r"(?i)enterobacteriaceae\s*:?\s*([^\n\r]+)", Scalar)],
    ),
    rule(
        "Total Plate Count",
        &["Total Plate Count"],
        &[pat(
            r"(?i)total\s+plate\s+count[^\n\r]*?(\d[\d\s.,]*(?:e\s*[+-]?\d+)?\s*cfu/g)",
            Scalar,
        )],
    ),
    rule(
        "Total Viable count",
        &["Total Viable count", "Total Viable Count"],
        &[
            pat(
                r"(?i)total\s+viable\s+count[^\n\r]*?(\d[\d\s.,]*(?:e\s*[+-]?\d+)?\s*cfu/g)",
                Scalar,
            ),
            pat(r"(?i)total\s+viable\s+count\s*:?\s*([^\n\r]+)", Scalar),
        ],
    ),
    rule(
        "Yeasts & Molds",
        &["Yeasts & Molds", "Yeasts & Moulds"],
        &[
            pat(r"(?i)yeasts\s*(?:&|and)\s*mou?lds\s*:?\s*([^\n\r]+)", Scalar),
            // run-on phrasing without a separating space
            pat(
                r"(?i)yeasts\s*&\s*mou?lds\s*less\s+than\s+(\d+(?:[.,]\d+)?)\s*cfu/g",
                Scalar,
            ),
            // some reports carry yeasts and moulds as separate rows
            pat(r"(?mi)^\s*yeasts\s+(?:less\s+than\s+)?([^\n\r&]+)$", Scalar),
            pat(r"(?mi)^\s*mou?lds\s+(?:less\s+than\s+)?([^\n\r&]+)$", Scalar),
        ],
    ),
    rule(
        "Yeasts",
        &["Yeasts"],
        &[
            pat(r"(?mi)^\s*yeasts\s+(?:less\s+than\s+)?([^\n\r&]+)$", Scalar),
            pat(r"(?i)yeasts\s+less\s+than\s+(\d+(?:[.,]\d+)?)\s*cfu/g", Scalar),
        ],
    ),
    rule(
        "Moulds",
        &["Moulds", "Molds"],
        &[
            pat(r"(?mi)^\s*mou?lds\s+(?:less\s+than\s+)?([^\n\r&]+)$", Scalar),
            pat(r"(?i)mou?lds\s+less\s+than\s+(\d+(?:[.,]\d+)?)\s*cfu/g", Scalar),
        ],
    ),
    rule(
        "Salmonella (in 25g)",
        &["Salmonella (in 25g)", "Salmonella (in 250g)"],
        &[
            pat(r"(?i)salmonella\s+spp\.?\s*:?\s*([^\n\r]+)", NegativeKeyword),
            pat(r"(?i)salmonella[^\n\r]*?\s([^\n\r]+)", NegativeKeyword),
        ],
    ),
    rule(
        "Cronobacter",
        &["Cronobacter", "Cronobacter spp."],
        &[
            pat(r"(?i)cronobacter\s*\([^)]*\)\s*:?\s*([^\n\r]+)", NegativeKeyword),
            pat(r"(?i)cronobacter\s+spp\.?\s*:?\s*([^\n\r]+)", NegativeKeyword),
            pat(r"(?i)cronobacter\s*:?\s*([^\n\r]+)", NegativeKeyword),
        ],
    ),
    rule(
        "PCR, 50 cycl. (GMO), 35S/NOS/FMV",
        &["PCR, 50 cycl. (GMO), 35S/NOS/FMV"],
        &[
            pat(r"(?i)GMO\s+screening\s+35S[^\n\r]*?[\s:]([^\n\r]+)", NegativeKeyword),
            pat(r"(?i)GMO\s+screening\s+SynPat[^\n\r]*?[\s:]([^\n\r]+)", NegativeKeyword),
            pat(r"(?i)\bGMO\b[^\n\r]*?(negative|not\s+detected|\bnd\b)", NegativeOnly),
            pat(r"(?i)\bGMO\b[^\n\r]*?\s([^\n\r]+)", NegativeOnly),
        ],
    ),
    rule(
        "Peanut content",
        &["Peanut content"],
        &[
            pat(r"(?i)peanut\s+ASU[^\n\r]*?:?\s*(not\s+detected)", NegativeOnly),
            pat(r"(?i)peanut[^\n\r]*?(not\s+detected|negative)", NegativeOnly),
            pat(
                r"(?i)allergens[^\n\r]*peanut[^\n\r]*?:?\s*(not\s+detected)",
                NegativeOnly,
            ),
            pat(r"(?i)peanut[^\n\r]*mg/kg\s*:?\s*(not\s+detected)", NegativeOnly),
            pat(r"(?i)peanut[^\n\r]*?(\d+(?:[.,]\d+)?)\s*(?:mg/kg|ppm)", Scalar),
        ],
    ),
    rule(
        "PAH4",
        &["PAH4"],
        &[
            pat(r"(?i)sum\s+of\s+PAH[- ]?4\s*:?\s*([^\n\r]+)", Scalar),
            pat(r"(?i)PAH\s*[- ]?4[^\n\r]*?[\s:]([^\n\r]+)", Scalar),
        ],
    ),
    rule(
        "Ochratoxin A",
        &["Ochratoxin A"],
        &[
            pat(r"(?i)ochratoxin\s+A\s*\([^)]+\)\s*([^\n\r±]+)", StripUncertainty),
            pat(r"(?i)ochratoxin\s+A\s*:?\s*([^\n\r±]+)", StripUncertainty),
        ],
    ),
];

/// Metals that contribute to the derived "Heavy Metals" sum. Iron is
/// extracted like the others but deliberately excluded here.
pub const HEAVY_METAL_COMPONENTS: &[&str] = &["Arsenic", "Cadmium", "Lead", "Mercury"];
