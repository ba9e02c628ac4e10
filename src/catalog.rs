//! Column catalog
//!
//! The caller supplies the ordered list of output column names. Every
//! parameter the deterministic passes emit must resolve, case-insensitively,
//! to one of these names; the caller's exact casing is preserved in the
//! output. Unresolvable parameters are dropped.

/// Caller-supplied output catalog.
#[derive(Debug, Clone, Default)]
pub struct ColumnCatalog {
    columns: Vec<String>,
}

impl ColumnCatalog {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Return the first candidate that exists in the catalog, as the
    /// catalog's verbatim entry.
    pub fn resolve(&self, candidates: &[&str]) -> Option<&str> {
        for candidate in candidates {
            let wanted = candidate.trim().to_lowercase();
            for column in &self.columns {
                if column.trim().to_lowercase() == wanted {
                    return Some(column.as_str());
                }
            }
        }
        None
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(&[name]).is_some()
    }
}

/// Human-readable definitions attached to catalog columns in the AI prompt,
/// so the model does not confuse e.g. AI (acetone insoluble) with anything
/// else.
pub const PARAMETER_DEFINITIONS: &[(&str, &str)] = &[
    ("AI", "Acetone Insoluble - acetone insoluble matter content (%)"),
    ("AV", "Acid Value - acid value measurement (mg KOH/g)"),
    ("POV", "Peroxide Value - peroxide value measurement (meq O2/kg)"),
    ("PC", "Phosphatidylcholine - phosphatidylcholine content (%)"),
    ("PE", "Phosphatidylethanolamine - phosphatidylethanolamine content (%)"),
    ("LPC", "Lysophosphatidylcholine - lysophosphatidylcholine content (%)"),
    ("PA", "Phosphatidic Acid - phosphatidic acid content (%)"),
    ("PI", "Phosphatidylinositol - phosphatidylinositol content (%)"),
    ("P", "Phosphorus - total phosphorus content (%)"),
    ("PL", "Phospholipids - total phospholipids content (%)"),
    ("Iron (Fe)", "Iron content (ppm)"),
    ("Lead", "Lead content (ppm)"),
    ("Arsenic", "Arsenic content (ppm)"),
    ("Mercury", "Mercury content (ppm)"),
    ("Cadmium", "Cadmium content (ppm)"),
    ("Total Plate Count", "Total Plate Count (CFU/g)"),
    ("Total Viable count", "Total Viable Count (CFU/g)"),
    ("Yeasts & Molds", "Yeasts and Molds count (CFU/g)"),
    ("E. coli", "E. coli presence/count"),
    ("Enterobacteriaceae", "Enterobacteriaceae count (CFU/g)"),
    ("Coliforms (in 1g)", "Coliform count per gram"),
    ("Salmonella (in 25g)", "Salmonella presence in 25g sample"),
    ("Cronobacter", "Cronobacter presence"),
    ("PCR, 50 cycl. (GMO), 35S/NOS/FMV", "GMO detection by PCR (positive/negative)"),
    ("Listeria monocytogenes (in 25g)", "Listeria monocytogenes presence in 25g sample"),
    ("Moisture", "Moisture content (%)"),
    ("Color Gardner (As is)", "Gardner Color as is"),
    ("Color Gardner (10% dil.)", "Gardner Color at 10% dilution"),
    ("Color Iodine", "Iodine Color value"),
    ("Viscosity at 25°C", "Viscosity at 25°C (cP)"),
    ("Toluene Insolubles", "Toluene insolubles content (%)"),
    ("Hexane Insolubles", "Hexane insolubles content (%)"),
    ("Pesticides", "Pesticide residues (ppm)"),
    ("Heavy Metals", "Heavy metals content (ppm)"),
    ("PAH4", "PAH4 (Polycyclic Aromatic Hydrocarbons) (μg/kg)"),
    ("Ochratoxin A", "Ochratoxin A content (μg/kg)"),
    ("Peanut content", "Peanut allergen content (ppm)"),
];

pub fn parameter_definition(column: &str) -> Option<&'static str> {
    PARAMETER_DEFINITIONS
        .iter()
        .find(|(name, _)| *name == column)
        .map(|(_, definition)| *definition)
}
