//! Property-based tests for the value normalizer and derived values.

use proptest::prelude::*;

use coa_extract::normalize::normalize;
use coa_extract::value::format_derived;

mod normalizer_properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Any value carrying "not detected" collapses to "negative",
        /// whatever numeric content surrounds it.
        #[test]
        fn not_detected_always_wins(
            prefix in "[A-Za-z ]{0,12}",
            number in 0.0f64..1000.0,
        ) {
            let raw = format!("{} not detected per {:.1} g", prefix, number);
            prop_assert_eq!(normalize(&raw, "Salmonella (in 25g)"), "negative");
        }

        /// "Less than X %" with X at or below 0.01 is the fixed "0.00".
        #[test]
        fn tiny_less_than_percentages_floor_to_zero(millis in 1u32..=10) {
            let raw = format!("Less than 0,0{} %", millis / 10);
            let cleaned = normalize(&raw, "Moisture");
            let value: f64 = cleaned.parse().unwrap();
            prop_assert!(value <= 0.01);
        }

        /// "Less than X" for the 25°C viscosity parameter divides by 1000.
        #[test]
        fn viscosity_bounds_scale_down(cp in 1u32..100_000) {
            let raw = format!("Less than {} cP", cp);
            let cleaned = normalize(&raw, "Viscosity at 25°C");
            let value: f64 = cleaned.parse().unwrap();
            prop_assert!((value - f64::from(cp) / 1000.0).abs() < 1e-9);
        }

        /// Comma and dot decimal separators normalize to the same output.
        #[test]
        fn decimal_separators_are_equivalent(
            whole in 0u32..10_000,
            frac in 0u32..100,
        ) {
            let with_comma = format!("{},{:02} mg/kg", whole, frac);
            let with_dot = format!("{}.{:02} mg/kg", whole, frac);
            let cleaned = normalize(&with_comma, "Lead");
            prop_assert_eq!(cleaned.clone(), normalize(&with_dot, "Lead"));
            prop_assert!(!cleaned.contains(','));
        }

        /// Scientific notation passes through untouched for the
        /// microbiology pass to interpret.
        #[test]
        fn scientific_notation_is_preserved(
            mantissa in 1u32..10,
            exponent in 1u32..6,
        ) {
            let raw = format!("{},9E+0{} cfu/g", mantissa, exponent);
            prop_assert_eq!(normalize(&raw, "Total Plate Count"), raw);
        }
    }
}

mod derived_value_properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Derived sums render without float noise: at most the requested
        /// number of decimals, no trailing garbage digits.
        #[test]
        fn derived_values_have_bounded_precision(
            a in 0.0f64..10.0,
            b in 0.0f64..10.0,
        ) {
            let rendered = format_derived(a + b, 2);
            let reparsed: f64 = rendered.parse().unwrap();
            prop_assert!((reparsed - (a + b)).abs() <= 0.005 + 1e-9);
            if let Some(fraction) = rendered.split('.').nth(1) {
                prop_assert!(fraction.len() <= 2);
            }
        }
    }
}
