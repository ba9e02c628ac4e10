//! COA Extraction Library
//!
//! Turns Certificate-of-Analysis PDF reports for edible-oil/lecithin products
//! into flat key-value JSON records keyed by a caller-supplied column catalog.
//!
//! The heart of the crate is the deterministic rule set: the value normalizer
//! ([`normalize`]), the per-parameter regex tables ([`rules`] driven by
//! [`extract`]), the vendor-specific lipid-panel table reader ([`spectral`])
//! and the post-processing passes ([`postprocess`]). PDF text/table recovery,
//! OCR and the optional language-model call are thin collaborators around
//! those.

pub mod ai;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod identifiers;
pub mod normalize;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod postprocess;
pub mod rules;
pub mod spectral;
pub mod value;
