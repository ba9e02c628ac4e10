//! Hosted language-model extractor.
//!
//! A single chat-completion call per document; any failure along the way
//! (network, HTTP status, response shape, JSON recovery) degrades to an
//! empty contribution and never fails the pipeline. The model's keys are
//! normalized back onto the caller's column catalog before merging.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::{parameter_definition, ColumnCatalog};
use crate::config::AiConfig;
use crate::normalize::normalize;

const SYSTEM_PROMPT: &str = "You are an expert lab analyst extracting data from Certificate of Analysis (COA) PDF reports. \
Your task is to identify the sample ID (format: MYYYYWWNN), batch ID (format: BA######), \
and extract lab test results with their exact values.\n\n\
IMPORTANT PARAMETER DEFINITIONS:\n\
- AI = Acetone Insoluble (% acetone insoluble matter)\n\
- AV = Acid Value (mg KOH/g)\n\
- POV = Peroxide Value (meq O2/kg)\n\
- PC = Phosphatidylcholine (%)\n\
- PE = Phosphatidylethanolamine (%)\n\
- LPC = Lysophosphatidylcholine (%)\n\
- PA = Phosphatidic Acid (%)\n\
- PI = Phosphatidylinositol (%)\n\
- P = Phosphorus (%)\n\
- PL = Phospholipids (%)\n\n\
Return a flat JSON where keys EXACTLY match the provided column names. \
Preserve all symbols like '<', '>', '\u{2264}', '\u{2265}' in values. \
For GMO tests, use 'positive', 'negative', or actual values. \
For microbiology, convert 'less than X cfu/g' to just the number 'X'. \
Convert 'Not detected' values to 'negative'. \
If a parameter is not found, omit it completely.";

/// Only the leading columns are annotated with definitions; the catalog can
/// be long and the interesting parameters come first.
const ANNOTATED_COLUMN_LIMIT: usize = 50;

static PARENTHETICAL_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(.*\)$").unwrap());

pub struct AiClient {
    client: Client,
    config: AiConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl AiClient {
    pub fn new(config: AiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("cannot build HTTP client")?;
        Ok(Self { client, config })
    }

    /// Ask the model for parameter values; keys are normalized onto the
    /// catalog and values cleaned. Returns an empty map on any failure.
    pub async fn extract(&self, raw_text: &str, catalog: &ColumnCatalog) -> BTreeMap<String, String> {
        match self.call(raw_text, catalog).await {
            Ok(data) => {
                debug!(fields = data.len(), "model contribution parsed");
                normalize_keys(data, catalog)
            }
            Err(e) => {
                warn!(error = %e, "model extraction failed, continuing without it");
                BTreeMap::new()
            }
        }
    }

    async fn call(
        &self,
        raw_text: &str,
        catalog: &ColumnCatalog,
    ) -> Result<BTreeMap<String, serde_json::Value>> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_user_prompt(raw_text, catalog),
                },
            ],
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .context("chat completion request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("chat completion returned {}: {}", status, body);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("cannot parse chat completion response")?;
        let content = parsed
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .context("chat completion carried no content")?;

        let object = recover_json_object(content).context("no JSON object in model reply")?;
        Ok(object)
    }
}

fn build_user_prompt(raw_text: &str, catalog: &ColumnCatalog) -> String {
    let annotated: Vec<String> = catalog
        .columns()
        .iter()
        .take(ANNOTATED_COLUMN_LIMIT)
        .map(|column| match parameter_definition(column) {
            Some(definition) => format!("{} ({})", column, definition),
            None => column.clone(),
        })
        .collect();

    format!(
        "Lab Certificate of Analysis - Phase 1 Parameters Focus\n\n\
         Column References (match exactly):\n{}\n\n\
         Raw PDF Text:\n{}",
        annotated.join(", "),
        raw_text
    )
}

/// Locate the outermost brace pair in the reply and decode that slice;
/// anything that does not decode to an object yields `None`.
fn recover_json_object(content: &str) -> Option<BTreeMap<String, serde_json::Value>> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&content[start..=end]).ok()
}

/// Map model keys onto catalog keys: exact match first, then with any
/// trailing parenthetical stripped, then known spelling variants. Keys the
/// catalog does not know are dropped; the model is not allowed to invent
/// columns.
fn normalize_keys(
    data: BTreeMap<String, serde_json::Value>,
    catalog: &ColumnCatalog,
) -> BTreeMap<String, String> {
    let mut normalized = BTreeMap::new();
    for (key, value) in data {
        let text = match value {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };

        let base = PARENTHETICAL_SUFFIX.replace(&key, "").trim().to_string();
        let target = catalog
            .resolve(&[key.as_str()])
            .or_else(|| catalog.resolve(&[base.as_str()]))
            .map(str::to_string)
            .or_else(|| variant_key(&base, catalog));

        match target {
            Some(target) => {
                let cleaned = normalize(&text, &target);
                normalized.insert(target, cleaned);
            }
            None => debug!(key = %key, "model key outside the catalog, dropped"),
        }
    }
    normalized
}

fn variant_key(base: &str, catalog: &ColumnCatalog) -> Option<String> {
    let lower = base.to_lowercase();
    let candidates: &[&str] = if lower == "yeasts & molds" || lower == "yeasts & moulds" {
        &["Yeasts & Molds", "Yeasts & Moulds"]
    } else if lower.starts_with("total plate count") {
        &["Total Plate Count"]
    } else if lower.starts_with("peroxide value") {
        &["POV", "Peroxide Value"]
    } else {
        return None;
    };
    catalog.resolve(candidates).map(str::to_string)
}
