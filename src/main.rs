//! COA extraction entry point.
//!
//! Reads one JSON request from stdin, runs the extraction pipeline and
//! prints exactly one line of JSON to stdout. Diagnostics go to stderr only;
//! any failure prints a structured error object and exits non-zero.

use std::io::Read;
use std::process::ExitCode;

use tracing::info;
use tracing_subscriber::EnvFilter;

use coa_extract::ai::AiClient;
use coa_extract::config::AiConfig;
use coa_extract::error::ErrorResponse;
use coa_extract::pipeline::{self, ExtractionRequest};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        return fail(&format!("Invalid input: {}", e));
    }

    let request: ExtractionRequest = match serde_json::from_str(&input) {
        Ok(request) => request,
        Err(e) => return fail(&format!("Invalid input: {}", e)),
    };

    let ai = match AiConfig::from_env() {
        Some(config) => match AiClient::new(config) {
            Ok(client) => Some(client),
            Err(e) => return fail(&format!("Configuration error: {}", e)),
        },
        None => None,
    };

    info!(pdf_path = %request.pdf_path, phase = request.phase, "processing document");
    match pipeline::run(&request, ai.as_ref()).await {
        Ok(record) => {
            println!("{}", serde_json::Value::Object(record));
            ExitCode::SUCCESS
        }
        Err(e) => {
            let response = ErrorResponse::from(&e);
            println!("{}", serde_json::to_string(&response).unwrap_or_default());
            ExitCode::FAILURE
        }
    }
}

fn fail(message: &str) -> ExitCode {
    println!("{}", serde_json::json!({ "error": message }));
    ExitCode::FAILURE
}
