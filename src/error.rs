use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoaError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Document processing error: {message}")]
    DocumentProcessing { message: String },

    #[error(
        "Insufficient document content: {text_len} chars extracted, \
         {ocr_len} chars after OCR, {image_count} embedded images"
    )]
    InsufficientContent {
        text_len: usize,
        ocr_len: usize,
        image_count: usize,
    },

    #[error("External service error: {service} - {message}")]
    ExternalService { service: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl CoaError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn document_processing(message: impl Into<String>) -> Self {
        Self::DocumentProcessing {
            message: message.into(),
        }
    }

    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::DocumentProcessing { .. } => "DOCUMENT_PROCESSING_ERROR",
            Self::InsufficientContent { .. } => "INSUFFICIENT_CONTENT",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
        }
    }
}

pub type CoaResult<T> = Result<T, CoaError>;

/// JSON error object emitted on stdout when the pipeline cannot produce a
/// result. `details` carries the diagnostic fields of the
/// insufficient-content gate.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&CoaError> for ErrorResponse {
    fn from(error: &CoaError) -> Self {
        let details = match error {
            CoaError::InsufficientContent {
                text_len,
                ocr_len,
                image_count,
            } => Some(serde_json::json!({
                "text_len": text_len,
                "ocr_len": ocr_len,
                "image_count": image_count,
            })),
            _ => None,
        };
        Self {
            error: error.to_string(),
            code: error.error_code().to_string(),
            details,
        }
    }
}
