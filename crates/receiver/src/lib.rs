pub mod alert;
pub mod config;
pub mod definitions;
pub mod handler;
pub mod jobs;
pub mod manifest;
pub mod metrics;
pub mod server;
pub mod template;

use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed alert payload: {0}")]
    MalformedAlert(#[from] serde_json::Error),
    #[error("Definition store error: {0}")]
    DefinitionStore(String),
    #[error("Task definition {key} not found in {namespace}/{collection}")]
    DefinitionNotFound {
        key: String,
        namespace: String,
        collection: String,
    },
    #[error("Template render error: {0}")]
    Render(String),
    #[error("Format conversion error: {0}")]
    FormatConversion(String),
    #[error("Schema mapping error: {0}")]
    SchemaMapping(String),
    #[error("Submission error: {0}")]
    Submission(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status the alert endpoint answers with for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MalformedAlert(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short plaintext body returned to the caller. Internal error text stays in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            Error::MalformedAlert(_) => "Invalid request body",
            Error::DefinitionStore(_) | Error::DefinitionNotFound { .. } => {
                "Webhook error during retrieving configMap with job definitions"
            }
            Error::Render(_) | Error::FormatConversion(_) | Error::SchemaMapping(_) => {
                "Webhook error creating a job"
            }
            Error::Submission(_) => "Webhook error during creating a job",
            Error::Config(_) | Error::Io(_) => "Webhook receiver error",
        }
    }

    /// Pipeline stage label used for the failure counter.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::MalformedAlert(_) => "decode_alert",
            Error::DefinitionStore(_) | Error::DefinitionNotFound { .. } => "fetch_definitions",
            Error::Render(_) => "render",
            Error::FormatConversion(_) => "format_conversion",
            Error::SchemaMapping(_) => "schema_mapping",
            Error::Submission(_) => "submit",
            Error::Config(_) | Error::Io(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_alert_is_a_client_error() {
        let err = Error::from(serde_json::from_str::<serde_json::Value>("{").unwrap_err());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Invalid request body");
    }

    #[test]
    fn downstream_failures_are_server_errors() {
        let errors = vec![
            Error::DefinitionStore("forbidden".into()),
            Error::Render("bad".into()),
            Error::FormatConversion("bad yaml".into()),
            Error::SchemaMapping("bad job".into()),
            Error::Submission("quota".into()),
        ];
        for err in errors {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert!(!err.public_message().contains("bad"));
        }
    }
}
