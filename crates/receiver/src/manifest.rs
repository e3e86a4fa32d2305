//! Rendered task definition → `batch/v1` Job.

use k8s_openapi::api::batch::v1::Job;
use serde_json::Value;

use crate::{Error, Result};

/// Decode a rendered YAML task definition into a Job.
///
/// Conversion happens in two stages so the two failure kinds stay distinct: YAML syntax
/// errors become [`Error::FormatConversion`], and a tree that does not fit the Job schema
/// becomes [`Error::SchemaMapping`]. No semantic validation is done; the API server is the
/// judge of whether the Job makes sense.
pub fn decode_job(rendered: &str) -> Result<Job> {
    let tree = yaml_to_json(rendered)?;
    serde_json::from_value(tree).map_err(|e| Error::SchemaMapping(e.to_string()))
}

/// Parse YAML text into a JSON-compatible tree.
pub fn yaml_to_json(document: &str) -> Result<Value> {
    serde_yaml::from_str(document).map_err(|e| Error::FormatConversion(e.to_string()))
}
