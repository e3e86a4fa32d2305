use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

use crate::{Error, Result};

lazy_static! {
    pub static ref ALERTS_RECEIVED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "alert_receiver_alerts_received_total",
        "Total number of decoded alert deliveries.",
        &["status"]
    )
    .unwrap();
    pub static ref ALERTS_IGNORED_TOTAL: IntCounter = register_int_counter!(
        "alert_receiver_alerts_ignored_total",
        "Alert deliveries without a job configured for their status."
    )
    .unwrap();
    pub static ref JOBS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "alert_receiver_jobs_created_total",
        "Jobs successfully created."
    )
    .unwrap();
    pub static ref PIPELINE_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "alert_receiver_pipeline_failures_total",
        "Alert deliveries that failed, by pipeline stage.",
        &["stage"]
    )
    .unwrap();
}

pub fn record_received(status: &str) {
    // Keep the label set bounded.
    let status = match status {
        "firing" | "resolved" => status,
        _ => "other",
    };
    ALERTS_RECEIVED_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_failure(err: &Error) {
    PIPELINE_FAILURES_TOTAL.with_label_values(&[err.stage()]).inc();
}

// Gather metrics from the default registry for exposition
pub fn gather_metrics() -> Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
    String::from_utf8(buffer)
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}
