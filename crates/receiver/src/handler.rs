//! Alert → Job pipeline.
//!
//! For each delivery: decode the payload, pick the task key for the status transition,
//! fetch the definitions, render the selected template with the common labels, decode the
//! result into a Job and submit it. A failing stage stops the pipeline; nothing is retried.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Level};

use crate::{
    alert::AlertEvent,
    config::{Config, KubeConfig, RenderFailure},
    definitions::DefinitionStore,
    jobs::JobSubmitter,
    manifest, metrics, template, Error, Result,
};

/// Result of handling one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A Job was created; carries the name the API server generated.
    Submitted { job_name: String },
    /// No job is configured for this status transition.
    Ignored,
}

pub struct AlertHandler {
    definitions: Arc<dyn DefinitionStore>,
    jobs: Arc<dyn JobSubmitter>,
    kube: KubeConfig,
    render_failure: RenderFailure,
}

impl AlertHandler {
    pub fn new(
        config: &Config,
        definitions: Arc<dyn DefinitionStore>,
        jobs: Arc<dyn JobSubmitter>,
    ) -> Self {
        Self {
            definitions,
            jobs,
            kube: config.kube.clone(),
            render_failure: config.render_failure,
        }
    }

    /// Handle one raw webhook body.
    pub async fn handle(&self, body: &[u8]) -> Result<Outcome> {
        let event = match AlertEvent::from_slice(body) {
            Ok(event) => event,
            Err(e) => {
                error!("Error during decoding message: {}", e);
                metrics::record_failure(&e);
                return Err(e);
            }
        };
        self.handle_event(&event).await
    }

    pub async fn handle_event(&self, event: &AlertEvent) -> Result<Outcome> {
        metrics::record_received(&event.status);
        info!("Alert received: {}[{}]", event.alert_name(), event.status);

        for (name, value) in &event.common_labels {
            debug!("Label: {} = {}", name, value);
        }
        for (name, value) in &event.common_annotations {
            debug!("Annotation: {} = {}", name, value);
        }

        match event.task_key() {
            Some(key) => {
                let job_name = self.create_response_job(&event.common_labels, key).await?;
                Ok(Outcome::Submitted { job_name })
            }
            None => {
                warn!(
                    "Received alert {}[{}] without a job configured for this status, omitting response",
                    event.alert_name(),
                    event.status
                );
                metrics::ALERTS_IGNORED_TOTAL.inc();
                Ok(Outcome::Ignored)
            }
        }
    }

    /// Fetch, render, decode and submit the job definition stored under `key`.
    pub async fn create_response_job(
        &self,
        labels: &BTreeMap<String, String>,
        key: &str,
    ) -> Result<String> {
        let result = self.run_pipeline(labels, key).await;
        if let Err(e) = &result {
            error!(
                "Failed to create job {} (definitions {}/{}, job namespace {}): {}",
                key,
                self.kube.configmap_namespace,
                self.kube.definitions_configmap,
                self.kube.job_namespace,
                e
            );
            metrics::record_failure(e);
        }
        result
    }

    async fn run_pipeline(&self, labels: &BTreeMap<String, String>, key: &str) -> Result<String> {
        let definitions = self
            .definitions
            .fetch(&self.kube.configmap_namespace, &self.kube.definitions_configmap)
            .await?;
        debug!("ConfigMap is retrieved");

        let definition = definitions
            .get(key)
            .ok_or_else(|| Error::DefinitionNotFound {
                key: key.to_string(),
                namespace: self.kube.configmap_namespace.clone(),
                collection: self.kube.definitions_configmap.clone(),
            })?;

        let rendered = self.render(definition, labels, key)?;
        let job = manifest::decode_job(&rendered)?;

        info!("Creating job {} in namespace {}", key, self.kube.job_namespace);
        let created = self.jobs.submit(job, &self.kube.job_namespace).await?;

        let job_name = created.metadata.name.clone().unwrap_or_default();
        info!("Created job {}/{}", self.kube.job_namespace, job_name);
        metrics::JOBS_CREATED_TOTAL.inc();

        if tracing::enabled!(Level::DEBUG) {
            if let Ok(pretty) = serde_json::to_string_pretty(&created) {
                debug!("{}", pretty);
            }
        }

        Ok(job_name)
    }

    fn render(
        &self,
        definition: &str,
        labels: &BTreeMap<String, String>,
        key: &str,
    ) -> Result<String> {
        let mut output = Vec::new();
        if let Err(e) = template::render_template_to(definition, labels, &mut output) {
            match self.render_failure {
                RenderFailure::Strict => return Err(e),
                RenderFailure::Lenient => {
                    error!("Job definition {} did not fully render, continuing: {}", key, e);
                    metrics::record_failure(&e);
                }
            }
        }
        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}
