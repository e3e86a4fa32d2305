//! Job submission to the Kubernetes API.

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use kube::{
    api::{Api, PostParams},
    Client,
};

#[cfg(test)]
use mockall::automock;

use crate::{Error, Result};

/// Creates Jobs. Task definitions carry `generateName`, so the API server picks the final
/// name and repeated deliveries never collide.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    /// Create `job` in `namespace` and return the object as stored by the API server.
    async fn submit(&self, job: Job, namespace: &str) -> Result<Job>;
}

pub struct KubeJobSubmitter {
    client: Client,
}

impl KubeJobSubmitter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobSubmitter for KubeJobSubmitter {
    async fn submit(&self, job: Job, namespace: &str) -> Result<Job> {
        let jobs: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        jobs.create(&PostParams::default(), &job)
            .await
            .map_err(|e| Error::Submission(e.to_string()))
    }
}
