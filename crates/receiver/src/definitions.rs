//! Task definitions stored in a ConfigMap.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{Api, Client};
use std::collections::BTreeMap;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::{Error, Result};

/// Snapshot of a definitions collection: task key → template text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDefinitions {
    definitions: BTreeMap<String, String>,
}

impl TaskDefinitions {
    pub fn new(definitions: BTreeMap<String, String>) -> Self {
        Self { definitions }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.definitions.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl From<ConfigMap> for TaskDefinitions {
    fn from(config_map: ConfigMap) -> Self {
        Self::new(config_map.data.unwrap_or_default())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TaskDefinitions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Read access to the definitions collection.
///
/// Always fetched fresh, so definitions can be edited without restarting the receiver.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    async fn fetch(&self, namespace: &str, name: &str) -> Result<TaskDefinitions>;
}

pub struct ConfigMapDefinitionStore {
    client: Client,
}

impl ConfigMapDefinitionStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DefinitionStore for ConfigMapDefinitionStore {
    async fn fetch(&self, namespace: &str, name: &str) -> Result<TaskDefinitions> {
        debug!("Retrieving configMap {}/{}", namespace, name);

        let config_maps: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        let config_map = config_maps
            .get(name)
            .await
            .map_err(|e| Error::DefinitionStore(e.to_string()))?;

        let definitions = TaskDefinitions::from(config_map);
        debug!("ConfigMap {}/{} holds {} definitions", namespace, name, definitions.len());
        Ok(definitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[test]
    fn test_definitions_from_config_map() {
        let config_map = ConfigMap {
            metadata: ObjectMeta {
                name: Some("receiver-job-definitions".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(
                "restart_search".to_string(),
                "kind: Job".to_string(),
            )])),
            ..Default::default()
        };

        let definitions = TaskDefinitions::from(config_map);
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions.get("restart_search"), Some("kind: Job"));
        assert_eq!(definitions.get("other"), None);
    }

    #[test]
    fn test_config_map_without_data_is_empty() {
        let definitions = TaskDefinitions::from(ConfigMap::default());
        assert!(definitions.is_empty());
    }
}
