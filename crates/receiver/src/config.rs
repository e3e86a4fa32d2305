use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::{Error, Result};

pub const DEFAULT_DEFINITIONS_CONFIGMAP: &str = "receiver-job-definitions";
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:9270";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// What to do when a task definition fails to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RenderFailure {
    /// Log the failure and keep going with whatever text was produced.
    #[default]
    Lenient,
    /// Abort the request with a server error.
    Strict,
}

/// Command line arguments. Every flag can also be set through the environment.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Create Kubernetes Jobs from Alertmanager webhooks", long_about = None)]
pub struct Args {
    /// Kubernetes namespace where jobs are defined (defaults to the current namespace)
    #[arg(long, env = "CONFIGMAP_NAMESPACE")]
    pub configmap_namespace: Option<String>,

    /// Kubernetes namespace where jobs will be created (defaults to the current namespace)
    #[arg(long, env = "JOB_DESTINATION_NAMESPACE")]
    pub job_destination_namespace: Option<String>,

    /// ConfigMap containing YAML job definitions that support Go templates
    #[arg(long, env = "RESPONSES_CONFIGMAP", default_value = DEFAULT_DEFINITIONS_CONFIGMAP)]
    pub responses_configmap: String,

    /// Address to listen for webhook
    #[arg(long, env = "LISTEN_ADDRESS", default_value = DEFAULT_LISTEN_ADDRESS)]
    pub listen_address: String,

    /// Only log messages with the given severity or above
    #[arg(long, env = "LOG_LEVEL", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Behaviour when a job definition fails to render
    #[arg(long, env = "RENDER_FAILURE", value_enum, default_value_t = RenderFailure::Lenient)]
    pub render_failure: RenderFailure,

    /// Upper bound on the time spent handling one request
    #[arg(long, env = "REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub kube: KubeConfig,
    #[serde(default)]
    pub render_failure: RenderFailure,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    #[serde(default)]
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KubeConfig {
    /// Namespace holding the definitions ConfigMap.
    pub configmap_namespace: String,
    /// Namespace jobs are created in.
    pub job_namespace: String,
    /// Name of the definitions ConfigMap.
    pub definitions_configmap: String,
}

impl Config {
    /// Build the runtime configuration. Namespaces not given explicitly fall back to
    /// `ambient_namespace`, the namespace the receiver itself runs in.
    pub fn from_args(args: Args, ambient_namespace: &str) -> Result<Self> {
        let ambient_namespace = ambient_namespace.trim();
        let resolve = |namespace: Option<String>| {
            namespace
                .map(|ns| ns.trim().to_string())
                .filter(|ns| !ns.is_empty())
                .unwrap_or_else(|| ambient_namespace.to_string())
        };

        let configmap_namespace = resolve(args.configmap_namespace);
        let job_namespace = resolve(args.job_destination_namespace);

        if configmap_namespace.is_empty() {
            return Err(Error::Config(
                "Current kubernetes namespace could not be found; set --configmap-namespace"
                    .to_string(),
            ));
        }
        if job_namespace.is_empty() {
            return Err(Error::Config(
                "Current kubernetes namespace could not be found; set --job-destination-namespace"
                    .to_string(),
            ));
        }

        let definitions_configmap = args.responses_configmap.trim().to_string();
        if definitions_configmap.is_empty() {
            return Err(Error::Config("--responses-configmap must not be empty".to_string()));
        }

        let addr = parse_listen_address(&args.listen_address)?;

        Ok(Config {
            server: ServerConfig {
                addr,
                request_timeout: args.request_timeout_secs.map(Duration::from_secs),
            },
            kube: KubeConfig {
                configmap_namespace,
                job_namespace,
                definitions_configmap,
            },
            render_failure: args.render_failure,
            log_level: args.log_level,
        })
    }
}

/// Accepts `host:port` and the port-only `:port` form.
fn parse_listen_address(address: &str) -> Result<SocketAddr> {
    let address = address.trim();
    let full = if address.starts_with(':') {
        format!("0.0.0.0{}", address)
    } else {
        address.to_string()
    };
    full.parse()
        .map_err(|e| Error::Config(format!("Invalid listen address {}: {}", address, e)))
}
