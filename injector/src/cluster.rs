// Copyright (c) 2025 Elektrobit Automotive GmbH
//
// This program and the accompanying materials are made available under the
// terms of the Apache License, Version 2.0 which is available at
// https://www.apache.org/licenses/LICENSE-2.0.
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the
// License for the specific language governing permissions and limitations
// under the License.
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace};
use kube::{Api, Client};
use serde_yaml::Value;

use crate::config::{ConfigLayer, LayerSource};
use crate::error::ConfigError;

pub const LINKERD_CONFIG_MAP: &str = "linkerd-config";
pub const PROXY_DEFAULTS_KEY: &str = "proxy";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    Client(String),
    InvalidDefaults(String),
    Config(ConfigError),
}

impl fmt::Display for ClusterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterError::Client(message) => {
                write!(f, "Could not reach the cluster: '{message}'")
            }
            ClusterError::InvalidDefaults(message) => write!(
                f,
                "Could not read '{PROXY_DEFAULTS_KEY}' of config map '{LINKERD_CONFIG_MAP}': '{message}'"
            ),
            ClusterError::Config(error) => write!(f, "{error}"),
        }
    }
}

impl From<kube::Error> for ClusterError {
    fn from(value: kube::Error) -> Self {
        ClusterError::Client(value.to_string())
    }
}

impl From<ConfigError> for ClusterError {
    fn from(value: ConfigError) -> Self {
        ClusterError::Config(value)
    }
}

/// Read-only view on the cluster used by the front doors.
#[async_trait]
pub trait ClusterLookup: Send + Sync {
    /// Annotations of `namespace`; empty when the namespace does not exist.
    async fn namespace_annotations(
        &self,
        namespace: &str,
    ) -> Result<BTreeMap<String, String>, ClusterError>;

    /// The cluster defaults layer stored in the control plane namespace.
    async fn proxy_defaults(&self, linkerd_namespace: &str) -> Result<ConfigLayer, ClusterError>;
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Parses the `proxy` entry of the control plane config map, a YAML mapping of
/// config keys to values.
pub fn parse_proxy_defaults(text: &str) -> Result<ConfigLayer, ClusterError> {
    let value: Value = serde_yaml::from_str(text)
        .map_err(|err| ClusterError::InvalidDefaults(err.to_string()))?;
    let mapping = match value {
        Value::Null => return Ok(ConfigLayer::new(LayerSource::Cluster)),
        Value::Mapping(mapping) => mapping,
        _ => {
            return Err(ClusterError::InvalidDefaults(
                "expected a mapping of configuration keys".to_string(),
            ));
        }
    };

    let pairs = mapping.iter().filter_map(|(key, value)| {
        let key = key.as_str()?;
        match scalar_to_string(value) {
            Some(value) => Some((key.to_owned(), value)),
            None => {
                log::warn!("Ignoring non scalar cluster default '{key}'.");
                None
            }
        }
    });
    ConfigLayer::from_pairs(LayerSource::Cluster, pairs).map_err(ClusterError::from)
}

pub struct KubeClusterLookup {
    client: Client,
}

impl KubeClusterLookup {
    pub fn new(client: Client) -> Self {
        KubeClusterLookup { client }
    }

    /// Connects with the local kubeconfig or the in-cluster service account.
    pub async fn try_default() -> Result<Self, ClusterError> {
        Ok(KubeClusterLookup::new(Client::try_default().await?))
    }
}

#[async_trait]
impl ClusterLookup for KubeClusterLookup {
    async fn namespace_annotations(
        &self,
        namespace: &str,
    ) -> Result<BTreeMap<String, String>, ClusterError> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let annotations = namespaces
            .get_opt(namespace)
            .await?
            .and_then(|namespace| namespace.metadata.annotations)
            .unwrap_or_default();
        log::debug!(
            "Namespace '{namespace}' carries {} annotation(s).",
            annotations.len()
        );
        Ok(annotations)
    }

    async fn proxy_defaults(&self, linkerd_namespace: &str) -> Result<ConfigLayer, ClusterError> {
        let config_maps: Api<ConfigMap> = Api::namespaced(self.client.clone(), linkerd_namespace);
        let proxy_defaults = config_maps
            .get_opt(LINKERD_CONFIG_MAP)
            .await?
            .and_then(|config_map| config_map.data)
            .and_then(|mut data| data.remove(PROXY_DEFAULTS_KEY));

        match proxy_defaults {
            Some(text) => parse_proxy_defaults(&text),
            None => {
                log::info!(
                    "No cluster defaults found in '{linkerd_namespace}/{LINKERD_CONFIG_MAP}'."
                );
                Ok(ConfigLayer::new(LayerSource::Cluster))
            }
        }
    }
}

//////////////////////////////////////////////////////////////////////////////
//                 ########  #######    #########  #########                //
//                    ##     ##        ##             ##                    //
//                    ##     #####     #########      ##                    //
//                    ##     ##                ##     ##                    //
//                    ##     #######   #########      ##                    //
//////////////////////////////////////////////////////////////////////////////
