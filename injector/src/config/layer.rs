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

use once_cell::sync::Lazy;
use regex::Regex;

use super::ports::parse_port;
use super::{ConfigKey, InjectionConfig};
use crate::error::ConfigError;

// Same shape the API server accepts for resource quantities.
static QUANTITY_REGEX: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+|[numkMGTPE]|[KMGTPE]i)?$"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerSource {
    Defaults,
    ConfigFile,
    Cluster,
    Namespace,
    Pod,
    Override,
}

impl fmt::Display for LayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerSource::Defaults => write!(f, "built-in"),
            LayerSource::ConfigFile => write!(f, "defaults"),
            LayerSource::Cluster => write!(f, "cluster"),
            LayerSource::Namespace => write!(f, "namespace"),
            LayerSource::Pod => write!(f, "pod"),
            LayerSource::Override => write!(f, "override"),
        }
    }
}

/// One precedence layer: the subset of keys it sets, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    source: LayerSource,
    values: BTreeMap<ConfigKey, String>,
}

impl ConfigLayer {
    pub fn new(source: LayerSource) -> Self {
        ConfigLayer {
            source,
            values: BTreeMap::new(),
        }
    }

    pub fn source(&self) -> LayerSource {
        self.source
    }

    /// Validates `value` for `key` and stores it. A later `set` of the same key wins.
    pub fn set(&mut self, key: ConfigKey, value: impl Into<String>) -> Result<(), ConfigError> {
        let value = value.into();
        let mut scratch = InjectionConfig::default();
        assign(&mut scratch, key, &value).map_err(|reason| ConfigError::InvalidValue {
            key: key.to_string(),
            layer: self.source,
            value: value.clone(),
            reason,
        })?;
        self.values.insert(key, value);
        Ok(())
    }

    /// Builds a layer from `config.linkerd.io/<key>` annotations. Other annotations and
    /// the global-only keys are ignored.
    pub fn from_annotations(
        source: LayerSource,
        annotations: &BTreeMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let mut layer = ConfigLayer::new(source);
        for (annotation, value) in annotations {
            if let Some(key) = ConfigKey::from_annotation(annotation) {
                layer.set(key, value.as_str())?;
            }
        }
        Ok(layer)
    }

    /// Builds a layer from plain `<key> = <value>` pairs as found in the config file
    /// and in the cluster defaults. Unknown keys are ignored.
    pub fn from_pairs<I, K, V>(source: LayerSource, pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut layer = ConfigLayer::new(source);
        for (name, value) in pairs {
            match name.as_ref().parse::<ConfigKey>() {
                Ok(key) => layer.set(key, value)?,
                Err(_) => log::debug!(
                    "Ignoring unknown key '{}' in {source} configuration.",
                    name.as_ref()
                ),
            }
        }
        Ok(layer)
    }

    pub fn is_set(&self, key: ConfigKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, key: ConfigKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = ConfigKey> + '_ {
        self.values.keys().copied()
    }

    /// Writes every value of this layer over `config`.
    pub fn apply_to(&self, config: &mut InjectionConfig) -> Result<(), ConfigError> {
        for (key, value) in &self.values {
            assign(config, *key, value).map_err(|reason| ConfigError::InvalidValue {
                key: key.to_string(),
                layer: self.source,
                value: value.clone(),
                reason,
            })?;
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err("expected a boolean".to_string()),
    }
}

fn parse_uid(value: &str) -> Result<i64, String> {
    match value.trim().parse::<i64>() {
        Ok(uid) if uid >= 0 => Ok(uid),
        _ => Err("expected a non-negative user id".to_string()),
    }
}

fn parse_quantity(value: &str) -> Result<Option<String>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let regex = QUANTITY_REGEX
        .as_ref()
        .map_err(|err| format!("quantity pattern is broken: '{err}'"))?;
    if regex.is_match(value) {
        Ok(Some(value.to_string()))
    } else {
        Err("expected a resource quantity such as '10m' or '64Mi'".to_string())
    }
}

fn parse_log_level(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        Err("the log level must not be empty".to_string())
    } else {
        Ok(value.trim().to_string())
    }
}

fn assign(config: &mut InjectionConfig, key: ConfigKey, value: &str) -> Result<(), String> {
    match key {
        ConfigKey::ProxyImage => config.proxy_image = value.trim().to_string(),
        ConfigKey::InitImage => config.init_image = value.trim().to_string(),
        ConfigKey::ImagePullPolicy => config.image_pull_policy = value.trim().parse()?,
        ConfigKey::ControlPort => config.control_port = parse_port(value)?,
        ConfigKey::SkipInboundPorts => config.skip_inbound_ports = value.parse()?,
        ConfigKey::SkipOutboundPorts => config.skip_outbound_ports = value.parse()?,
        ConfigKey::InboundPort => config.inbound_port = parse_port(value)?,
        ConfigKey::AdminPort => config.admin_port = parse_port(value)?,
        ConfigKey::OutboundPort => config.outbound_port = parse_port(value)?,
        ConfigKey::ProxyCpuRequest => config.proxy_cpu_request = parse_quantity(value)?,
        ConfigKey::ProxyMemoryRequest => config.proxy_memory_request = parse_quantity(value)?,
        ConfigKey::ProxyCpuLimit => config.proxy_cpu_limit = parse_quantity(value)?,
        ConfigKey::ProxyMemoryLimit => config.proxy_memory_limit = parse_quantity(value)?,
        ConfigKey::ProxyUid => config.proxy_uid = parse_uid(value)?,
        ConfigKey::ProxyLogLevel => config.proxy_log_level = parse_log_level(value)?,
        ConfigKey::DisableIdentity => config.disable_identity = parse_bool(value)?,
        ConfigKey::EnableExternalProfiles => config.enable_external_profiles = parse_bool(value)?,
        ConfigKey::LinkerdNamespace => config.linkerd_namespace = value.trim().to_string(),
        ConfigKey::LinkerdVersion => config.linkerd_version = value.trim().to_string(),
        ConfigKey::IdentityTrustDomain => config.identity_trust_domain = value.trim().to_string(),
        ConfigKey::IdentityTrustAnchorsPem => {
            config.identity_trust_anchors_pem =
                Some(value.to_string()).filter(|pem| !pem.trim().is_empty())
        }
    }
    Ok(())
}

//////////////////////////////////////////////////////////////////////////////
//                 ########  #######    #########  #########                //
//                    ##     ##        ##             ##                    //
//                    ##     #####     #########      ##                    //
//                    ##     ##                ##     ##                    //
//                    ##     #######   #########      ##                    //
//////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{ConfigLayer, LayerSource};
    use crate::config::{ConfigKey, InjectionConfig, PullPolicy};
    use crate::error::ConfigError;

    fn annotations(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn utest_layer_from_annotations_ignores_foreign_keys() {
        let layer = ConfigLayer::from_annotations(
            LayerSource::Pod,
            &annotations(&[
                ("config.linkerd.io/proxy-uid", "1337"),
                ("config.linkerd.io/not-a-key", "x"),
                ("team", "blue"),
                ("config.linkerd.io/identity-trust-domain", "example.org"),
            ]),
        )
        .unwrap();

        assert_eq!(layer.keys().collect::<Vec<_>>(), vec![ConfigKey::ProxyUid]);
        assert_eq!(layer.get(ConfigKey::ProxyUid), Some("1337"));
    }

    #[test]
    fn utest_layer_from_pairs_accepts_global_keys() {
        let layer = ConfigLayer::from_pairs(
            LayerSource::ConfigFile,
            [
                ("identity-trust-domain", "example.org"),
                ("unknown", "value"),
            ],
        )
        .unwrap();

        assert!(layer.is_set(ConfigKey::IdentityTrustDomain));
        assert!(!layer.is_set(ConfigKey::ProxyImage));
    }

    #[test]
    fn utest_layer_rejects_malformed_values() {
        let mut layer = ConfigLayer::new(LayerSource::Namespace);

        assert!(layer.set(ConfigKey::InboundPort, "0").is_err());
        assert!(layer.set(ConfigKey::ProxyUid, "-1").is_err());
        assert!(layer.set(ConfigKey::DisableIdentity, "yes").is_err());
        assert!(layer.set(ConfigKey::ImagePullPolicy, "Sometimes").is_err());
        assert!(layer.set(ConfigKey::ProxyCpuLimit, "a lot").is_err());
        assert!(layer.set(ConfigKey::ProxyLogLevel, "  ").is_err());
        assert!(layer.set(ConfigKey::SkipOutboundPorts, "80,x").is_err());
        assert!(layer.is_empty());
    }

    #[test]
    fn utest_layer_error_names_layer_key_and_value() {
        let mut layer = ConfigLayer::new(LayerSource::Override);

        let error = layer.set(ConfigKey::AdminPort, "http").unwrap_err();

        assert!(matches!(
            &error,
            ConfigError::InvalidValue { key, layer: LayerSource::Override, value, .. }
                if key == "admin-port" && value == "http"
        ));
    }

    #[test]
    fn utest_layer_accepts_quantities_verbatim() {
        let mut layer = ConfigLayer::new(LayerSource::Override);
        layer.set(ConfigKey::ProxyCpuRequest, "10m").unwrap();
        layer.set(ConfigKey::ProxyMemoryLimit, "64Mi").unwrap();
        layer.set(ConfigKey::ProxyCpuLimit, "1.5").unwrap();

        let mut config = InjectionConfig::default();
        layer.apply_to(&mut config).unwrap();

        assert_eq!(config.proxy_cpu_request.as_deref(), Some("10m"));
        assert_eq!(config.proxy_memory_limit.as_deref(), Some("64Mi"));
        assert_eq!(config.proxy_cpu_limit.as_deref(), Some("1.5"));
    }

    #[test]
    fn utest_layer_apply_to_overwrites_only_set_fields() {
        let mut layer = ConfigLayer::new(LayerSource::Pod);
        layer.set(ConfigKey::ImagePullPolicy, "Always").unwrap();
        layer.set(ConfigKey::DisableIdentity, "T").unwrap();
        layer.set(ConfigKey::SkipInboundPorts, "345, 234").unwrap();

        let mut config = InjectionConfig::default();
        layer.apply_to(&mut config).unwrap();

        assert_eq!(config.image_pull_policy, PullPolicy::Always);
        assert!(config.disable_identity);
        assert_eq!(config.skip_inbound_ports.to_string(), "234,345");
        assert_eq!(config.proxy_uid, InjectionConfig::default().proxy_uid);
    }
}
