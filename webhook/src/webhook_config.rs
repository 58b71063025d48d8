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
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use injector::config::{ConfigLayer, LayerSource};
use serde::{Deserialize, Deserializer};
use toml::{Value, from_str};

use crate::cli::Arguments;

const CONFIG_VERSION: &str = "v1";
pub const DEFAULT_WEBHOOK_CONFIG_FILE_PATH: &str = "/etc/linkerd/inject-webhook.conf";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10000;

#[cfg(not(test))]
use std::fs::read_to_string;

// This function is used in order to facilitate testing
#[cfg(test)]
fn read_to_string(file_path_content: &str) -> std::io::Result<String> {
    Ok(file_path_content.to_string())
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ConversionErrors {
    WrongVersion(String),
    InvalidWebhookConfig(String),
    MissingCertificates(String),
}

impl fmt::Display for ConversionErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionErrors::WrongVersion(msg) => {
                write!(f, "Wrong version: {}", msg)
            }
            ConversionErrors::InvalidWebhookConfig(msg) => {
                write!(
                    f,
                    "Webhook Config could not have been parsed due to: {}",
                    msg
                )
            }
            ConversionErrors::MissingCertificates(msg) => {
                write!(f, "Missing certificates: {}", msg)
            }
        }
    }
}

pub fn get_default_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8443))
}

fn get_default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn convert_to_socket_address<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;

    s.parse::<SocketAddr>().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct WebhookConfig {
    pub version: String,
    #[serde(deserialize_with = "convert_to_socket_address")]
    #[serde(default = "get_default_address")]
    pub address: SocketAddr,
    #[serde(default)]
    pub insecure: Option<bool>,
    pub crt_pem: Option<String>,
    pub key_pem: Option<String>,
    #[serde(default = "get_default_request_timeout")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub ignore_cluster: bool,
    #[serde(default)]
    defaults: BTreeMap<String, Value>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        WebhookConfig {
            version: CONFIG_VERSION.to_string(),
            address: get_default_address(),
            insecure: Some(false),
            crt_pem: None,
            key_pem: None,
            request_timeout_ms: get_default_request_timeout(),
            ignore_cluster: false,
            defaults: BTreeMap::new(),
        }
    }
}

impl WebhookConfig {
    pub fn from_file(file_path: PathBuf) -> Result<WebhookConfig, ConversionErrors> {
        let file_path = file_path.to_string_lossy().to_string();
        let webhook_config_content = read_to_string(&file_path)
            .map_err(|err| ConversionErrors::InvalidWebhookConfig(err.to_string()))?;
        let webhook_config: WebhookConfig = from_str(&webhook_config_content)
            .map_err(|err| ConversionErrors::InvalidWebhookConfig(err.to_string()))?;

        if webhook_config.version != CONFIG_VERSION {
            return Err(ConversionErrors::WrongVersion(webhook_config.version));
        }

        Ok(webhook_config)
    }

    /// An explicitly given file must exist, the default one is optional.
    pub fn load(config_path: Option<&str>) -> Result<WebhookConfig, ConversionErrors> {
        match config_path {
            Some(path) => WebhookConfig::from_file(PathBuf::from(path)),
            None if Path::new(DEFAULT_WEBHOOK_CONFIG_FILE_PATH).exists() => {
                WebhookConfig::from_file(PathBuf::from(DEFAULT_WEBHOOK_CONFIG_FILE_PATH))
            }
            None => Ok(WebhookConfig::default()),
        }
    }

    pub fn update_with_args(&mut self, args: &Arguments) {
        if let Some(addr) = &args.addr {
            self.address = *addr;
        }
        if args.insecure {
            self.insecure = Some(true);
        }
        if let Some(crt_pem_path) = &args.crt_pem {
            self.crt_pem = Some(crt_pem_path.to_owned());
        }
        if let Some(key_pem_path) = &args.key_pem {
            self.key_pem = Some(key_pem_path.to_owned());
        }
        if let Some(request_timeout_ms) = args.request_timeout_ms {
            self.request_timeout_ms = request_timeout_ms;
        }
        if args.ignore_cluster {
            self.ignore_cluster = true;
        }
    }

    /// The `[defaults]` table as the config-file layer.
    pub fn defaults_layer(&self) -> Result<ConfigLayer, ConversionErrors> {
        let mut pairs = Vec::with_capacity(self.defaults.len());
        for (key, value) in &self.defaults {
            let value = match value {
                Value::String(text) => text.clone(),
                Value::Integer(number) => number.to_string(),
                Value::Boolean(flag) => flag.to_string(),
                _ => {
                    return Err(ConversionErrors::InvalidWebhookConfig(format!(
                        "default '{key}' must be a string, integer or boolean"
                    )));
                }
            };
            pairs.push((key, value));
        }
        ConfigLayer::from_pairs(LayerSource::ConfigFile, pairs)
            .map_err(|err| ConversionErrors::InvalidWebhookConfig(err.to_string()))
    }

    /// Certificate and key paths, or `None` when serving plain HTTP.
    pub fn tls_files(&self) -> Result<Option<(String, String)>, ConversionErrors> {
        if self.insecure.unwrap_or_default() {
            return Ok(None);
        }
        match (&self.crt_pem, &self.key_pem) {
            (Some(crt_pem), Some(key_pem)) => Ok(Some((crt_pem.clone(), key_pem.clone()))),
            _ => Err(ConversionErrors::MissingCertificates(
                "crt_pem and key_pem are required unless insecure is set".to_string(),
            )),
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

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::path::PathBuf;

    use injector::config::{ConfigKey, LayerSource};

    use super::{ConversionErrors, DEFAULT_REQUEST_TIMEOUT_MS, WebhookConfig};
    use crate::cli::Arguments;

    const TEST_SOCKET_ADDRESS: &str = "127.0.0.1:9443";
    const CRT_PEM_PATH: &str = "some_path_to_crt_pem/crt.pem";
    const KEY_PEM_PATH: &str = "some_path_to_key_pem/key.pem";

    #[test]
    fn utest_default_webhook_config() {
        let default_webhook_config = WebhookConfig::default();

        assert_eq!(
            default_webhook_config.address,
            "0.0.0.0:8443".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(default_webhook_config.insecure, Some(false));
        assert_eq!(
            default_webhook_config.request_timeout_ms,
            DEFAULT_REQUEST_TIMEOUT_MS
        );
        assert!(default_webhook_config.defaults_layer().unwrap().is_empty());
    }

    #[test]
    fn utest_webhook_config_wrong_version() {
        let webhook_config_content: &str = r"#
        version = 'v2'
        #";

        let webhook_config = WebhookConfig::from_file(PathBuf::from(webhook_config_content));

        assert_eq!(
            webhook_config,
            Err(ConversionErrors::WrongVersion("v2".to_string()))
        );
    }

    #[test]
    fn utest_webhook_config_from_file() {
        let webhook_config_content = format!(
            r"#
        version = 'v1'
        address = '{TEST_SOCKET_ADDRESS}'
        crt_pem = '{CRT_PEM_PATH}'
        key_pem = '{KEY_PEM_PATH}'
        request_timeout_ms = 2500
        [defaults]
        proxy-image = 'registry.local/proxy'
        proxy-uid = 2102
        #"
        );

        let webhook_config =
            WebhookConfig::from_file(PathBuf::from(webhook_config_content.as_str())).unwrap();

        assert_eq!(
            webhook_config.address,
            TEST_SOCKET_ADDRESS.parse::<SocketAddr>().unwrap()
        );
        assert_eq!(webhook_config.request_timeout_ms, 2500);
        assert_eq!(
            webhook_config.tls_files(),
            Ok(Some((CRT_PEM_PATH.to_string(), KEY_PEM_PATH.to_string())))
        );

        let layer = webhook_config.defaults_layer().unwrap();
        assert_eq!(layer.source(), LayerSource::ConfigFile);
        assert_eq!(layer.get(ConfigKey::ProxyImage), Some("registry.local/proxy"));
        assert_eq!(layer.get(ConfigKey::ProxyUid), Some("2102"));
    }

    #[test]
    fn utest_webhook_config_invalid_defaults() {
        let webhook_config = WebhookConfig::from_file(PathBuf::from(
            "version = 'v1'\n[defaults]\nimage-pull-policy = 'Sometimes'\n",
        ))
        .unwrap();

        assert!(matches!(
            webhook_config.defaults_layer(),
            Err(ConversionErrors::InvalidWebhookConfig(_))
        ));
    }

    #[test]
    fn utest_webhook_config_update_with_args() {
        let mut webhook_config = WebhookConfig::default();
        let args = Arguments {
            addr: Some(TEST_SOCKET_ADDRESS.parse().unwrap()),
            insecure: true,
            request_timeout_ms: Some(500),
            ignore_cluster: true,
            ..Default::default()
        };

        webhook_config.update_with_args(&args);

        assert_eq!(
            webhook_config.address,
            TEST_SOCKET_ADDRESS.parse::<SocketAddr>().unwrap()
        );
        assert_eq!(webhook_config.request_timeout_ms, 500);
        assert!(webhook_config.ignore_cluster);
        assert_eq!(webhook_config.tls_files(), Ok(None));
    }

    #[test]
    fn utest_webhook_config_missing_certificates() {
        let webhook_config = WebhookConfig {
            crt_pem: Some(CRT_PEM_PATH.to_string()),
            ..Default::default()
        };

        assert!(matches!(
            webhook_config.tls_files(),
            Err(ConversionErrors::MissingCertificates(_))
        ));
    }
}
