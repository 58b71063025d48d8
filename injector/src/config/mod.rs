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

mod keys;
mod layer;
mod ports;
mod resolver;

pub use keys::ConfigKey;
pub use layer::{ConfigLayer, LayerSource};
pub use ports::{PortList, PortRange};
pub use resolver::{ConfigResolver, resolve};

use std::fmt;
use std::str::FromStr;

use crate::INJECTOR_VERSION;

pub const DEFAULT_PROXY_IMAGE: &str = "gcr.io/linkerd-io/proxy";
pub const DEFAULT_INIT_IMAGE: &str = "gcr.io/linkerd-io/proxy-init";
pub const DEFAULT_CONTROL_PORT: u16 = 4190;
pub const DEFAULT_ADMIN_PORT: u16 = 4191;
pub const DEFAULT_INBOUND_PORT: u16 = 4143;
pub const DEFAULT_OUTBOUND_PORT: u16 = 4140;
pub const DEFAULT_PROXY_UID: i64 = 2102;
pub const DEFAULT_PROXY_LOG_LEVEL: &str = "warn,linkerd2_proxy=info";
pub const DEFAULT_LINKERD_NAMESPACE: &str = "linkerd";
pub const DEFAULT_TRUST_DOMAIN: &str = "cluster.local";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PullPolicy {
    Always,
    #[default]
    IfNotPresent,
    Never,
}

impl FromStr for PullPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Always" => Ok(PullPolicy::Always),
            "IfNotPresent" => Ok(PullPolicy::IfNotPresent),
            "Never" => Ok(PullPolicy::Never),
            _ => Err("expected one of 'Always', 'IfNotPresent', 'Never'".to_string()),
        }
    }
}

impl fmt::Display for PullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PullPolicy::Always => write!(f, "Always"),
            PullPolicy::IfNotPresent => write!(f, "IfNotPresent"),
            PullPolicy::Never => write!(f, "Never"),
        }
    }
}

/// The effective options used to inject one workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionConfig {
    pub proxy_image: String,
    pub init_image: String,
    pub image_pull_policy: PullPolicy,
    pub control_port: u16,
    pub skip_inbound_ports: PortList,
    pub skip_outbound_ports: PortList,
    pub inbound_port: u16,
    pub admin_port: u16,
    pub outbound_port: u16,
    // Quantities stay in their textual form, e.g. `10m` or `10Mi`.
    pub proxy_cpu_request: Option<String>,
    pub proxy_memory_request: Option<String>,
    pub proxy_cpu_limit: Option<String>,
    pub proxy_memory_limit: Option<String>,
    pub proxy_uid: i64,
    pub proxy_log_level: String,
    pub disable_identity: bool,
    pub enable_external_profiles: bool,
    pub linkerd_namespace: String,
    pub linkerd_version: String,
    pub identity_trust_domain: String,
    pub identity_trust_anchors_pem: Option<String>,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        InjectionConfig {
            proxy_image: DEFAULT_PROXY_IMAGE.to_string(),
            init_image: DEFAULT_INIT_IMAGE.to_string(),
            image_pull_policy: PullPolicy::default(),
            control_port: DEFAULT_CONTROL_PORT,
            skip_inbound_ports: PortList::default(),
            skip_outbound_ports: PortList::default(),
            inbound_port: DEFAULT_INBOUND_PORT,
            admin_port: DEFAULT_ADMIN_PORT,
            outbound_port: DEFAULT_OUTBOUND_PORT,
            proxy_cpu_request: None,
            proxy_memory_request: None,
            proxy_cpu_limit: None,
            proxy_memory_limit: None,
            proxy_uid: DEFAULT_PROXY_UID,
            proxy_log_level: DEFAULT_PROXY_LOG_LEVEL.to_string(),
            disable_identity: false,
            enable_external_profiles: false,
            linkerd_namespace: DEFAULT_LINKERD_NAMESPACE.to_string(),
            linkerd_version: INJECTOR_VERSION.to_string(),
            identity_trust_domain: DEFAULT_TRUST_DOMAIN.to_string(),
            identity_trust_anchors_pem: None,
        }
    }
}

impl InjectionConfig {
    /// Renders the value of `key` the way it is written into annotations.
    /// Returns `None` for unset optional values.
    pub fn value_of(&self, key: ConfigKey) -> Option<String> {
        match key {
            ConfigKey::ProxyImage => Some(self.proxy_image.clone()),
            ConfigKey::InitImage => Some(self.init_image.clone()),
            ConfigKey::ImagePullPolicy => Some(self.image_pull_policy.to_string()),
            ConfigKey::ControlPort => Some(self.control_port.to_string()),
            ConfigKey::SkipInboundPorts => Some(self.skip_inbound_ports.to_string()),
            ConfigKey::SkipOutboundPorts => Some(self.skip_outbound_ports.to_string()),
            ConfigKey::InboundPort => Some(self.inbound_port.to_string()),
            ConfigKey::AdminPort => Some(self.admin_port.to_string()),
            ConfigKey::OutboundPort => Some(self.outbound_port.to_string()),
            ConfigKey::ProxyCpuRequest => self.proxy_cpu_request.clone(),
            ConfigKey::ProxyMemoryRequest => self.proxy_memory_request.clone(),
            ConfigKey::ProxyCpuLimit => self.proxy_cpu_limit.clone(),
            ConfigKey::ProxyMemoryLimit => self.proxy_memory_limit.clone(),
            ConfigKey::ProxyUid => Some(self.proxy_uid.to_string()),
            ConfigKey::ProxyLogLevel => Some(self.proxy_log_level.clone()),
            ConfigKey::DisableIdentity => Some(self.disable_identity.to_string()),
            ConfigKey::EnableExternalProfiles => Some(self.enable_external_profiles.to_string()),
            ConfigKey::LinkerdNamespace => Some(self.linkerd_namespace.clone()),
            ConfigKey::LinkerdVersion => Some(self.linkerd_version.clone()),
            ConfigKey::IdentityTrustDomain => Some(self.identity_trust_domain.clone()),
            ConfigKey::IdentityTrustAnchorsPem => self.identity_trust_anchors_pem.clone(),
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
