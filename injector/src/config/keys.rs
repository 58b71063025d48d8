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

use std::fmt;
use std::str::FromStr;

use crate::CONFIG_ANNOTATION_PREFIX;

/// Every configuration option the engine understands.
///
/// The string form is shared by the `config.linkerd.io/<key>` annotations, the CLI
/// flags and the keys of the config file `[defaults]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigKey {
    ProxyImage,
    InitImage,
    ImagePullPolicy,
    ControlPort,
    SkipInboundPorts,
    SkipOutboundPorts,
    InboundPort,
    AdminPort,
    OutboundPort,
    ProxyCpuRequest,
    ProxyMemoryRequest,
    ProxyCpuLimit,
    ProxyMemoryLimit,
    ProxyUid,
    ProxyLogLevel,
    DisableIdentity,
    EnableExternalProfiles,
    LinkerdNamespace,
    LinkerdVersion,
    IdentityTrustDomain,
    IdentityTrustAnchorsPem,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 21] = [
        ConfigKey::ProxyImage,
        ConfigKey::InitImage,
        ConfigKey::ImagePullPolicy,
        ConfigKey::ControlPort,
        ConfigKey::SkipInboundPorts,
        ConfigKey::SkipOutboundPorts,
        ConfigKey::InboundPort,
        ConfigKey::AdminPort,
        ConfigKey::OutboundPort,
        ConfigKey::ProxyCpuRequest,
        ConfigKey::ProxyMemoryRequest,
        ConfigKey::ProxyCpuLimit,
        ConfigKey::ProxyMemoryLimit,
        ConfigKey::ProxyUid,
        ConfigKey::ProxyLogLevel,
        ConfigKey::DisableIdentity,
        ConfigKey::EnableExternalProfiles,
        ConfigKey::LinkerdNamespace,
        ConfigKey::LinkerdVersion,
        ConfigKey::IdentityTrustDomain,
        ConfigKey::IdentityTrustAnchorsPem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::ProxyImage => "proxy-image",
            ConfigKey::InitImage => "init-image",
            ConfigKey::ImagePullPolicy => "image-pull-policy",
            ConfigKey::ControlPort => "control-port",
            ConfigKey::SkipInboundPorts => "skip-inbound-ports",
            ConfigKey::SkipOutboundPorts => "skip-outbound-ports",
            ConfigKey::InboundPort => "inbound-port",
            ConfigKey::AdminPort => "admin-port",
            ConfigKey::OutboundPort => "outbound-port",
            ConfigKey::ProxyCpuRequest => "proxy-cpu-request",
            ConfigKey::ProxyMemoryRequest => "proxy-memory-request",
            ConfigKey::ProxyCpuLimit => "proxy-cpu-limit",
            ConfigKey::ProxyMemoryLimit => "proxy-memory-limit",
            ConfigKey::ProxyUid => "proxy-uid",
            ConfigKey::ProxyLogLevel => "proxy-log-level",
            ConfigKey::DisableIdentity => "disable-identity",
            ConfigKey::EnableExternalProfiles => "enable-external-profiles",
            ConfigKey::LinkerdNamespace => "linkerd-namespace",
            ConfigKey::LinkerdVersion => "linkerd-version",
            ConfigKey::IdentityTrustDomain => "identity-trust-domain",
            ConfigKey::IdentityTrustAnchorsPem => "identity-trust-anchors-pem",
        }
    }

    /// Global keys describe the control plane rather than a single workload and are
    /// only taken from the config file and the cluster defaults.
    pub fn is_global_only(&self) -> bool {
        matches!(
            self,
            ConfigKey::IdentityTrustDomain | ConfigKey::IdentityTrustAnchorsPem
        )
    }

    pub fn annotation(&self) -> String {
        format!("{CONFIG_ANNOTATION_PREFIX}{}", self.as_str())
    }

    /// Maps a `config.linkerd.io/<key>` annotation onto its key.
    pub fn from_annotation(annotation: &str) -> Option<ConfigKey> {
        annotation
            .strip_prefix(CONFIG_ANNOTATION_PREFIX)
            .and_then(|key| key.parse().ok())
            .filter(|key: &ConfigKey| !key.is_global_only())
    }
}

impl FromStr for ConfigKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ConfigKey::ALL
            .iter()
            .find(|key| key.as_str() == value)
            .copied()
            .ok_or_else(|| format!("unknown configuration key '{value}'"))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//////////////////////////////////////////////////////////////////////////////
//                 ########  #######    #########  #########                //
//                    ##     ##        ##             ##                    //
//                    ##     #####     #########      ##                    //
//                    ##     ##                ##     ##                    //
//                    ##     #######   #########      ##                    //
//////////////////////////////////////////////////////////////////////////////
