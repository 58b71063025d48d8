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

use k8s_openapi::api::core::v1::{
    Capabilities, Container, ContainerPort, EmptyDirVolumeSource, EnvVar, EnvVarSource,
    HTTPGetAction, ObjectFieldSelector, Probe, ResourceRequirements, SecurityContext, Volume,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::config::{InjectionConfig, PortList};
use crate::{IDENTITY_VOLUME_NAME, INIT_CONTAINER_NAME, PROXY_CONTAINER_NAME};

pub const IDENTITY_END_ENTITY_DIR: &str = "/var/run/linkerd/identity/end-entity";
const SERVICE_ACCOUNT_TOKEN_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

const INBOUND_PORT_NAME: &str = "linkerd-proxy";
const ADMIN_PORT_NAME: &str = "linkerd-admin";
const DESTINATION_PORT: u16 = 8086;
const IDENTITY_PORT: u16 = 8080;
const KEEPALIVE: &str = "10000ms";
const LIVENESS_PATH: &str = "/metrics";
const LIVENESS_INITIAL_DELAY: i32 = 10;
const READINESS_PATH: &str = "/ready";
const READINESS_INITIAL_DELAY: i32 = 2;
const TERMINATION_MESSAGE_POLICY: &str = "FallbackToLogsOnError";
const MEMORY_MEDIUM: &str = "Memory";

/// Appends the version as tag unless the image already names a tag or a digest.
pub fn image_reference(image: &str, version: &str) -> String {
    let last_component = image.rsplit('/').next().unwrap_or(image);
    if image.contains('@') || last_component.contains(':') || version.is_empty() {
        image.to_string()
    } else {
        format!("{image}:{version}")
    }
}

fn env(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.into()),
        value_from: None,
    }
}

fn env_from_field(name: &str, field_path: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: None,
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                api_version: None,
                field_path: field_path.to_string(),
            }),
            ..Default::default()
        }),
    }
}

fn identity_env(config: &InjectionConfig) -> Vec<EnvVar> {
    let namespace = &config.linkerd_namespace;
    let identity_name = "serviceaccount.identity.$(_l5d_ns).$(_l5d_trustdomain)";
    vec![
        env("LINKERD2_PROXY_IDENTITY_DIR", IDENTITY_END_ENTITY_DIR),
        env(
            "LINKERD2_PROXY_IDENTITY_TRUST_ANCHORS",
            config.identity_trust_anchors_pem.clone().unwrap_or_default(),
        ),
        env("LINKERD2_PROXY_IDENTITY_TOKEN_FILE", SERVICE_ACCOUNT_TOKEN_FILE),
        env(
            "LINKERD2_PROXY_IDENTITY_SVC_ADDR",
            format!("linkerd-identity.{namespace}.svc.cluster.local:{IDENTITY_PORT}"),
        ),
        env_from_field("_pod_sa", "spec.serviceAccountName"),
        env("_l5d_ns", namespace.as_str()),
        env("_l5d_trustdomain", config.identity_trust_domain.as_str()),
        env(
            "LINKERD2_PROXY_IDENTITY_LOCAL_NAME",
            format!("$(_pod_sa).$(_pod_ns).{identity_name}"),
        ),
        env(
            "LINKERD2_PROXY_IDENTITY_SVC_NAME",
            format!("linkerd-identity.$(_l5d_ns).{identity_name}"),
        ),
        env(
            "LINKERD2_PROXY_DESTINATION_SVC_NAME",
            format!("linkerd-controller.$(_l5d_ns).{identity_name}"),
        ),
    ]
}

fn proxy_env(config: &InjectionConfig) -> Vec<EnvVar> {
    let profile_suffixes = if config.enable_external_profiles {
        "."
    } else {
        "svc.cluster.local."
    };

    let mut env_vars = vec![
        env("LINKERD2_PROXY_LOG", config.proxy_log_level.as_str()),
        env(
            "LINKERD2_PROXY_DESTINATION_SVC_ADDR",
            format!(
                "linkerd-destination.{}.svc.cluster.local:{DESTINATION_PORT}",
                config.linkerd_namespace
            ),
        ),
        env(
            "LINKERD2_PROXY_CONTROL_LISTEN_ADDR",
            format!("0.0.0.0:{}", config.control_port),
        ),
        env(
            "LINKERD2_PROXY_ADMIN_LISTEN_ADDR",
            format!("0.0.0.0:{}", config.admin_port),
        ),
        env(
            "LINKERD2_PROXY_OUTBOUND_LISTEN_ADDR",
            format!("127.0.0.1:{}", config.outbound_port),
        ),
        env(
            "LINKERD2_PROXY_INBOUND_LISTEN_ADDR",
            format!("0.0.0.0:{}", config.inbound_port),
        ),
        env("LINKERD2_PROXY_DESTINATION_PROFILE_SUFFIXES", profile_suffixes),
        env("LINKERD2_PROXY_INBOUND_ACCEPT_KEEPALIVE", KEEPALIVE),
        env("LINKERD2_PROXY_OUTBOUND_CONNECT_KEEPALIVE", KEEPALIVE),
        env_from_field("_pod_ns", "metadata.namespace"),
        env("LINKERD2_PROXY_DESTINATION_CONTEXT", "ns:$(_pod_ns)"),
    ];

    if config.disable_identity {
        env_vars.push(env("LINKERD2_PROXY_IDENTITY_DISABLED", "disabled"));
    } else {
        env_vars.extend(identity_env(config));
    }
    env_vars
}

fn quantities(entries: [(&str, &Option<String>); 2]) -> Option<BTreeMap<String, Quantity>> {
    let map: BTreeMap<String, Quantity> = entries
        .into_iter()
        .filter_map(|(name, value)| Some((name.to_string(), Quantity(value.clone()?))))
        .collect();
    (!map.is_empty()).then_some(map)
}

fn proxy_resources(config: &InjectionConfig) -> Option<ResourceRequirements> {
    let requests = quantities([
        ("cpu", &config.proxy_cpu_request),
        ("memory", &config.proxy_memory_request),
    ]);
    let limits = quantities([
        ("cpu", &config.proxy_cpu_limit),
        ("memory", &config.proxy_memory_limit),
    ]);
    if requests.is_none() && limits.is_none() {
        return None;
    }
    Some(ResourceRequirements {
        limits,
        requests,
        ..Default::default()
    })
}

fn admin_probe(path: &str, port: u16, initial_delay_seconds: i32) -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(path.to_string()),
            port: IntOrString::Int(i32::from(port)),
            ..Default::default()
        }),
        initial_delay_seconds: Some(initial_delay_seconds),
        ..Default::default()
    }
}

fn container_port(name: &str, port: u16) -> ContainerPort {
    ContainerPort {
        name: Some(name.to_string()),
        container_port: i32::from(port),
        ..Default::default()
    }
}

pub fn proxy_container(config: &InjectionConfig) -> Container {
    let volume_mounts = (!config.disable_identity).then(|| {
        vec![VolumeMount {
            name: IDENTITY_VOLUME_NAME.to_string(),
            mount_path: IDENTITY_END_ENTITY_DIR.to_string(),
            ..Default::default()
        }]
    });

    Container {
        name: PROXY_CONTAINER_NAME.to_string(),
        image: Some(image_reference(&config.proxy_image, &config.linkerd_version)),
        image_pull_policy: Some(config.image_pull_policy.to_string()),
        ports: Some(vec![
            container_port(INBOUND_PORT_NAME, config.inbound_port),
            container_port(ADMIN_PORT_NAME, config.admin_port),
        ]),
        env: Some(proxy_env(config)),
        liveness_probe: Some(admin_probe(
            LIVENESS_PATH,
            config.admin_port,
            LIVENESS_INITIAL_DELAY,
        )),
        readiness_probe: Some(admin_probe(
            READINESS_PATH,
            config.admin_port,
            READINESS_INITIAL_DELAY,
        )),
        resources: proxy_resources(config),
        security_context: Some(SecurityContext {
            run_as_user: Some(config.proxy_uid),
            ..Default::default()
        }),
        termination_message_policy: Some(TERMINATION_MESSAGE_POLICY.to_string()),
        volume_mounts,
        ..Default::default()
    }
}

pub fn init_container(config: &InjectionConfig) -> Container {
    let reserved: PortList = [config.control_port, config.admin_port]
        .into_iter()
        .collect();
    let inbound_ports_to_ignore = reserved.union(&config.skip_inbound_ports);

    let mut args = vec![
        "--incoming-proxy-port".to_string(),
        config.inbound_port.to_string(),
        "--outgoing-proxy-port".to_string(),
        config.outbound_port.to_string(),
        "--proxy-uid".to_string(),
        config.proxy_uid.to_string(),
        "--inbound-ports-to-ignore".to_string(),
        inbound_ports_to_ignore.to_string(),
    ];
    if !config.skip_outbound_ports.is_empty() {
        args.push("--outbound-ports-to-ignore".to_string());
        args.push(config.skip_outbound_ports.to_string());
    }

    Container {
        name: INIT_CONTAINER_NAME.to_string(),
        image: Some(image_reference(&config.init_image, &config.linkerd_version)),
        image_pull_policy: Some(config.image_pull_policy.to_string()),
        args: Some(args),
        security_context: Some(SecurityContext {
            capabilities: Some(Capabilities {
                add: Some(vec!["NET_ADMIN".to_string()]),
                drop: None,
            }),
            privileged: Some(false),
            run_as_non_root: Some(false),
            run_as_user: Some(0),
            ..Default::default()
        }),
        termination_message_policy: Some(TERMINATION_MESSAGE_POLICY.to_string()),
        ..Default::default()
    }
}

/// In-memory volume holding the proxy's end-entity certificate.
pub fn identity_volume() -> Volume {
    Volume {
        name: IDENTITY_VOLUME_NAME.to_string(),
        empty_dir: Some(EmptyDirVolumeSource {
            medium: Some(MEMORY_MEDIUM.to_string()),
            size_limit: None,
        }),
        ..Default::default()
    }
}

//////////////////////////////////////////////////////////////////////////////
//                 ########  #######    #########  #########                //
//                    ##     ##        ##             ##                    //
//                    ##     #####     #########      ##                    //
//                    ##     ##                ##     ##                    //
//                    ##     #######   #########      ##                    //
//////////////////////////////////////////////////////////////////////////////
