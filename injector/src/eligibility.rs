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

use serde_yaml::Value;

use crate::document::{Object, Path};
use crate::scanner::WorkloadRef;
use crate::{
    INIT_CONTAINER_NAME, INJECT_ANNOTATION, INJECT_DISABLED, PROXY_CONTAINER_NAME,
    PROXY_VERSION_ANNOTATION,
};

pub const HOST_NETWORK_CONFLICT: &str = "hostNetwork is enabled";
pub const UID_COLLISION_CONFLICT: &str = "uid collision";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionDecision {
    Inject,
    SkipAlreadyInjected,
    SkipOptedOut,
    SkipUnsupportedKind,
    Conflict(String),
}

impl InjectionDecision {
    pub fn is_inject(&self) -> bool {
        matches!(self, InjectionDecision::Inject)
    }
}

impl fmt::Display for InjectionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectionDecision::Inject => write!(f, "injected"),
            InjectionDecision::SkipAlreadyInjected => write!(f, "skipped: already injected"),
            InjectionDecision::SkipOptedOut => write!(f, "skipped: injection disabled"),
            InjectionDecision::SkipUnsupportedKind => write!(f, "skipped: unsupported kind"),
            InjectionDecision::Conflict(reason) => write!(f, "not injected: {reason}"),
        }
    }
}

/// Everything the gate looks at for one workload.
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    pub document: &'a Object,
    pub workload: Option<&'a WorkloadRef>,
    pub namespace_annotations: &'a BTreeMap<String, String>,
    /// The resolved proxy uid. The uid collision check is skipped while unknown.
    pub proxy_uid: Option<i64>,
    /// Set when the uid was chosen explicitly, by flag or by pod annotation.
    pub uid_overridden: bool,
}

fn has_named_entry(document: &Object, path: &Path, name: &str) -> bool {
    document
        .get_sequence(path)
        .into_iter()
        .flatten()
        .any(|entry| entry.get("name").and_then(Value::as_str) == Some(name))
}

fn is_already_injected(document: &Object, workload: &WorkloadRef) -> bool {
    let pod_spec = workload.pod_spec();
    document
        .get_string_map(&workload.template_annotations())
        .contains_key(PROXY_VERSION_ANNOTATION)
        || has_named_entry(document, &pod_spec.join("containers"), PROXY_CONTAINER_NAME)
        || has_named_entry(document, &pod_spec.join("initContainers"), INIT_CONTAINER_NAME)
}

fn disables_injection(annotations: &BTreeMap<String, String>) -> bool {
    annotations.get(INJECT_ANNOTATION).map(String::as_str) == Some(INJECT_DISABLED)
}

fn is_opted_out(input: &GateInput) -> bool {
    let own_metadata = input
        .workload
        .map(WorkloadRef::metadata)
        .unwrap_or_else(|| "metadata".into());

    disables_injection(input.namespace_annotations)
        || disables_injection(&input.document.get_string_map(&own_metadata.join("annotations")))
        || input.workload.is_some_and(|workload| {
            disables_injection(&input.document.get_string_map(&workload.template_annotations()))
        })
}

fn run_as_user(value: Option<&Value>) -> Option<i64> {
    value?.get("securityContext")?.get("runAsUser")?.as_i64()
}

fn has_uid_collision(document: &Object, workload: &WorkloadRef, proxy_uid: i64) -> bool {
    let pod_spec = workload.pod_spec();
    run_as_user(document.get(&pod_spec)) == Some(proxy_uid)
        || ["containers", "initContainers"].into_iter().any(|list| {
            document
                .get_sequence(&pod_spec.join(list))
                .into_iter()
                .flatten()
                .any(|container| run_as_user(Some(container)) == Some(proxy_uid))
        })
}

/// Decides whether the workload of a document gets a proxy. The checks run in a fixed
/// order and the first match wins.
pub fn decide(input: &GateInput) -> InjectionDecision {
    if let Some(workload) = input.workload {
        if is_already_injected(input.document, workload) {
            return InjectionDecision::SkipAlreadyInjected;
        }
    }

    if is_opted_out(input) {
        return InjectionDecision::SkipOptedOut;
    }

    let Some(workload) = input.workload else {
        return InjectionDecision::SkipUnsupportedKind;
    };

    let pod_spec = workload.pod_spec();
    if input.document.get(&pod_spec.join("hostNetwork")).and_then(Value::as_bool) == Some(true) {
        return InjectionDecision::Conflict(HOST_NETWORK_CONFLICT.to_string());
    }

    if let Some(proxy_uid) = input.proxy_uid {
        if !input.uid_overridden && has_uid_collision(input.document, workload, proxy_uid) {
            return InjectionDecision::Conflict(UID_COLLISION_CONFLICT.to_string());
        }
    }

    InjectionDecision::Inject
}

//////////////////////////////////////////////////////////////////////////////
//                 ########  #######    #########  #########                //
//                    ##     ##        ##             ##                    //
//                    ##     #####     #########      ##                    //
//                    ##     ##                ##     ##                    //
//                    ##     #######   #########      ##                    //
//////////////////////////////////////////////////////////////////////////////
