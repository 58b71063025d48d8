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

use serde_yaml::Value;

use crate::document::{Object, Path};
use crate::scanner::{RawDocument, WorkloadRef};
use crate::{
    CONFIG_ANNOTATION_PREFIX, CONTROL_PLANE_NS_LABEL, IDENTITY_VOLUME_NAME, INIT_CONTAINER_NAME,
    INJECT_ANNOTATION, LINKERD_ANNOTATION_PREFIX, PROXY_CONTAINER_NAME, PROXY_LABEL_PREFIX,
};

fn is_injected_annotation(key: &str) -> bool {
    key.starts_with(CONFIG_ANNOTATION_PREFIX)
        || (key.starts_with(LINKERD_ANNOTATION_PREFIX) && key != INJECT_ANNOTATION)
}

fn is_injected_label(key: &str) -> bool {
    key == CONTROL_PLANE_NS_LABEL || key.starts_with(PROXY_LABEL_PREFIX)
}

/// Drops the entries named `name` from the list at `path` and removes the list when
/// nothing is left.
fn remove_named(object: &mut Object, path: &Path, name: &str) -> bool {
    let Some(entries) = object.get_sequence_mut(path) else {
        return false;
    };
    let before = entries.len();
    entries.retain(|entry| entry.get("name").and_then(Value::as_str) != Some(name));
    let changed = entries.len() != before;
    if changed && entries.is_empty() {
        let _ = object.remove(path);
    }
    changed
}

/// Drops the keys matching `predicate` from the map at `path` and removes the map when
/// nothing is left.
fn remove_keys(object: &mut Object, path: &Path, predicate: fn(&str) -> bool) -> bool {
    let Some(Value::Mapping(mapping)) = object.get_mut(path) else {
        return false;
    };
    let before = mapping.len();
    mapping.retain(|key, _| !key.as_str().is_some_and(predicate));
    let changed = mapping.len() != before;
    if changed && mapping.is_empty() {
        let _ = object.remove(path);
    }
    changed
}

pub fn uninject_object(object: &mut Object, workload: &WorkloadRef) -> bool {
    let pod_spec = workload.pod_spec();
    let mut changed = false;

    changed |= remove_named(object, &pod_spec.join("containers"), PROXY_CONTAINER_NAME);
    changed |= remove_named(object, &pod_spec.join("initContainers"), INIT_CONTAINER_NAME);
    changed |= remove_named(object, &pod_spec.join("volumes"), IDENTITY_VOLUME_NAME);
    changed |= remove_keys(
        object,
        &workload.template_annotations(),
        is_injected_annotation,
    );
    changed |= remove_keys(object, &workload.template_labels(), is_injected_label);

    let metadata = workload.template_metadata();
    if changed && object.get_mapping(&metadata).is_some_and(|m| m.is_empty()) {
        let _ = object.remove(&metadata);
    }
    changed
}

/// Removes everything injection adds to the pod template of `workload`. Returns
/// whether the document changed.
pub fn uninject(document: &mut RawDocument, workload: &WorkloadRef) -> bool {
    match document.object_mut() {
        Some(object) => uninject_object(object, workload),
        None => false,
    }
}

//////////////////////////////////////////////////////////////////////////////
//                 ########  #######    #########  #########                //
//                    ##     ##        ##             ##                    //
//                    ##     #####     #########      ##                    //
//                    ##     ##                ##     ##                    //
//                    ##     #######   #########      ##                    //
//////////////////////////////////////////////////////////////////////////////
