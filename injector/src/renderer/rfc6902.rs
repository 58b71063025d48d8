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

use std::collections::HashSet;

use json_patch::{AddOperation, PatchOperation as JsonOperation};
use jsonptr::PointerBuf;
use serde_json::{Map, Value as JsonValue};
use serde_yaml::Value;

use crate::document::{Object, Path};
use crate::error::InjectError;
use crate::patch::{Patch, PatchOperation};
use crate::scanner::WorkloadRef;

const APPEND_TOKEN: &str = "-";

fn pointer(path: &Path, tail: &[&str]) -> PointerBuf {
    PointerBuf::from_tokens(
        path.parts()
            .iter()
            .map(String::as_str)
            .chain(tail.iter().copied()),
    )
}

#[derive(Clone, Copy)]
enum Collection {
    Map,
    List,
}

impl Collection {
    fn empty(&self) -> JsonValue {
        match self {
            Collection::Map => JsonValue::Object(Map::new()),
            Collection::List => JsonValue::Array(Vec::new()),
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Collection::Map => value.is_mapping(),
            Collection::List => value.is_sequence(),
        }
    }
}

/// Collects `add` operations against the original document, remembering which
/// collections earlier operations created.
struct OperationWriter<'a> {
    document: &'a Object,
    created: HashSet<Path>,
    operations: Vec<JsonOperation>,
}

impl<'a> OperationWriter<'a> {
    fn new(document: &'a Object) -> Self {
        OperationWriter {
            document,
            created: HashSet::new(),
            operations: Vec::new(),
        }
    }

    fn add(&mut self, path: PointerBuf, value: JsonValue) {
        self.operations
            .push(JsonOperation::Add(AddOperation { path, value }));
    }

    fn ensure(&mut self, path: &Path, collection: Collection) -> Result<(), String> {
        let parts = path.parts();
        for depth in 1..=parts.len() {
            let prefix = Path::from(parts[..depth].to_vec());
            let expected = if depth == parts.len() {
                collection
            } else {
                Collection::Map
            };
            if self.created.contains(&prefix) {
                continue;
            }
            match self.document.get(&prefix) {
                Some(value) if expected.matches(value) => {}
                // the template itself and sequence entries always exist in the original
                Some(value) if depth < parts.len() && value.is_sequence() => {}
                None | Some(Value::Null) => {
                    self.add(pointer(&prefix, &[]), expected.empty());
                    self.created.insert(prefix);
                }
                Some(_) => return Err(format!("'{prefix}' has an unexpected type")),
            }
        }
        Ok(())
    }

    fn append(&mut self, list: &Path, value: JsonValue) -> Result<(), String> {
        self.ensure(list, Collection::List)?;
        self.add(pointer(list, &[APPEND_TOKEN]), value);
        Ok(())
    }

    fn insert(&mut self, map: &Path, key: &str, value: &str) -> Result<(), String> {
        self.ensure(map, Collection::Map)?;
        self.add(pointer(map, &[key]), JsonValue::String(value.to_string()));
        Ok(())
    }
}

/// Renders `patch` as RFC 6902 `add` operations against the unmodified `document`.
pub fn to_json_patch(
    patch: &Patch,
    document: &Object,
    workload: &WorkloadRef,
) -> Result<json_patch::Patch, InjectError> {
    let to_error = |message: String| {
        InjectError::Render(format!("{} '{}': {message}", workload.kind, workload.name))
    };
    let pod_spec = workload.pod_spec();
    let mut writer = OperationWriter::new(document);

    for operation in patch.operations() {
        match operation {
            PatchOperation::AddContainer(container) => writer
                .append(&pod_spec.join("containers"), serde_json::to_value(container)?)
                .map_err(to_error)?,
            PatchOperation::AddInitContainer(container) => writer
                .append(
                    &pod_spec.join("initContainers"),
                    serde_json::to_value(container)?,
                )
                .map_err(to_error)?,
            PatchOperation::AddVolume(volume) => writer
                .append(&pod_spec.join("volumes"), serde_json::to_value(volume)?)
                .map_err(to_error)?,
            PatchOperation::AddAnnotation { key, value } => writer
                .insert(&workload.template_annotations(), key, value)
                .map_err(to_error)?,
            PatchOperation::AddLabel { key, value } => writer
                .insert(&workload.template_labels(), key, value)
                .map_err(to_error)?,
        }
    }

    Ok(json_patch::Patch(writer.operations))
}

//////////////////////////////////////////////////////////////////////////////
//                 ########  #######    #########  #########                //
//                    ##     ##        ##             ##                    //
//                    ##     #####     #########      ##                    //
//                    ##     ##                ##     ##                    //
//                    ##     #######   #########      ##                    //
//////////////////////////////////////////////////////////////////////////////
