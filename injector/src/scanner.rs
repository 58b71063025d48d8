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
use crate::error::ParseError;

const DOCUMENT_MARKER: &str = "---";
const LIST_KIND: &str = "List";
const LIST_ITEMS: &str = "items";

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentContent {
    /// Only comments or whitespace. Dropped from the output.
    Empty,
    Parsed(Object),
    Malformed(ParseError),
}

/// One document of the input stream together with the text it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub index: usize,
    pub source: String,
    pub content: DocumentContent,
}

impl RawDocument {
    pub fn object(&self) -> Option<&Object> {
        match &self.content {
            DocumentContent::Parsed(object) => Some(object),
            _ => None,
        }
    }

    pub fn object_mut(&mut self) -> Option<&mut Object> {
        match &mut self.content {
            DocumentContent::Parsed(object) => Some(object),
            _ => None,
        }
    }

    pub fn parse_error(&self) -> Option<&ParseError> {
        match &self.content {
            DocumentContent::Malformed(error) => Some(error),
            _ => None,
        }
    }
}

/// A workload found in a document and the location of its pod template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadRef {
    pub kind: String,
    pub namespace: Option<String>,
    /// Empty when the workload only has a `generateName`.
    pub name: String,
    /// Root of the workload inside the document, e.g. `items.2` inside a `List`.
    pub base: Path,
    pub template: Path,
}

impl WorkloadRef {
    pub fn metadata(&self) -> Path {
        self.base.join("metadata")
    }

    pub fn template_metadata(&self) -> Path {
        self.template.join("metadata")
    }

    pub fn template_annotations(&self) -> Path {
        self.template.join("metadata.annotations")
    }

    pub fn template_labels(&self) -> Path {
        self.template.join("metadata.labels")
    }

    pub fn pod_spec(&self) -> Path {
        self.template.join("spec")
    }

    /// Pods are not owners, so they get no `linkerd.io/proxy-<kind>` label.
    pub fn is_owner(&self) -> bool {
        self.kind != "Pod"
    }
}

fn template_path_of(kind: &str) -> Option<&'static str> {
    match kind {
        "Pod" => Some(""),
        "Deployment" | "StatefulSet" | "DaemonSet" | "Job" | "ReplicaSet"
        | "ReplicationController" => Some("spec.template"),
        "CronJob" => Some("spec.jobTemplate.spec.template"),
        _ => None,
    }
}

/// Returns the content following a document marker, e.g. `{kind: Pod}` for
/// `--- {kind: Pod}`, or `None` when `line` is not a marker.
fn after_document_marker(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(DOCUMENT_MARKER)?;
    let content = rest.trim_end_matches(['\n', '\r']);
    if content.is_empty() {
        Some("")
    } else if content.starts_with(char::is_whitespace) {
        Some(rest.trim_start_matches([' ', '\t']))
    } else {
        None
    }
}

fn split_documents(input: &str) -> Vec<String> {
    let mut documents = Vec::new();
    let mut current = String::new();
    for line in input.split_inclusive('\n') {
        match after_document_marker(line) {
            Some(rest) => {
                documents.push(std::mem::take(&mut current));
                current.push_str(rest);
            }
            None => current.push_str(line),
        }
    }
    documents.push(current);
    documents
}

fn parse_document(index: usize, source: String) -> RawDocument {
    let content = match serde_yaml::from_str::<Value>(&source) {
        Ok(Value::Null) => DocumentContent::Empty,
        Ok(value) => DocumentContent::Parsed(value.into()),
        Err(error) => {
            log::debug!("Document #{index} is not valid YAML: '{error}'");
            DocumentContent::Malformed(ParseError {
                index,
                message: error.to_string(),
            })
        }
    };
    RawDocument {
        index,
        source,
        content,
    }
}

/// Splits the input stream on document markers and parses every document on its own.
pub fn scan(input: &[u8]) -> Vec<RawDocument> {
    let text = match std::str::from_utf8(input) {
        Ok(text) => text,
        Err(error) => {
            return vec![RawDocument {
                index: 0,
                source: String::from_utf8_lossy(input).into_owned(),
                content: DocumentContent::Malformed(ParseError {
                    index: 0,
                    message: format!("input is not valid UTF-8: {error}"),
                }),
            }];
        }
    };

    split_documents(text)
        .into_iter()
        .enumerate()
        .map(|(index, source)| parse_document(index, source))
        .collect()
}

fn classify_at(object: &Object, base: &Path) -> Option<WorkloadRef> {
    let kind = object.get_str(&base.join("kind"))?;
    let template = base.join(template_path_of(kind)?);

    let required = if template == *base {
        template.join("spec")
    } else {
        template.clone()
    };
    object.get_mapping(&required)?;

    let metadata = base.join("metadata");
    Some(WorkloadRef {
        kind: kind.to_owned(),
        namespace: object
            .get_str(&metadata.join("namespace"))
            .map(str::to_owned),
        name: object
            .get_str(&metadata.join("name"))
            .unwrap_or_default()
            .to_owned(),
        base: base.clone(),
        template,
    })
}

/// Locates the pod template of a supported workload. `List` documents are not
/// expanded here; see [`classify_all`].
pub fn classify(object: &Object) -> Option<WorkloadRef> {
    classify_at(object, &Path::default())
}

/// Returns every workload of a document, looking into the items of a `List`.
pub fn classify_all(document: &RawDocument) -> Vec<WorkloadRef> {
    let Some(object) = document.object() else {
        return Vec::new();
    };

    if object.get_str(&"kind".into()) != Some(LIST_KIND) {
        return classify(object).into_iter().collect();
    }

    let items_count = object
        .get_sequence(&LIST_ITEMS.into())
        .map(Vec::len)
        .unwrap_or_default();
    (0..items_count)
        .filter_map(|item| classify_at(object, &Path::from(format!("{LIST_ITEMS}.{item}"))))
        .collect()
}

//////////////////////////////////////////////////////////////////////////////
//                 ########  #######    #########  #########                //
//                    ##     ##        ##             ##                    //
//                    ##     #####     #########      ##                    //
//                    ##     ##                ##     ##                    //
//                    ##     #######   #########      ##                    //
//////////////////////////////////////////////////////////////////////////////
