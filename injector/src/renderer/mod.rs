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

mod rfc6902;

pub use rfc6902::to_json_patch;

use serde_yaml::Value;

use crate::document::Object;
use crate::error::InjectError;
use crate::patch::{Patch, PatchOperation};
use crate::scanner::{DocumentContent, RawDocument, WorkloadRef};

const DOCUMENT_SEPARATOR: &str = "---\n";

fn render_error(workload: &WorkloadRef) -> impl Fn(String) -> InjectError + '_ {
    move |message| {
        InjectError::Render(format!(
            "{} '{}': {message}",
            workload.kind, workload.name
        ))
    }
}

/// Merges `patch` into the pod template of `workload`. Missing maps and lists are
/// appended at the end of their parent; everything else keeps its position.
pub fn apply_to_object(
    object: &mut Object,
    workload: &WorkloadRef,
    patch: &Patch,
) -> Result<(), InjectError> {
    let to_error = render_error(workload);
    let pod_spec = workload.pod_spec();

    for operation in patch.operations() {
        match operation {
            PatchOperation::AddContainer(container) => object
                .push(&pod_spec.join("containers"), serde_yaml::to_value(container)?)
                .map_err(&to_error)?,
            PatchOperation::AddInitContainer(container) => object
                .push(
                    &pod_spec.join("initContainers"),
                    serde_yaml::to_value(container)?,
                )
                .map_err(&to_error)?,
            PatchOperation::AddVolume(volume) => object
                .push(&pod_spec.join("volumes"), serde_yaml::to_value(volume)?)
                .map_err(&to_error)?,
            PatchOperation::AddAnnotation { key, value } => object
                .set(
                    &workload.template_annotations().join(vec![key.clone()]),
                    Value::from(value.as_str()),
                )
                .map_err(&to_error)?,
            PatchOperation::AddLabel { key, value } => object
                .set(
                    &workload.template_labels().join(vec![key.clone()]),
                    Value::from(value.as_str()),
                )
                .map_err(&to_error)?,
        }
    }
    Ok(())
}

pub fn apply(
    document: &mut RawDocument,
    workload: &WorkloadRef,
    patch: &Patch,
) -> Result<(), InjectError> {
    let index = document.index;
    let object = document.object_mut().ok_or_else(|| {
        InjectError::Render(format!("document #{index} has no parsed content"))
    })?;
    apply_to_object(object, workload, patch)
}

fn ensure_trailing_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

/// Writes the stream back as YAML. Empty documents are dropped and malformed ones are
/// written as they were read.
pub fn serialize(documents: &[RawDocument]) -> Result<String, InjectError> {
    let mut rendered = Vec::with_capacity(documents.len());
    for document in documents {
        match &document.content {
            DocumentContent::Empty => {}
            DocumentContent::Parsed(object) => rendered.push(serde_yaml::to_string(object.data())?),
            DocumentContent::Malformed(_) => {
                rendered.push(ensure_trailing_newline(document.source.clone()))
            }
        }
    }
    Ok(rendered.join(DOCUMENT_SEPARATOR))
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
    use serde_yaml::Value;

    use super::{apply, serialize};
    use crate::patch::{Patch, PatchOperation};
    use crate::scanner::{classify, scan};

    const DEPLOYMENT: &str = r#"kind: Deployment
metadata:
  name: web
spec:
  replicas: 2
  template:
    spec:
      containers:
      - name: app
        image: nginx
      restartPolicy: Always
"#;

    fn annotation_patch() -> Patch {
        let mut patch = Patch::default();
        patch.push(PatchOperation::AddInitContainer(Box::new(
            k8s_openapi::api::core::v1::Container {
                name: "linkerd-init".into(),
                ..Default::default()
            },
        )));
        patch.push(PatchOperation::AddAnnotation {
            key: "linkerd.io/proxy-version".into(),
            value: "v1".into(),
        });
        patch
    }

    #[test]
    fn utest_apply_creates_missing_collections_at_the_end() {
        let mut documents = scan(DEPLOYMENT.as_bytes());
        let workload = classify(documents[0].object().unwrap()).unwrap();

        apply(&mut documents[0], &workload, &annotation_patch()).unwrap();

        let object = documents[0].object().unwrap();
        let template_keys: Vec<&str> = object
            .get_mapping(&"spec.template".into())
            .unwrap()
            .keys()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(template_keys, vec!["spec", "metadata"]);
        let spec_keys: Vec<&str> = object
            .get_mapping(&"spec.template.spec".into())
            .unwrap()
            .keys()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(spec_keys, vec!["containers", "restartPolicy", "initContainers"]);
        assert_eq!(
            object.get_str(&"spec.template.spec.initContainers.0.name".into()),
            Some("linkerd-init")
        );
    }

    #[test]
    fn utest_apply_keeps_existing_containers() {
        let mut documents = scan(DEPLOYMENT.as_bytes());
        let workload = classify(documents[0].object().unwrap()).unwrap();
        let mut patch = Patch::default();
        patch.push(PatchOperation::AddContainer(Box::new(
            k8s_openapi::api::core::v1::Container {
                name: "linkerd-proxy".into(),
                ..Default::default()
            },
        )));

        apply(&mut documents[0], &workload, &patch).unwrap();

        let object = documents[0].object().unwrap();
        assert_eq!(
            object.get_str(&"spec.template.spec.containers.0.name".into()),
            Some("app")
        );
        assert_eq!(
            object.get_str(&"spec.template.spec.containers.1.name".into()),
            Some("linkerd-proxy")
        );
    }

    #[test]
    fn utest_serialize_keeps_malformed_and_drops_empty() {
        let documents = scan(b"---\nkind: A\n---\n# nothing\n---\nkey: [unclosed\n");

        let output = serialize(&documents).unwrap();

        assert_eq!(output, "kind: A\n---\nkey: [unclosed\n");
    }

    #[test]
    fn utest_serialize_is_stable() {
        let first = serialize(&scan(DEPLOYMENT.as_bytes())).unwrap();
        let second = serialize(&scan(first.as_bytes())).unwrap();

        assert_eq!(first, second);
    }
}
