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

use super::Path;

use serde_yaml::{
    Mapping, Value,
    mapping::Entry::{Occupied, Vacant},
};
use std::collections::BTreeMap;

/// Generic, order preserving manifest tree.
#[derive(Debug, PartialEq, Clone)]
pub struct Object {
    data: Value,
}

impl Default for Object {
    fn default() -> Self {
        Self {
            data: Value::Mapping(Default::default()),
        }
    }
}

impl From<Value> for Object {
    fn from(data: Value) -> Self {
        Object { data }
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        value.data
    }
}

impl TryFrom<&Object> for serde_json::Value {
    type Error = serde_json::Error;

    fn try_from(value: &Object) -> Result<Self, Self::Error> {
        serde_json::to_value(&value.data)
    }
}

fn child<'a>(current: &'a Value, part: &str) -> Option<&'a Value> {
    match current {
        Value::Mapping(as_mapping) => as_mapping.get(part),
        Value::Sequence(as_sequence) => as_sequence.get(part.parse::<usize>().ok()?),
        _ => None,
    }
}

fn child_mut<'a>(current: &'a mut Value, part: &str) -> Option<&'a mut Value> {
    match current {
        Value::Mapping(as_mapping) => as_mapping.get_mut(part),
        Value::Sequence(as_sequence) => as_sequence.get_mut(part.parse::<usize>().ok()?),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

impl Object {
    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn get(&self, path: &Path) -> Option<&Value> {
        let mut current_obj = &self.data;
        for p in path.parts() {
            current_obj = child(current_obj, p)?;
        }
        Some(current_obj)
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut Value> {
        let mut current_obj = &mut self.data;
        for p in path.parts() {
            current_obj = child_mut(current_obj, p)?;
        }
        Some(current_obj)
    }

    pub fn get_str(&self, path: &Path) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn get_mapping(&self, path: &Path) -> Option<&Mapping> {
        self.get(path).and_then(Value::as_mapping)
    }

    pub fn get_sequence(&self, path: &Path) -> Option<&Vec<Value>> {
        self.get(path).and_then(Value::as_sequence)
    }

    pub fn get_sequence_mut(&mut self, path: &Path) -> Option<&mut Vec<Value>> {
        self.get_mut(path).and_then(Value::as_sequence_mut)
    }

    /// Collects the entries of the mapping at `path`, e.g. annotations or labels.
    /// Unquoted numbers and booleans are taken by their text; nested values are skipped.
    pub fn get_string_map(&self, path: &Path) -> BTreeMap<String, String> {
        self.get_mapping(path)
            .map(|mapping| {
                mapping
                    .iter()
                    .filter_map(|(key, value)| {
                        let key = key.as_str()?;
                        match scalar_text(value) {
                            Some(text) => Some((key.to_owned(), text)),
                            None => {
                                log::debug!("Skipping non scalar value of '{key}' in '{path}'");
                                None
                            }
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the mapping at `path`, creating it and every missing intermediate
    /// mapping. An existing `null` entry is replaced by an empty mapping.
    pub fn ensure_mapping(&mut self, path: &Path) -> Result<&mut Mapping, String> {
        let mut current = &mut self.data;
        for path_part in path.parts() {
            current = match current {
                Value::Mapping(mapping) => match mapping.entry(path_part.to_owned().into()) {
                    Occupied(value) => value.into_mut(),
                    Vacant(value) => value.insert(Value::Mapping(Mapping::default())),
                },
                Value::Sequence(sequence) => {
                    let index = path_part
                        .parse::<usize>()
                        .map_err(|_| format!("'{path_part}' is not an index in '{path}'"))?;
                    sequence
                        .get_mut(index)
                        .ok_or_else(|| format!("index '{index}' is out of range in '{path}'"))?
                }
                _ => return Err(format!("'{path}' crosses a scalar value")),
            };
            if current.is_null() {
                *current = Value::Mapping(Mapping::default());
            }
        }

        current
            .as_mapping_mut()
            .ok_or_else(|| format!("'{path}' is not a mapping"))
    }

    /// Sets the value at `path`, adding missing intermediate mappings.
    pub fn set(&mut self, path: &Path, value: Value) -> Result<(), String> {
        let (path_head, path_last) = path.split_last()?;
        self.ensure_mapping(&path_head)?
            .insert(path_last.into(), value);
        Ok(())
    }

    /// Appends `value` to the sequence at `path`; an absent or `null` entry becomes
    /// a new sequence.
    pub fn push(&mut self, path: &Path, value: Value) -> Result<(), String> {
        let (path_head, path_last) = path.split_last()?;
        let parent = self.ensure_mapping(&path_head)?;
        let entry = match parent.entry(path_last.into()) {
            Occupied(entry) => entry.into_mut(),
            Vacant(entry) => entry.insert(Value::Sequence(Vec::new())),
        };
        if entry.is_null() {
            *entry = Value::Sequence(Vec::new());
        }
        entry
            .as_sequence_mut()
            .ok_or_else(|| format!("'{path}' is not a sequence"))?
            .push(value);
        Ok(())
    }

    pub fn remove(&mut self, path: &Path) -> Result<Option<Value>, String> {
        let (path_head, path_last) = path.split_last()?;

        Ok(self
            .get_mut(&path_head)
            .and_then(Value::as_mapping_mut)
            .ok_or_else(|| format!("'{path_head}' is not a mapping"))?
            .shift_remove(path_last))
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
    use super::Object;
    use crate::document::Path;

    use serde_yaml::Value;

    const DEPLOYMENT: &str = r#"
kind: Deployment
metadata:
  name: web
spec:
  template:
    metadata:
      annotations:
        team: blue
        replicas: 3
        sidecar: true
        nested:
          key: value
    spec:
      containers:
      - name: app
        image: nginx
"#;

    fn deployment() -> Object {
        serde_yaml::from_str::<Value>(DEPLOYMENT).unwrap().into()
    }

    #[test]
    fn utest_object_get_through_sequence() {
        let object = deployment();

        assert_eq!(
            object.get_str(&"spec.template.spec.containers.0.name".into()),
            Some("app")
        );
        assert!(object.get(&"spec.template.spec.containers.1".into()).is_none());
        assert!(object.get(&"spec.template.spec.containers.x".into()).is_none());
    }

    #[test]
    fn utest_object_get_string_map_reads_unquoted_scalars() {
        let object = deployment();

        let annotations = object.get_string_map(&"spec.template.metadata.annotations".into());

        assert_eq!(annotations.len(), 3);
        assert_eq!(annotations.get("team"), Some(&"blue".to_string()));
        assert_eq!(annotations.get("replicas"), Some(&"3".to_string()));
        assert_eq!(annotations.get("sidecar"), Some(&"true".to_string()));
        assert!(!annotations.contains_key("nested"));
    }

    #[test]
    fn utest_object_get_string_map_of_missing_mapping_is_empty() {
        let object = deployment();

        assert!(object.get_string_map(&"metadata.labels".into()).is_empty());
    }

    #[test]
    fn utest_object_set_adds_missing_objects() {
        let mut object = deployment();

        object
            .set(
                &"spec.template.metadata.labels.app".into(),
                Value::String("web".into()),
            )
            .unwrap();

        assert_eq!(
            object.get_str(&"spec.template.metadata.labels.app".into()),
            Some("web")
        );
    }

    #[test]
    fn utest_object_set_keeps_key_order() {
        let mut object = deployment();

        object
            .set(&"metadata.namespace".into(), Value::String("prod".into()))
            .unwrap();

        let keys: Vec<&str> = object
            .get_mapping(&"metadata".into())
            .unwrap()
            .keys()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(keys, vec!["name", "namespace"]);
    }

    #[test]
    fn utest_object_set_fails_on_scalar() {
        let mut object = deployment();

        assert!(
            object
                .set(&"kind.foo".into(), Value::String("bar".into()))
                .is_err()
        );
    }

    #[test]
    fn utest_object_ensure_mapping_replaces_null() {
        let mut object: Object = serde_yaml::from_str::<Value>("metadata:\n  annotations:\n")
            .unwrap()
            .into();

        object
            .ensure_mapping(&"metadata.annotations".into())
            .unwrap()
            .insert("a".into(), "b".into());

        assert_eq!(object.get_str(&"metadata.annotations.a".into()), Some("b"));
    }

    #[test]
    fn utest_object_push_creates_sequence() {
        let mut object = deployment();
        let path: Path = "spec.template.spec.initContainers".into();

        object.push(&path, Value::String("first".into())).unwrap();
        object.push(&path, Value::String("second".into())).unwrap();

        assert_eq!(object.get_sequence(&path).unwrap().len(), 2);
    }

    #[test]
    fn utest_object_push_fails_on_mapping() {
        let mut object = deployment();

        assert!(
            object
                .push(&"spec.template.metadata".into(), Value::Null)
                .is_err()
        );
    }

    #[test]
    fn utest_object_remove() {
        let mut object = deployment();

        let removed = object.remove(&"spec.template.metadata.annotations".into());

        assert!(removed.unwrap().is_some());
        assert!(
            object.get(&"spec.template.metadata.annotations".into()).is_none()
        );
        assert!(object.remove(&"kind.name".into()).is_err());
    }
}
