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

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Instant;

use crate::config::{ConfigKey, ConfigResolver};
use crate::document::Object;
use crate::eligibility::{GateInput, InjectionDecision, decide};
use crate::error::{InjectError, ParseError};
use crate::patch::{BuildContext, Patch, build};
use crate::renderer::{apply, serialize, to_json_patch};
use crate::scanner::{RawDocument, WorkloadRef, classify, classify_all, scan};
use crate::uninject::uninject;

const DEFAULT_NAMESPACE: &str = "default";

/// Per invocation facts that are not part of the manifests.
#[derive(Debug, Clone)]
pub struct StreamContext {
    /// Annotations of the namespaces known to the caller.
    pub namespace_annotations: HashMap<String, BTreeMap<String, String>>,
    /// Used for workloads without `metadata.namespace`.
    pub default_namespace: String,
    pub deadline: Option<Instant>,
}

impl Default for StreamContext {
    fn default() -> Self {
        StreamContext {
            namespace_annotations: HashMap::new(),
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            deadline: None,
        }
    }
}

impl StreamContext {
    fn annotations_of(&self, workload: Option<&WorkloadRef>) -> &BTreeMap<String, String> {
        static EMPTY: BTreeMap<String, String> = BTreeMap::new();
        let namespace = workload
            .and_then(|workload| workload.namespace.as_deref())
            .unwrap_or(&self.default_namespace);
        self.namespace_annotations.get(namespace).unwrap_or(&EMPTY)
    }

    fn check_deadline(&self, processed: usize) -> Result<(), InjectError> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(InjectError::DeadlineExceeded { processed })
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadReport {
    pub kind: String,
    pub name: String,
    pub decision: InjectionDecision,
}

impl fmt::Display for WorkloadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} \"{}\" {}",
            self.kind.to_lowercase(),
            self.name,
            self.decision
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninjectReport {
    pub kind: String,
    pub name: String,
    pub changed: bool,
}

impl fmt::Display for UninjectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = if self.changed {
            "uninjected"
        } else {
            "skipped: not injected"
        };
        write!(f, "{} \"{}\" {outcome}", self.kind.to_lowercase(), self.name)
    }
}

/// The transformed stream plus what happened to each workload in it.
#[derive(Debug, Clone)]
pub struct StreamOutput<R> {
    pub documents: Vec<RawDocument>,
    pub reports: Vec<R>,
    pub warnings: Vec<ParseError>,
}

impl<R> StreamOutput<R> {
    fn new() -> Self {
        StreamOutput {
            documents: Vec::new(),
            reports: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn render(&self) -> Result<String, InjectError> {
        serialize(&self.documents)
    }
}

pub type InjectionOutput = StreamOutput<WorkloadReport>;
pub type UninjectionOutput = StreamOutput<UninjectReport>;

/// Result of the admission path: the decision and, when injecting, the patch.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInjection {
    pub decision: InjectionDecision,
    pub patch: Option<json_patch::Patch>,
}

fn report_without_workload(object: &Object, decision: InjectionDecision) -> WorkloadReport {
    WorkloadReport {
        kind: object.get_str(&"kind".into()).unwrap_or_default().to_owned(),
        name: object
            .get_str(&"metadata.name".into())
            .unwrap_or_default()
            .to_owned(),
        decision,
    }
}

/// Drives scan, gate, resolve, build and render. Holds no mutable state and can be
/// shared between threads.
#[derive(Debug, Clone)]
pub struct Injector {
    resolver: ConfigResolver,
    creator: String,
}

impl Injector {
    pub fn new(resolver: ConfigResolver, creator: impl Into<String>) -> Self {
        Injector {
            resolver,
            creator: creator.into(),
        }
    }

    fn plan(
        &self,
        object: &Object,
        workload: &WorkloadRef,
        namespace_annotations: &BTreeMap<String, String>,
    ) -> Result<(InjectionDecision, Option<Patch>), InjectError> {
        let pod_annotations = object.get_string_map(&workload.template_annotations());
        let mut input = GateInput {
            document: object,
            workload: Some(workload),
            namespace_annotations,
            proxy_uid: None,
            uid_overridden: self.resolver.overrides().is_set(ConfigKey::ProxyUid)
                || pod_annotations.contains_key(&ConfigKey::ProxyUid.annotation()),
        };
        let screened = decide(&input);
        if !screened.is_inject() {
            return Ok((screened, None));
        }

        // only workloads that pass the screening get their annotations validated
        let config = self.resolver.resolve(namespace_annotations, &pod_annotations)?;
        input.proxy_uid = Some(config.proxy_uid);
        let decision = decide(&input);
        if !decision.is_inject() {
            return Ok((decision, None));
        }

        let patch = build(
            &config,
            &BuildContext {
                workload,
                creator: &self.creator,
                overrides: self.resolver.overrides(),
            },
        )?;
        Ok((decision, Some(patch)))
    }

    fn inject_document(
        &self,
        document: &mut RawDocument,
        context: &StreamContext,
        reports: &mut Vec<WorkloadReport>,
    ) -> Result<(), InjectError> {
        let workloads = classify_all(document);
        let Some(object) = document.object() else {
            return Ok(());
        };

        if workloads.is_empty() {
            let decision = decide(&GateInput {
                document: object,
                workload: None,
                namespace_annotations: context.annotations_of(None),
                proxy_uid: None,
                uid_overridden: false,
            });
            log::debug!("Document #{} has no workload: {decision}", document.index);
            reports.push(report_without_workload(object, decision));
            return Ok(());
        }

        for workload in &workloads {
            let Some(object) = document.object() else {
                break;
            };
            let (decision, patch) =
                self.plan(object, workload, context.annotations_of(Some(workload)))?;
            if let Some(patch) = patch {
                apply(document, workload, &patch)?;
            }
            log::info!("{} '{}': {decision}", workload.kind, workload.name);
            reports.push(WorkloadReport {
                kind: workload.kind.clone(),
                name: workload.name.clone(),
                decision,
            });
        }
        Ok(())
    }

    /// Injects every eligible workload of `input`. Configuration errors abort the whole
    /// stream, everything else is reported per workload or document.
    pub fn inject_stream(
        &self,
        input: &[u8],
        context: &StreamContext,
    ) -> Result<InjectionOutput, InjectError> {
        let mut output = InjectionOutput::new();
        for (processed, mut document) in scan(input).into_iter().enumerate() {
            context.check_deadline(processed)?;
            if let Some(error) = document.parse_error() {
                log::debug!("{error}");
                output.warnings.push(error.clone());
            }
            self.inject_document(&mut document, context, &mut output.reports)?;
            output.documents.push(document);
        }
        Ok(output)
    }

    /// Admission path: decides for a single object and renders the patch as JSON Patch.
    pub fn inject_object(
        &self,
        object: &Object,
        namespace_annotations: &BTreeMap<String, String>,
    ) -> Result<ObjectInjection, InjectError> {
        let Some(workload) = classify(object) else {
            let decision = decide(&GateInput {
                document: object,
                workload: None,
                namespace_annotations,
                proxy_uid: None,
                uid_overridden: false,
            });
            return Ok(ObjectInjection {
                decision,
                patch: None,
            });
        };

        let (decision, patch) = self.plan(object, &workload, namespace_annotations)?;
        let patch = patch
            .map(|patch| to_json_patch(&patch, object, &workload))
            .transpose()?;
        Ok(ObjectInjection { decision, patch })
    }

    /// Removes injected parts from every workload of `input`.
    pub fn uninject_stream(&self, input: &[u8]) -> Result<UninjectionOutput, InjectError> {
        let mut output = UninjectionOutput::new();
        for mut document in scan(input) {
            if let Some(error) = document.parse_error() {
                log::debug!("{error}");
                output.warnings.push(error.clone());
            }
            for workload in classify_all(&document) {
                let changed = uninject(&mut document, &workload);
                output.reports.push(UninjectReport {
                    kind: workload.kind,
                    name: workload.name,
                    changed,
                });
            }
            output.documents.push(document);
        }
        Ok(output)
    }
}

//////////////////////////////////////////////////////////////////////////////
//                 ########  #######    #########  #########                //
//                    ##     ##        ##             ##                    //
//                    ##     #####     #########      ##                    //
//                    ##     ##                ##     ##                    //
//                    ##     #######   #########      ##                    //
//////////////////////////////////////////////////////////////////////////////
