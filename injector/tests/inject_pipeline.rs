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

use injector::config::{ConfigKey, ConfigLayer, ConfigResolver, LayerSource};
use injector::document::{Object, Path};
use injector::eligibility::InjectionDecision;
use injector::pipeline::{Injector, StreamContext};
use injector::renderer::{apply_to_object, serialize};
use injector::scanner::{classify, scan};
use injector::{CLI_CREATOR, PROXY_INJECTOR_CREATOR};
use serde_yaml::Value;

const DEPLOYMENT: &str = include_str!("testdata/deployment.yaml");
const LIST: &str = include_str!("testdata/list.yaml");
const HOST_NETWORK: &str = include_str!("testdata/host_network.yaml");

const TRUST_ANCHORS: &str = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";

fn layer(source: LayerSource, entries: &[(ConfigKey, &str)]) -> ConfigLayer {
    let mut layer = ConfigLayer::new(source);
    for (key, value) in entries {
        layer.set(*key, *value).unwrap();
    }
    layer
}

fn injector_with(overrides: &[(ConfigKey, &str)], creator: &str) -> Injector {
    let config_file = layer(
        LayerSource::ConfigFile,
        &[(ConfigKey::IdentityTrustAnchorsPem, TRUST_ANCHORS)],
    );
    let resolver = ConfigResolver::new(
        config_file,
        ConfigLayer::new(LayerSource::Cluster),
        layer(LayerSource::Override, overrides),
    )
    .unwrap();
    Injector::new(resolver, creator)
}

fn scenario_injector() -> Injector {
    injector_with(
        &[
            (ConfigKey::ProxyImage, "registry.local/proxy"),
            (ConfigKey::InitImage, "registry.local/proxy-init"),
            (ConfigKey::LinkerdVersion, "stable-2.3.0"),
            (ConfigKey::DisableIdentity, "true"),
        ],
        CLI_CREATOR,
    )
}

fn inject(injector: &Injector, input: &str) -> String {
    injector
        .inject_stream(input.as_bytes(), &StreamContext::default())
        .unwrap()
        .render()
        .unwrap()
}

fn parse_all(output: &str) -> Vec<Object> {
    scan(output.as_bytes())
        .into_iter()
        .filter_map(|document| document.object().cloned())
        .collect()
}

fn names(object: &Object, path: &str) -> Vec<String> {
    object
        .get_sequence(&path.into())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("name").and_then(Value::as_str))
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn itest_deployment_scenario() {
    let output = inject(&scenario_injector(), DEPLOYMENT);

    let objects = parse_all(&output);
    assert_eq!(objects.len(), 2);
    let deployment = &objects[1];

    assert_eq!(
        names(deployment, "spec.template.spec.containers"),
        vec!["web", "linkerd-proxy"]
    );
    assert_eq!(
        names(deployment, "spec.template.spec.initContainers"),
        vec!["linkerd-init"]
    );
    assert_eq!(
        deployment.get_str(&"spec.template.spec.containers.1.image".into()),
        Some("registry.local/proxy:stable-2.3.0")
    );
    assert_eq!(
        deployment.get_str(&"spec.template.spec.initContainers.0.image".into()),
        Some("registry.local/proxy-init:stable-2.3.0")
    );
    assert_eq!(
        deployment.get_str(&"spec.template.spec.containers.0.resources.requests.cpu".into()),
        Some("100m")
    );

    let annotations = deployment.get_string_map(&"spec.template.metadata.annotations".into());
    assert_eq!(
        annotations.get("config.linkerd.io/disable-identity").map(String::as_str),
        Some("true")
    );
    assert_eq!(
        annotations.get("linkerd.io/proxy-version").map(String::as_str),
        Some("stable-2.3.0")
    );
    assert_eq!(
        annotations.get("linkerd.io/identity-mode").map(String::as_str),
        Some("disabled")
    );
    assert!(deployment.get(&"spec.template.spec.volumes".into()).is_none());

    let labels = deployment.get_string_map(&"spec.template.metadata.labels".into());
    assert_eq!(labels.get("app").map(String::as_str), Some("web"));
    assert_eq!(
        labels.get("linkerd.io/proxy-deployment").map(String::as_str),
        Some("web")
    );
}

#[test]
fn itest_reinjection_is_idempotent() {
    let injector = scenario_injector();
    let first = inject(&injector, DEPLOYMENT);

    let second_run = injector
        .inject_stream(first.as_bytes(), &StreamContext::default())
        .unwrap();

    assert_eq!(
        second_run.reports[1].decision,
        InjectionDecision::SkipAlreadyInjected
    );
    assert_eq!(second_run.render().unwrap(), first);
}

#[test]
fn itest_reinjection_without_overrides_is_idempotent() {
    let first = inject(&scenario_injector(), DEPLOYMENT);

    let second_run = Injector::new(ConfigResolver::default(), CLI_CREATOR)
        .inject_stream(first.as_bytes(), &StreamContext::default())
        .unwrap();

    assert_eq!(
        second_run.reports[0].decision,
        InjectionDecision::SkipUnsupportedKind
    );
    assert_eq!(
        second_run.reports[1].decision,
        InjectionDecision::SkipAlreadyInjected
    );
    assert_eq!(second_run.render().unwrap(), first);
}

#[test]
fn itest_unsupported_kinds_pass_through() {
    let output = injector_with(&[], CLI_CREATOR)
        .inject_stream(DEPLOYMENT.as_bytes(), &StreamContext::default())
        .unwrap();

    let canonical = serialize(&scan(DEPLOYMENT.as_bytes())).unwrap();
    let service = canonical.split("---\n").next().unwrap();
    assert!(output.render().unwrap().starts_with(service));
    assert_eq!(
        output.reports[0].decision,
        InjectionDecision::SkipUnsupportedKind
    );
}

#[test]
fn itest_identity_adds_volume_and_trust_anchors() {
    let output = inject(&injector_with(&[], CLI_CREATOR), DEPLOYMENT);

    let deployment = &parse_all(&output)[1];
    assert_eq!(
        names(deployment, "spec.template.spec.volumes"),
        vec!["linkerd-identity-end-entity"]
    );
    let env = deployment
        .get_sequence(&"spec.template.spec.containers.1.env".into())
        .unwrap();
    let anchors = env
        .iter()
        .find(|var| var.get("name").and_then(Value::as_str) == Some("LINKERD2_PROXY_IDENTITY_TRUST_ANCHORS"))
        .and_then(|var| var.get("value"))
        .and_then(Value::as_str);
    assert_eq!(anchors, Some(TRUST_ANCHORS));
}

#[test]
fn itest_list_items_are_handled_one_by_one() {
    let output = injector_with(&[(ConfigKey::DisableIdentity, "true")], CLI_CREATOR)
        .inject_stream(LIST.as_bytes(), &StreamContext::default())
        .unwrap();

    let decisions: Vec<(&str, &InjectionDecision)> = output
        .reports
        .iter()
        .map(|report| (report.name.as_str(), &report.decision))
        .collect();
    assert_eq!(
        decisions,
        vec![
            ("nightly", &InjectionDecision::Inject),
            ("db", &InjectionDecision::SkipOptedOut),
        ]
    );

    let list = &parse_all(&output.render().unwrap())[0];
    assert_eq!(
        names(
            list,
            "items.1.spec.jobTemplate.spec.template.spec.containers"
        ),
        vec!["backup", "linkerd-proxy"]
    );
    let labels = list.get_string_map(&"items.1.spec.jobTemplate.spec.template.metadata.labels".into());
    assert_eq!(
        labels.get("linkerd.io/proxy-cronjob").map(String::as_str),
        Some("nightly")
    );
    assert_eq!(names(list, "items.2.spec.template.spec.containers"), vec!["db"]);
}

#[test]
fn itest_conflicts_and_parse_errors_do_not_stop_the_stream() {
    let output = injector_with(&[(ConfigKey::DisableIdentity, "true")], CLI_CREATOR)
        .inject_stream(HOST_NETWORK.as_bytes(), &StreamContext::default())
        .unwrap();

    assert_eq!(output.warnings.len(), 1);
    assert_eq!(output.warnings[0].index, 1);
    assert_eq!(
        output.reports[0].decision,
        InjectionDecision::Conflict("hostNetwork is enabled".into())
    );
    assert_eq!(output.reports[1].decision, InjectionDecision::Inject);

    let rendered = output.render().unwrap();
    assert!(rendered.contains("annotations: [this is: not valid\n"));

    let pod = parse_all(&rendered).pop().unwrap();
    let args: Vec<&str> = pod
        .get_sequence(&"spec.initContainers.0.args".into())
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(&args[args.len() - 2..], ["--outbound-ports-to-ignore", "25,3306"]);
    assert_eq!(
        pod.get_string_map(&"metadata.labels".into()).len(),
        1,
        "a pod without a name gets no owner label"
    );
}

#[test]
fn itest_json_patch_matches_structural_rendering() {
    let injector = injector_with(&[], PROXY_INJECTOR_CREATOR);
    let documents = scan(DEPLOYMENT.as_bytes());
    let original = documents[1].object().unwrap().clone();

    let injection = injector.inject_object(&original, &BTreeMap::new()).unwrap();
    let mut patched = serde_json::Value::try_from(&original).unwrap();
    json_patch::patch(&mut patched, &injection.patch.unwrap()).unwrap();

    let structural = injector
        .inject_stream(DEPLOYMENT.as_bytes(), &StreamContext::default())
        .unwrap();
    let expected = serde_json::Value::try_from(structural.documents[1].object().unwrap()).unwrap();
    assert_eq!(patched, expected);
}

#[test]
fn itest_uninject_round_trip() {
    let injector = injector_with(&[(ConfigKey::ProxyUid, "2103")], CLI_CREATOR);
    let injected = inject(&injector, DEPLOYMENT);

    let uninjected = injector
        .uninject_stream(injected.as_bytes())
        .unwrap()
        .render()
        .unwrap();

    assert_eq!(uninjected, serialize(&scan(DEPLOYMENT.as_bytes())).unwrap());
    assert_eq!(inject(&injector, &uninjected), injected);
}

#[test]
fn itest_structural_apply_targets_template_only() {
    let documents = scan(DEPLOYMENT.as_bytes());
    let mut deployment = documents[1].object().unwrap().clone();
    let workload = classify(&deployment).unwrap();
    let before = deployment.get(&Path::from("metadata")).cloned();

    let patch = injector::patch::build(
        &injector::config::InjectionConfig {
            disable_identity: true,
            ..Default::default()
        },
        &injector::patch::BuildContext {
            workload: &workload,
            creator: CLI_CREATOR,
            overrides: &ConfigLayer::new(LayerSource::Override),
        },
    )
    .unwrap();
    apply_to_object(&mut deployment, &workload, &patch).unwrap();

    assert_eq!(deployment.get(&Path::from("metadata")).cloned(), before);
}
