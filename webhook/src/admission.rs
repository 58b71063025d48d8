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
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use injector::cluster::{ClusterError, ClusterLookup};
use injector::document::Object;
use injector::error::InjectError;
use injector::pipeline::Injector;
use kube::{
    api::DynamicObject,
    core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, SerializePatchError},
};

const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("invalid admission review: {0}")]
    InvalidReview(String),

    #[error("unsupported request: {0}")]
    UnsupportedMediaType(String),

    #[error("object could not be read: {0}")]
    Object(#[from] serde_yaml::Error),

    #[error("namespace lookup failed: {0}")]
    Cluster(ClusterError),

    #[error("injection failed: {0}")]
    Inject(InjectError),

    #[error("patch serialization error: {0}")]
    Patch(#[from] SerializePatchError),
}

impl From<ClusterError> for WebhookError {
    fn from(value: ClusterError) -> Self {
        WebhookError::Cluster(value)
    }
}

impl From<InjectError> for WebhookError {
    fn from(value: InjectError) -> Self {
        WebhookError::Inject(value)
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::InvalidReview(_) => StatusCode::BAD_REQUEST,
            WebhookError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}

/// Everything a request handler needs, shared between all requests.
pub struct WebhookState {
    pub injector: Injector,
    pub cluster: Option<Arc<dyn ClusterLookup>>,
    pub request_timeout: Duration,
}

impl WebhookState {
    pub fn new(
        injector: Injector,
        cluster: Option<Arc<dyn ClusterLookup>>,
        request_timeout: Duration,
    ) -> Self {
        WebhookState {
            injector,
            cluster,
            request_timeout,
        }
    }
}

/// Handles a mutating admission review. Admission is never denied; any failure while
/// injecting lets the object through unchanged.
pub async fn mutate_handler(
    State(state): State<Arc<WebhookState>>,
    body: Result<Json<AdmissionReview<DynamicObject>>, JsonRejection>,
) -> Result<Json<AdmissionReview<DynamicObject>>, WebhookError> {
    let body = match body {
        Ok(Json(body)) => body,
        Err(JsonRejection::MissingJsonContentType(rejection)) => {
            return Err(WebhookError::UnsupportedMediaType(rejection.body_text()));
        }
        Err(rejection) => {
            log::error!("Failed to parse admission review: {}", rejection.body_text());
            return Ok(Json(
                AdmissionResponse::invalid(rejection.body_text()).into_review(),
            ));
        }
    };

    let request: AdmissionRequest<DynamicObject> = match body.try_into() {
        Ok(request) => request,
        Err(err) => {
            log::error!("Failed to parse admission request: {err}");
            return Ok(Json(AdmissionResponse::invalid(err.to_string()).into_review()));
        }
    };

    let response =
        match tokio::time::timeout(state.request_timeout, mutate_object(&state, &request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                log::warn!("Admitting '{}' without injection: {err}", request.uid);
                AdmissionResponse::from(&request)
            }
            Err(_) => {
                log::warn!(
                    "Admitting '{}' without injection: no decision within {:?}",
                    request.uid,
                    state.request_timeout
                );
                AdmissionResponse::from(&request)
            }
        };
    Ok(Json(response.into_review()))
}

fn namespace_of(request: &AdmissionRequest<DynamicObject>, object: &DynamicObject) -> String {
    request
        .namespace
        .clone()
        .or_else(|| object.metadata.namespace.clone())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
}

async fn mutate_object(
    state: &WebhookState,
    request: &AdmissionRequest<DynamicObject>,
) -> Result<AdmissionResponse, WebhookError> {
    let Some(object) = &request.object else {
        log::debug!("No object in request '{}', allowing unchanged", request.uid);
        return Ok(AdmissionResponse::from(request));
    };

    let namespace = namespace_of(request, object);
    let namespace_annotations = match &state.cluster {
        Some(cluster) => cluster.namespace_annotations(&namespace).await?,
        None => BTreeMap::new(),
    };

    let document = Object::from(serde_yaml::to_value(object)?);
    let injection = state
        .injector
        .inject_object(&document, &namespace_annotations)?;
    log::info!(
        "{} '{}' in namespace '{namespace}': {}",
        request.kind.kind,
        request.name,
        injection.decision
    );

    match injection.patch {
        Some(patch) => Ok(AdmissionResponse::from(request).with_patch(patch)?),
        None => Ok(AdmissionResponse::from(request)),
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
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{Json, extract::State};
    use injector::PROXY_INJECTOR_CREATOR;
    use injector::cluster::{ClusterError, ClusterLookup};
    use injector::config::{ConfigKey, ConfigLayer, ConfigResolver, LayerSource};
    use injector::pipeline::Injector;
    use kube::{api::DynamicObject, core::admission::AdmissionReview};
    use serde_json::json;

    use super::{WebhookState, mutate_handler};

    mockall::mock! {
        pub Lookup {}

        #[async_trait]
        impl ClusterLookup for Lookup {
            async fn namespace_annotations(
                &self,
                namespace: &str,
            ) -> Result<BTreeMap<String, String>, ClusterError>;

            async fn proxy_defaults(
                &self,
                linkerd_namespace: &str,
            ) -> Result<ConfigLayer, ClusterError>;
        }
    }

    struct SlowLookup;

    #[async_trait]
    impl ClusterLookup for SlowLookup {
        async fn namespace_annotations(
            &self,
            _namespace: &str,
        ) -> Result<BTreeMap<String, String>, ClusterError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(BTreeMap::new())
        }

        async fn proxy_defaults(&self, _: &str) -> Result<ConfigLayer, ClusterError> {
            Ok(ConfigLayer::new(LayerSource::Cluster))
        }
    }

    fn injector() -> Injector {
        let mut config_file = ConfigLayer::new(LayerSource::ConfigFile);
        config_file.set(ConfigKey::DisableIdentity, "true").unwrap();
        let resolver = ConfigResolver::new(
            config_file,
            ConfigLayer::new(LayerSource::Cluster),
            ConfigLayer::new(LayerSource::Override),
        )
        .unwrap();
        Injector::new(resolver, PROXY_INJECTOR_CREATOR)
    }

    fn state(cluster: Option<Arc<dyn ClusterLookup>>) -> State<Arc<WebhookState>> {
        State(Arc::new(WebhookState::new(
            injector(),
            cluster,
            Duration::from_millis(50),
        )))
    }

    fn review(object: serde_json::Value) -> Json<AdmissionReview<DynamicObject>> {
        let review = json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
                "kind": {"group": "", "version": "v1", "kind": "Pod"},
                "resource": {"group": "", "version": "v1", "resource": "pods"},
                "name": "web",
                "namespace": "shop",
                "operation": "CREATE",
                "userInfo": {"username": "admin"},
                "object": object,
                "dryRun": false
            }
        });
        Json(serde_json::from_value(review).unwrap())
    }

    fn pod(annotations: serde_json::Value) -> serde_json::Value {
        json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": "web", "annotations": annotations},
            "spec": {"containers": [{"name": "web", "image": "nginx"}]}
        })
    }

    async fn respond(
        state: State<Arc<WebhookState>>,
        review: Json<AdmissionReview<DynamicObject>>,
    ) -> serde_json::Value {
        let Json(response) = mutate_handler(state, Ok(review)).await.unwrap();
        serde_json::to_value(response).unwrap()["response"].clone()
    }

    #[tokio::test]
    async fn utest_mutate_handler_injects_pod() {
        let mut cluster = MockLookup::new();
        cluster
            .expect_namespace_annotations()
            .withf(|namespace| namespace == "shop")
            .times(1)
            .returning(|_| Ok(BTreeMap::new()));

        let response = respond(state(Some(Arc::new(cluster))), review(pod(json!({})))).await;

        assert_eq!(response["allowed"], json!(true));
        assert_eq!(response["patchType"], json!("JSONPatch"));
        assert!(response["patch"].is_string());
    }

    #[tokio::test]
    async fn utest_mutate_handler_namespace_opt_out() {
        let mut cluster = MockLookup::new();
        cluster.expect_namespace_annotations().returning(|_| {
            Ok(BTreeMap::from([(
                "linkerd.io/inject".to_string(),
                "disabled".to_string(),
            )]))
        });

        let response = respond(state(Some(Arc::new(cluster))), review(pod(json!({})))).await;

        assert_eq!(response["allowed"], json!(true));
        assert!(response.get("patch").is_none_or(|patch| patch.is_null()));
    }

    #[tokio::test]
    async fn utest_mutate_handler_fails_open_on_invalid_annotation() {
        let response = respond(
            state(None),
            review(pod(json!({"config.linkerd.io/proxy-uid": "root"}))),
        )
        .await;

        assert_eq!(response["allowed"], json!(true));
        assert!(response.get("patch").is_none_or(|patch| patch.is_null()));
    }

    #[tokio::test]
    async fn utest_mutate_handler_fails_open_on_cluster_error() {
        let mut cluster = MockLookup::new();
        cluster
            .expect_namespace_annotations()
            .returning(|_| Err(ClusterError::Client("forbidden".to_string())));

        let response = respond(state(Some(Arc::new(cluster))), review(pod(json!({})))).await;

        assert_eq!(response["allowed"], json!(true));
        assert!(response.get("patch").is_none_or(|patch| patch.is_null()));
    }

    #[tokio::test]
    async fn utest_mutate_handler_fails_open_on_timeout() {
        let response = respond(state(Some(Arc::new(SlowLookup))), review(pod(json!({})))).await;

        assert_eq!(response["allowed"], json!(true));
        assert!(response.get("patch").is_none_or(|patch| patch.is_null()));
    }

    #[tokio::test]
    async fn utest_mutate_handler_invalid_review() {
        let review: AdmissionReview<DynamicObject> = serde_json::from_value(json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview"
        }))
        .unwrap();

        let Json(response) = mutate_handler(state(None), Ok(Json(review))).await.unwrap();
        let response = serde_json::to_value(response).unwrap()["response"].clone();

        assert_eq!(response["allowed"], json!(false));
    }
}
