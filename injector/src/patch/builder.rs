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

use super::proxy::{identity_volume, init_container, proxy_container};
use super::{Patch, PatchOperation};
use crate::config::{ConfigKey, ConfigLayer, InjectionConfig};
use crate::error::ConfigError;
use crate::scanner::WorkloadRef;
use crate::{
    CONTROL_PLANE_NS_LABEL, CREATED_BY_ANNOTATION, IDENTITY_MODE_ANNOTATION, INJECTOR_VERSION,
    PROXY_LABEL_PREFIX, PROXY_VERSION_ANNOTATION,
};

const IDENTITY_MODE_DEFAULT: &str = "default";
const IDENTITY_MODE_DISABLED: &str = "disabled";

/// Workload facts the patch depends on besides the resolved config.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub workload: &'a WorkloadRef,
    /// `linkerd/cli` or `linkerd/proxy-injector`.
    pub creator: &'a str,
    pub overrides: &'a ConfigLayer,
}

fn require_non_empty(key: ConfigKey, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingValue {
            key: key.to_string(),
            reason: "the value must not be empty".to_string(),
        });
    }
    Ok(())
}

fn validate(config: &InjectionConfig) -> Result<(), ConfigError> {
    require_non_empty(ConfigKey::ProxyImage, &config.proxy_image)?;
    require_non_empty(ConfigKey::InitImage, &config.init_image)?;
    require_non_empty(ConfigKey::LinkerdNamespace, &config.linkerd_namespace)?;
    if !config.disable_identity && config.identity_trust_anchors_pem.is_none() {
        return Err(ConfigError::MissingValue {
            key: ConfigKey::IdentityTrustAnchorsPem.to_string(),
            reason: "identity is enabled but no trust anchors are configured".to_string(),
        });
    }
    Ok(())
}

/// `config.linkerd.io/<key>` for every overridden key that differs from the built-in
/// default, in key order.
fn override_annotations(config: &InjectionConfig, overrides: &ConfigLayer) -> Vec<(String, String)> {
    let built_in = InjectionConfig::default();
    overrides
        .keys()
        .filter(|key| !key.is_global_only())
        .filter_map(|key| {
            let value = config.value_of(key)?;
            (built_in.value_of(key).as_deref() != Some(value.as_str()))
                .then(|| (key.annotation(), value))
        })
        .collect()
}

pub fn build(config: &InjectionConfig, context: &BuildContext) -> Result<Patch, ConfigError> {
    validate(config)?;

    let mut patch = Patch::default();
    patch.push(PatchOperation::AddContainer(Box::new(proxy_container(config))));
    patch.push(PatchOperation::AddInitContainer(Box::new(init_container(config))));
    if !config.disable_identity {
        patch.push(PatchOperation::AddVolume(Box::new(identity_volume())));
    }

    let identity_mode = if config.disable_identity {
        IDENTITY_MODE_DISABLED
    } else {
        IDENTITY_MODE_DEFAULT
    };
    let annotations = [
        (
            CREATED_BY_ANNOTATION.to_string(),
            format!("{} {INJECTOR_VERSION}", context.creator),
        ),
        (
            PROXY_VERSION_ANNOTATION.to_string(),
            config.linkerd_version.clone(),
        ),
        (
            IDENTITY_MODE_ANNOTATION.to_string(),
            identity_mode.to_string(),
        ),
    ]
    .into_iter()
    .chain(override_annotations(config, context.overrides));
    for (key, value) in annotations {
        patch.push(PatchOperation::AddAnnotation { key, value });
    }

    patch.push(PatchOperation::AddLabel {
        key: CONTROL_PLANE_NS_LABEL.to_string(),
        value: config.linkerd_namespace.clone(),
    });
    let workload = context.workload;
    if workload.is_owner() && !workload.name.is_empty() {
        patch.push(PatchOperation::AddLabel {
            key: format!("{PROXY_LABEL_PREFIX}{}", workload.kind.to_lowercase()),
            value: workload.name.clone(),
        });
    }

    log::debug!(
        "Built patch with {} operation(s) for {} '{}'.",
        patch.operations().len(),
        workload.kind,
        workload.name
    );
    Ok(patch)
}

//////////////////////////////////////////////////////////////////////////////
//                 ########  #######    #########  #########                //
//                    ##     ##        ##             ##                    //
//                    ##     #####     #########      ##                    //
//                    ##     ##                ##     ##                    //
//                    ##     #######   #########      ##                    //
//////////////////////////////////////////////////////////////////////////////
