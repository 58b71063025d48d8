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

use super::{ConfigLayer, InjectionConfig, LayerSource};
use crate::error::ConfigError;

/// Merges the workload specific layers over `defaults`, field by field.
pub fn resolve(
    defaults: &InjectionConfig,
    namespace: &ConfigLayer,
    pod: &ConfigLayer,
    overrides: &ConfigLayer,
) -> Result<InjectionConfig, ConfigError> {
    let mut config = defaults.clone();
    namespace.apply_to(&mut config)?;
    pod.apply_to(&mut config)?;
    overrides.apply_to(&mut config)?;
    Ok(config)
}

/// Holds the layers that are the same for every workload of an invocation.
///
/// Built-in defaults, the config file layer and the cluster layer are folded once
/// into a base config; namespace and pod annotations are layered on per workload
/// and the caller overrides always come last.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    base: InjectionConfig,
    overrides: ConfigLayer,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        ConfigResolver {
            base: InjectionConfig::default(),
            overrides: ConfigLayer::new(LayerSource::Override),
        }
    }
}

impl ConfigResolver {
    pub fn new(
        config_file: ConfigLayer,
        cluster: ConfigLayer,
        overrides: ConfigLayer,
    ) -> Result<Self, ConfigError> {
        let mut base = InjectionConfig::default();
        config_file.apply_to(&mut base)?;
        cluster.apply_to(&mut base)?;
        // validated up front so that a bad flag fails before any document is touched
        overrides.apply_to(&mut base.clone())?;

        Ok(ConfigResolver { base, overrides })
    }

    pub fn base(&self) -> &InjectionConfig {
        &self.base
    }

    pub fn overrides(&self) -> &ConfigLayer {
        &self.overrides
    }

    pub fn resolve(
        &self,
        namespace_annotations: &BTreeMap<String, String>,
        pod_annotations: &BTreeMap<String, String>,
    ) -> Result<InjectionConfig, ConfigError> {
        let namespace = ConfigLayer::from_annotations(LayerSource::Namespace, namespace_annotations)?;
        let pod = ConfigLayer::from_annotations(LayerSource::Pod, pod_annotations)?;
        resolve(&self.base, &namespace, &pod, &self.overrides)
    }
}

//////////////////////////////////////////////////////////////////////////////
//                 ########  #######    #########  #########                //
//                    ##     ##        ##             ##                    //
//                    ##     #####     #########      ##                    //
//                    ##     ##                ##     ##                    //
//                    ##     #######   #########      ##                    //
//////////////////////////////////////////////////////////////////////////////
