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

use std::collections::BTreeSet;

use injector::CLI_CREATOR;
use injector::cluster::ClusterLookup;
use injector::config::{ConfigLayer, ConfigResolver, InjectionConfig, LayerSource};
use injector::pipeline::{InjectionOutput, Injector, StreamContext};
use injector::scanner::{classify_all, scan};

use super::{CliCommands, read_input};
use crate::cli::InjectArgs;
use crate::cli_error::CliError;
use crate::output_debug;

/// Control plane namespace as seen before the cluster layer is known.
fn linkerd_namespace(
    config_file: &ConfigLayer,
    overrides: &ConfigLayer,
) -> Result<String, CliError> {
    let mut config = InjectionConfig::default();
    config_file.apply_to(&mut config)?;
    overrides.apply_to(&mut config)?;
    Ok(config.linkerd_namespace)
}

async fn stream_context(
    cluster: &dyn ClusterLookup,
    input: &[u8],
) -> Result<StreamContext, CliError> {
    let mut context = StreamContext::default();
    let namespaces: BTreeSet<String> = scan(input)
        .iter()
        .flat_map(classify_all)
        .map(|workload| {
            workload
                .namespace
                .unwrap_or_else(|| context.default_namespace.clone())
        })
        .collect();

    for namespace in namespaces {
        let annotations = cluster.namespace_annotations(&namespace).await?;
        context.namespace_annotations.insert(namespace, annotations);
    }
    Ok(context)
}

impl CliCommands {
    pub async fn inject_manifests(&self, args: &InjectArgs) -> Result<InjectionOutput, CliError> {
        let overrides = args.overrides()?;
        let config_file = self.config.defaults_layer()?;
        let input = read_input(&args.file)?;

        let (cluster_layer, context) = match &self.cluster {
            Some(cluster) if !args.ignore_cluster => {
                let namespace = linkerd_namespace(&config_file, &overrides)?;
                output_debug!("Reading cluster defaults from namespace '{namespace}'.");
                let cluster_layer = cluster.proxy_defaults(&namespace).await?;
                let context = stream_context(cluster.as_ref(), &input).await?;
                (cluster_layer, context)
            }
            _ => (
                ConfigLayer::new(LayerSource::Cluster),
                StreamContext::default(),
            ),
        };

        let resolver = ConfigResolver::new(config_file, cluster_layer, overrides)?;
        let output = Injector::new(resolver, CLI_CREATOR).inject_stream(&input, &context)?;
        output_debug!(
            "Processed {} document(s) with {} workload report(s).",
            output.documents.len(),
            output.reports.len()
        );
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
