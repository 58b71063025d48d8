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

mod admission;
mod cli;
mod server;
mod webhook_config;

use std::sync::Arc;
use std::time::Duration;

use injector::PROXY_INJECTOR_CREATOR;
use injector::cluster::{ClusterLookup, KubeClusterLookup};
use injector::config::{ConfigLayer, ConfigResolver, LayerSource};
use injector::pipeline::Injector;
use injector::std_extensions::ExitGracefully;

use admission::WebhookState;
use webhook_config::WebhookConfig;

#[tokio::main]
async fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    // kube and axum-server pull in different rustls crypto backends
    let _ = rustls::crypto::ring::default_provider().install_default();

    let args = cli::parse();
    let mut config = WebhookConfig::load(args.config_path.as_deref())
        .unwrap_or_exit("Could not load the webhook config");
    config.update_with_args(&args);

    log::debug!(
        "Starting the webhook with \n\taddress: '{}', \n\tinsecure: '{}', \n\trequest timeout: '{}ms'",
        config.address,
        config.insecure.unwrap_or_default(),
        config.request_timeout_ms,
    );

    let config_file = config
        .defaults_layer()
        .unwrap_or_exit("Invalid defaults in the webhook config");

    let cluster: Option<Arc<dyn ClusterLookup>> = if config.ignore_cluster {
        None
    } else {
        Some(Arc::new(
            KubeClusterLookup::try_default()
                .await
                .unwrap_or_exit("Could not connect to the cluster"),
        ))
    };

    let cluster_layer = match &cluster {
        Some(cluster) => {
            let linkerd_namespace = ConfigResolver::new(
                config_file.clone(),
                ConfigLayer::new(LayerSource::Cluster),
                ConfigLayer::new(LayerSource::Override),
            )
            .unwrap_or_exit("Invalid configuration")
            .base()
            .linkerd_namespace
            .clone();
            cluster
                .proxy_defaults(&linkerd_namespace)
                .await
                .unwrap_or_exit("Could not read the cluster defaults")
        }
        None => ConfigLayer::new(LayerSource::Cluster),
    };

    let resolver = ConfigResolver::new(
        config_file,
        cluster_layer,
        ConfigLayer::new(LayerSource::Override),
    )
    .unwrap_or_exit("Invalid configuration");

    let state = Arc::new(WebhookState::new(
        Injector::new(resolver, PROXY_INJECTOR_CREATOR),
        cluster,
        Duration::from_millis(config.request_timeout_ms),
    ));

    let tls_files = config
        .tls_files()
        .unwrap_or_exit("Missing certificates files");
    server::serve(config.address, tls_files, server::router(state))
        .await
        .unwrap_or_exit("webhook error");
}
