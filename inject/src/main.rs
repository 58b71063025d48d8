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

mod cli;
mod cli_commands;
mod cli_error;
mod inject_config;
mod output;

use std::io::{self, Write};

use injector::cluster::{ClusterLookup, KubeClusterLookup};

use cli_commands::{CliCommands, report_injection, report_uninjection};
use inject_config::InjectConfig;

fn print_manifests(manifests: &str) {
    let mut stdout = io::stdout().lock();
    if let Err(error) = stdout
        .write_all(manifests.as_bytes())
        .and_then(|_| stdout.flush())
    {
        output_and_error!("Failed to write the manifests: '{}'", error);
    }
}

#[tokio::main]
async fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));
    // the kube client needs an explicit rustls crypto backend
    let _ = rustls::crypto::ring::default_provider().install_default();
    let args = cli::parse();

    let mut config = match InjectConfig::load(args.config_path.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            output_and_error!("Failed to load the config file: '{}'", error);
            return;
        }
    };
    config.update_with_args(&args);
    output::set_verbosity(config.verbose, config.quiet);

    match args.command {
        cli::Commands::Inject(inject_args) => {
            log::info!("Got inject with: file={:?}", inject_args.file);
            let cluster: Option<Box<dyn ClusterLookup>> = if inject_args.ignore_cluster {
                None
            } else {
                match KubeClusterLookup::try_default().await {
                    Ok(lookup) => Some(Box::new(lookup)),
                    Err(error) => {
                        output_and_error!("{}", error);
                        return;
                    }
                }
            };

            let cmd = CliCommands::init(config, cluster);
            match cmd
                .inject_manifests(&inject_args)
                .await
                .and_then(|output| Ok((output.render()?, output)))
            {
                Ok((manifests, output)) => {
                    print_manifests(&manifests);
                    report_injection(&output);
                }
                Err(error) => output_and_error!("{}", error),
            }
        }
        cli::Commands::Uninject(uninject_args) => {
            log::info!("Got uninject with: file={:?}", uninject_args.file);
            let cmd = CliCommands::init(config, None);
            match cmd
                .uninject_manifests(&uninject_args)
                .and_then(|output| Ok((output.render()?, output)))
            {
                Ok((manifests, output)) => {
                    print_manifests(&manifests);
                    report_uninjection(&output);
                }
                Err(error) => output_and_error!("{}", error),
            }
        }
    }
}
