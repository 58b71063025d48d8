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

use clap::Parser;
use std::net::SocketAddr;

pub fn parse() -> Arguments {
    Arguments::parse()
}

#[derive(Parser, Debug, Default)]
#[clap( version=env!("CARGO_PKG_VERSION"),
        about="Mutating admission webhook adding the service mesh proxy to created pods.")]
pub struct Arguments {
    #[clap(short = 'c', long = "config", env = "INJECT_WEBHOOK_CONFIG")]
    /// The path to the webhook config file.
    pub config_path: Option<String>,
    #[clap(short = 'a', long = "address")]
    /// The address, including the port, the webhook shall listen at.
    pub addr: Option<SocketAddr>,
    #[clap(
        short = 'k',
        long = "insecure",
        env = "INJECT_WEBHOOK_INSECURE",
        default_value_t = false
    )]
    /// Flag to serve plain HTTP instead of HTTPS.
    pub insecure: bool,
    #[clap(long = "crt_pem", env = "INJECT_WEBHOOK_CRT_PEM")]
    /// Path to webhook certificate pem file.
    pub crt_pem: Option<String>,
    #[clap(long = "key_pem", env = "INJECT_WEBHOOK_KEY_PEM")]
    /// Path to webhook key pem file.
    pub key_pem: Option<String>,
    #[clap(long = "request-timeout-ms")]
    /// Time budget for a single admission request.
    pub request_timeout_ms: Option<u64>,
    #[clap(long = "ignore-cluster")]
    /// Do not read defaults and namespace annotations from the cluster.
    pub ignore_cluster: bool,
}
// There is no business logic to test here, only the clap configuration.
