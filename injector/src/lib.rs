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

pub const PATH_SEPARATOR: char = '.';
pub const INJECTOR_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const CLI_CREATOR: &str = "linkerd/cli";
pub const PROXY_INJECTOR_CREATOR: &str = "linkerd/proxy-injector";

// Annotations and labels written and read back by the engine.
pub const CONFIG_ANNOTATION_PREFIX: &str = "config.linkerd.io/";
pub const LINKERD_ANNOTATION_PREFIX: &str = "linkerd.io/";
pub const INJECT_ANNOTATION: &str = "linkerd.io/inject";
pub const INJECT_DISABLED: &str = "disabled";
pub const CREATED_BY_ANNOTATION: &str = "linkerd.io/created-by";
pub const PROXY_VERSION_ANNOTATION: &str = "linkerd.io/proxy-version";
pub const IDENTITY_MODE_ANNOTATION: &str = "linkerd.io/identity-mode";
pub const CONTROL_PLANE_NS_LABEL: &str = "linkerd.io/control-plane-ns";
pub const PROXY_LABEL_PREFIX: &str = "linkerd.io/proxy-";

pub const PROXY_CONTAINER_NAME: &str = "linkerd-proxy";
pub const INIT_CONTAINER_NAME: &str = "linkerd-init";
pub const IDENTITY_VOLUME_NAME: &str = "linkerd-identity-end-entity";

#[cfg(feature = "cluster")]
pub mod cluster;
pub mod config;
pub mod document;
pub mod eligibility;
pub mod error;
pub mod patch;
pub mod pipeline;
pub mod renderer;
pub mod scanner;
pub mod std_extensions;
pub mod uninject;
