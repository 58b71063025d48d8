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

use std::fmt;

use injector::cluster::ClusterError;
use injector::error::{ConfigError, InjectError};

use crate::inject_config::ConversionErrors;

#[derive(Debug, Clone, PartialEq)]
pub enum CliError {
    InputError(String),
    ConfigFile(ConversionErrors),
    Config(ConfigError),
    Cluster(ClusterError),
    ExecutionError(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CliError::InputError(message) => {
                write!(f, "Could not read the manifests: '{message}'")
            }
            CliError::ConfigFile(error) => write!(f, "{error}"),
            CliError::Config(error) => write!(f, "{error}"),
            CliError::Cluster(error) => write!(f, "{error}"),
            CliError::ExecutionError(message) => {
                write!(f, "Command failed: '{}'", message)
            }
        }
    }
}

impl From<ConversionErrors> for CliError {
    fn from(value: ConversionErrors) -> Self {
        CliError::ConfigFile(value)
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        CliError::Config(value)
    }
}

impl From<ClusterError> for CliError {
    fn from(value: ClusterError) -> Self {
        match value {
            ClusterError::Config(error) => CliError::Config(error),
            other => CliError::Cluster(other),
        }
    }
}

impl From<InjectError> for CliError {
    fn from(value: InjectError) -> Self {
        match value {
            InjectError::Config(error) => CliError::Config(error),
            other => CliError::ExecutionError(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        CliError::InputError(value.to_string())
    }
}
