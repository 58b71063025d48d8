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

use crate::config::LayerSource;

/// A single document of the input stream could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub index: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Could not parse document #{}: '{}'",
            self.index, self.message
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: String,
        layer: LayerSource,
        value: String,
        reason: String,
    },
    MissingValue {
        key: String,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue {
                key,
                layer,
                value,
                reason,
            } => write!(
                f,
                "Invalid value '{value}' for '{key}' in {layer} configuration: {reason}"
            ),
            ConfigError::MissingValue { key, reason } => {
                write!(f, "Missing value for '{key}': {reason}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InjectError {
    Config(ConfigError),
    DeadlineExceeded { processed: usize },
    Render(String),
}

impl fmt::Display for InjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectError::Config(error) => write!(f, "{error}"),
            InjectError::DeadlineExceeded { processed } => write!(
                f,
                "Deadline exceeded after {processed} processed document(s)"
            ),
            InjectError::Render(message) => {
                write!(f, "Could not render the manifest: '{message}'")
            }
        }
    }
}

impl From<ConfigError> for InjectError {
    fn from(value: ConfigError) -> Self {
        InjectError::Config(value)
    }
}

impl From<serde_yaml::Error> for InjectError {
    fn from(value: serde_yaml::Error) -> Self {
        InjectError::Render(value.to_string())
    }
}

impl From<serde_json::Error> for InjectError {
    fn from(value: serde_json::Error) -> Self {
        InjectError::Render(value.to_string())
    }
}

//////////////////////////////////////////////////////////////////////////////
//                 ########  #######    #########  #########                //
//                    ##     ##        ##             ##                    //
//                    ##     #####     #########      ##                    //
//                    ##     ##                ##     ##                    //
//                    ##     #######   #########      ##                    //
//////////////////////////////////////////////////////////////////////////////
