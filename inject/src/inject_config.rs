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
use std::fmt;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use injector::config::{ConfigLayer, LayerSource};
use injector::error::ConfigError;
use serde::Deserialize;
use toml::{Value, from_str};

use crate::cli::InjectCli;

#[cfg(not(test))]
use injector::std_extensions::ExitGracefully;
#[cfg(not(test))]
use once_cell::sync::Lazy;
#[cfg(not(test))]
use std::env;

pub const CONFIG_VERSION: &str = "v1";

#[cfg(not(test))]
pub static DEFAULT_INJECT_CONFIG_FILE_PATH: Lazy<String> = Lazy::new(|| {
    let home_dir = env::var("HOME").unwrap_or_exit("HOME environment variable not set");
    format!("{}/.config/linkerd/inject.conf", home_dir)
});

#[cfg(test)]
pub const DEFAULT_INJECT_CONFIG_FILE_PATH: &str = "/tmp/linkerd-inject-test/inject.conf";

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ConversionErrors {
    WrongVersion(String),
    InvalidInjectConfig(String),
}

impl fmt::Display for ConversionErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionErrors::WrongVersion(msg) => write!(f, "Wrong version: {}", msg),
            ConversionErrors::InvalidInjectConfig(msg) => {
                write!(f, "Inject config could not have been parsed due to: {}", msg)
            }
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct InjectConfig {
    pub version: String,
    pub verbose: bool,
    pub quiet: bool,
    /// Raw `[defaults]` entries, validated when turned into a layer.
    pub defaults: BTreeMap<String, String>,
}

#[derive(Deserialize, Debug)]
struct InjectConfigHelper {
    version: String,
    #[serde(default)]
    verbose: bool,
    #[serde(default)]
    quiet: bool,
    #[serde(default)]
    defaults: BTreeMap<String, Value>,
}

impl TryFrom<InjectConfigHelper> for InjectConfig {
    type Error = ConversionErrors;

    fn try_from(helper: InjectConfigHelper) -> Result<Self, Self::Error> {
        let defaults = helper
            .defaults
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(text) => Ok((key, text)),
                Value::Integer(number) => Ok((key, number.to_string())),
                Value::Boolean(flag) => Ok((key, flag.to_string())),
                _ => Err(ConversionErrors::InvalidInjectConfig(format!(
                    "default '{key}' must be a string, integer or boolean"
                ))),
            })
            .collect::<Result<_, _>>()?;

        Ok(InjectConfig {
            version: helper.version,
            verbose: helper.verbose,
            quiet: helper.quiet,
            defaults,
        })
    }
}

impl Default for InjectConfig {
    fn default() -> Self {
        InjectConfig {
            version: CONFIG_VERSION.to_string(),
            verbose: bool::default(),
            quiet: bool::default(),
            defaults: BTreeMap::new(),
        }
    }
}

impl InjectConfig {
    pub fn from_file(file_path: &Path) -> Result<InjectConfig, ConversionErrors> {
        let inject_config_content = read_to_string(file_path).map_err(|err| {
            ConversionErrors::InvalidInjectConfig(format!("'{}': {err}", file_path.display()))
        })?;
        let helper: InjectConfigHelper = from_str(&inject_config_content)
            .map_err(|err| ConversionErrors::InvalidInjectConfig(err.to_string()))?;

        if helper.version != CONFIG_VERSION {
            return Err(ConversionErrors::WrongVersion(helper.version));
        }

        helper.try_into()
    }

    /// Reads the file at `config_path`. Without an explicit path the default file
    /// is optional and the built-in defaults are used when it does not exist.
    pub fn load(config_path: Option<&str>) -> Result<InjectConfig, ConversionErrors> {
        match config_path {
            Some(path) => InjectConfig::from_file(Path::new(path)),
            None => {
                let default_path = PathBuf::from(DEFAULT_INJECT_CONFIG_FILE_PATH.to_string());
                if default_path.exists() {
                    InjectConfig::from_file(&default_path)
                } else {
                    log::debug!(
                        "No config file at '{}', using built-in defaults.",
                        default_path.display()
                    );
                    Ok(InjectConfig::default())
                }
            }
        }
    }

    pub fn update_with_args(&mut self, args: &InjectCli) {
        if args.verbose {
            self.verbose = true;
        }
        if args.quiet {
            self.quiet = true;
        }
    }

    pub fn defaults_layer(&self) -> Result<ConfigLayer, ConfigError> {
        ConfigLayer::from_pairs(LayerSource::ConfigFile, &self.defaults)
    }
}

//////////////////////////////////////////////////////////////////////////////
//                 ########  #######    #########  #########                //
//                    ##     ##        ##             ##                    //
//                    ##     #####     #########      ##                    //
//                    ##     ##                ##     ##                    //
//                    ##     #######   #########      ##                    //
//////////////////////////////////////////////////////////////////////////////
