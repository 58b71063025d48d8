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

use injector::CLI_CREATOR;
use injector::config::ConfigResolver;
use injector::pipeline::{Injector, UninjectionOutput};

use super::{CliCommands, read_input};
use crate::cli::UninjectArgs;
use crate::cli_error::CliError;

impl CliCommands {
    /// Uninjection needs neither the config file nor the cluster.
    pub fn uninject_manifests(&self, args: &UninjectArgs) -> Result<UninjectionOutput, CliError> {
        let input = read_input(&args.file)?;
        let injector = Injector::new(ConfigResolver::default(), CLI_CREATOR);
        Ok(injector.uninject_stream(&input)?)
    }
}

//////////////////////////////////////////////////////////////////////////////
//                 ########  #######    #########  #########                //
//                    ##     ##        ##             ##                    //
//                    ##     #####     #########      ##                    //
//                    ##     ##                ##     ##                    //
//                    ##     #######   #########      ##                    //
//////////////////////////////////////////////////////////////////////////////
