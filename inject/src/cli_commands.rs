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

mod inject_manifests;
mod uninject_manifests;

use std::io::{self, Read};

use injector::cluster::ClusterLookup;
use injector::eligibility::InjectionDecision;
use injector::pipeline::{InjectionOutput, UninjectionOutput};

use crate::cli_error::CliError;
use crate::inject_config::InjectConfig;
use crate::{output, output_debug, output_warn};

const STDIN_SOURCE: &str = "-";

/// Reads the whole manifest stream from `file`, `-` being stdin.
pub fn read_input(file: &str) -> Result<Vec<u8>, CliError> {
    let mut content = Vec::new();
    if file == STDIN_SOURCE {
        io::stdin().read_to_end(&mut content)?;
        return Ok(content);
    }

    match std::fs::File::open(file) {
        Ok(mut open_file) => {
            open_file.read_to_end(&mut content)?;
            output_debug!("Read {} byte(s) from '{}'.", content.len(), file);
            Ok(content)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(CliError::InputError(format!("File '{}' not found!", file)))
        }
        Err(err) => Err(err.into()),
    }
}

pub fn report_injection(output: &InjectionOutput) {
    for warning in &output.warnings {
        output_warn!("{warning}");
    }
    for report in &output.reports {
        match report.decision {
            InjectionDecision::Conflict(_) => output_warn!("{report}"),
            _ => output!("{report}"),
        }
    }
}

pub fn report_uninjection(output: &UninjectionOutput) {
    for warning in &output.warnings {
        output_warn!("{warning}");
    }
    for report in &output.reports {
        output!("{report}");
    }
}

pub struct CliCommands {
    config: InjectConfig,
    cluster: Option<Box<dyn ClusterLookup>>,
}

impl CliCommands {
    /// Without a cluster lookup only the config file and the flags are used.
    pub fn init(config: InjectConfig, cluster: Option<Box<dyn ClusterLookup>>) -> Self {
        Self { config, cluster }
    }
}

//////////////////////////////////////////////////////////////////////////////
//                 ########  #######    #########  #########                //
//                    ##     ##        ##             ##                    //
//                    ##     #####     #########      ##                    //
//                    ##     ##                ##     ##                    //
//                    ##     #######   #########      ##                    //
//////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::io::Write;

    use async_trait::async_trait;
    use injector::cluster::{ClusterError, ClusterLookup};
    use injector::config::ConfigLayer;
    use injector::eligibility::InjectionDecision;
    use injector::pipeline::{InjectionOutput, WorkloadReport};
    use injector::scanner::scan;
    use tempfile::NamedTempFile;

    use super::{read_input, report_injection};
    use crate::cli_error::CliError;
    use crate::output::tests::capture_output;

    mockall::mock! {
        pub Lookup {}

        #[async_trait]
        impl ClusterLookup for Lookup {
            async fn namespace_annotations(
                &self,
                namespace: &str,
            ) -> Result<BTreeMap<String, String>, ClusterError>;

            async fn proxy_defaults(
                &self,
                linkerd_namespace: &str,
            ) -> Result<ConfigLayer, ClusterError>;
        }
    }

    pub fn manifest_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create tempfile");
        write!(file, "{content}").expect("Failed to write to tempfile");
        file
    }

    #[test]
    fn utest_read_input_from_file() {
        let file = manifest_file("kind: Pod\n");

        let content = read_input(file.path().to_str().unwrap()).unwrap();

        assert_eq!(content, b"kind: Pod\n");
    }

    #[test]
    fn utest_read_input_missing_file() {
        assert_eq!(
            read_input("/non/existing/manifest.yaml"),
            Err(CliError::InputError(
                "File '/non/existing/manifest.yaml' not found!".to_string()
            ))
        );
    }

    #[test]
    fn utest_report_injection_lines() {
        let output = InjectionOutput {
            documents: scan(b"kind: Pod\n"),
            reports: vec![
                WorkloadReport {
                    kind: "Deployment".to_string(),
                    name: "web".to_string(),
                    decision: InjectionDecision::Inject,
                },
                WorkloadReport {
                    kind: "DaemonSet".to_string(),
                    name: "agent".to_string(),
                    decision: InjectionDecision::Conflict("hostNetwork is enabled".to_string()),
                },
            ],
            warnings: Vec::new(),
        };

        let printed = capture_output(false, false, || report_injection(&output));

        let lines: Vec<&str> = printed.lines().collect();
        assert_eq!(lines[0], "deployment \"web\" injected");
        assert!(lines[1].ends_with("daemonset \"agent\" not injected: hostNetwork is enabled"));
    }
}
