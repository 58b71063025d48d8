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

use clap::{Args, Parser, Subcommand};
use injector::config::{ConfigKey, ConfigLayer, LayerSource};
use injector::error::ConfigError;

pub const INJECT_CONFIG_ENV_KEY: &str = "INJECT_CONFIG";

#[derive(Parser, Debug)]
#[command(name = "inject")]
#[command(bin_name = "inject")]
#[command(version)]
/// Add the service mesh proxy to Kubernetes workload manifests
pub struct InjectCli {
    #[command(subcommand)]
    pub command: Commands,
    #[clap(long = "config", env = INJECT_CONFIG_ENV_KEY, global = true)]
    /// Path to the config file. Defaults to $HOME/.config/linkerd/inject.conf.
    pub config_path: Option<String>,
    #[clap(short = 'v', long = "verbose", global = true)]
    /// Enable debug traces
    pub verbose: bool,
    #[clap(short = 'q', long = "quiet", global = true)]
    /// Print nothing but the manifests and errors
    pub quiet: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Add the proxy and its init container to every supported workload
    #[command(arg_required_else_help = true)]
    Inject(InjectArgs),
    /// Remove everything a previous injection added
    #[command(arg_required_else_help = true)]
    Uninject(UninjectArgs),
}

#[derive(Args, Debug, Default)]
pub struct InjectArgs {
    /// Manifest file to read, '-' reads from stdin
    pub file: String,
    #[clap(long = "ignore-cluster")]
    /// Do not read defaults and namespace annotations from the cluster
    pub ignore_cluster: bool,
    #[clap(long = "linkerd-namespace")]
    /// Namespace of the control plane
    pub linkerd_namespace: Option<String>,
    #[clap(
        long = "disable-identity",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    /// Do not mount the identity volume and skip identity in the proxy
    pub disable_identity: Option<bool>,
    #[clap(long = "linkerd-version")]
    /// Tag used for the proxy and init images
    pub linkerd_version: Option<String>,
    #[clap(long = "proxy-image")]
    pub proxy_image: Option<String>,
    #[clap(long = "init-image")]
    pub init_image: Option<String>,
    #[clap(long = "image-pull-policy")]
    /// One of Always, IfNotPresent, Never
    pub image_pull_policy: Option<String>,
    #[clap(long = "control-port")]
    pub control_port: Option<String>,
    #[clap(long = "skip-inbound-ports")]
    /// Comma separated ports or port ranges the proxy does not intercept
    pub skip_inbound_ports: Option<String>,
    #[clap(long = "skip-outbound-ports")]
    /// Comma separated ports or port ranges the proxy does not intercept
    pub skip_outbound_ports: Option<String>,
    #[clap(long = "inbound-port")]
    pub inbound_port: Option<String>,
    #[clap(long = "admin-port")]
    pub admin_port: Option<String>,
    #[clap(long = "outbound-port")]
    pub outbound_port: Option<String>,
    #[clap(long = "proxy-cpu-request")]
    pub proxy_cpu_request: Option<String>,
    #[clap(long = "proxy-memory-request")]
    pub proxy_memory_request: Option<String>,
    #[clap(long = "proxy-cpu-limit")]
    pub proxy_cpu_limit: Option<String>,
    #[clap(long = "proxy-memory-limit")]
    pub proxy_memory_limit: Option<String>,
    #[clap(long = "proxy-uid")]
    pub proxy_uid: Option<String>,
    #[clap(long = "proxy-log-level")]
    pub proxy_log_level: Option<String>,
    #[clap(
        long = "enable-external-profiles",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub enable_external_profiles: Option<bool>,
}

impl InjectArgs {
    fn valued_flags(&self) -> [(ConfigKey, &Option<String>); 17] {
        [
            (ConfigKey::LinkerdNamespace, &self.linkerd_namespace),
            (ConfigKey::LinkerdVersion, &self.linkerd_version),
            (ConfigKey::ProxyImage, &self.proxy_image),
            (ConfigKey::InitImage, &self.init_image),
            (ConfigKey::ImagePullPolicy, &self.image_pull_policy),
            (ConfigKey::ControlPort, &self.control_port),
            (ConfigKey::SkipInboundPorts, &self.skip_inbound_ports),
            (ConfigKey::SkipOutboundPorts, &self.skip_outbound_ports),
            (ConfigKey::InboundPort, &self.inbound_port),
            (ConfigKey::AdminPort, &self.admin_port),
            (ConfigKey::OutboundPort, &self.outbound_port),
            (ConfigKey::ProxyCpuRequest, &self.proxy_cpu_request),
            (ConfigKey::ProxyMemoryRequest, &self.proxy_memory_request),
            (ConfigKey::ProxyCpuLimit, &self.proxy_cpu_limit),
            (ConfigKey::ProxyMemoryLimit, &self.proxy_memory_limit),
            (ConfigKey::ProxyUid, &self.proxy_uid),
            (ConfigKey::ProxyLogLevel, &self.proxy_log_level),
        ]
    }

    /// The override layer formed by the flags given on the command line. Boolean
    /// switches only count when present; `--flag=false` overrides a lower layer.
    pub fn overrides(&self) -> Result<ConfigLayer, ConfigError> {
        let mut layer = ConfigLayer::new(LayerSource::Override);
        for (key, value) in self.valued_flags() {
            if let Some(value) = value {
                layer.set(key, value.as_str())?;
            }
        }
        if let Some(disable_identity) = self.disable_identity {
            layer.set(ConfigKey::DisableIdentity, disable_identity.to_string())?;
        }
        if let Some(enable_external_profiles) = self.enable_external_profiles {
            layer.set(
                ConfigKey::EnableExternalProfiles,
                enable_external_profiles.to_string(),
            )?;
        }
        Ok(layer)
    }
}

#[derive(Args, Debug)]
pub struct UninjectArgs {
    /// Manifest file to read, '-' reads from stdin
    pub file: String,
}

pub fn parse() -> InjectCli {
    InjectCli::parse()
}

//////////////////////////////////////////////////////////////////////////////
//                 ########  #######    #########  #########                //
//                    ##     ##        ##             ##                    //
//                    ##     #####     #########      ##                    //
//                    ##     ##                ##     ##                    //
//                    ##     #######   #########      ##                    //
//////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use clap::Parser;
    use injector::config::{ConfigKey, LayerSource};
    use injector::error::ConfigError;

    use super::{Commands, InjectArgs, InjectCli};

    fn inject_args(args: &[&str]) -> InjectArgs {
        let cli = InjectCli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Inject(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn utest_parse_inject_flags() {
        let args = inject_args(&[
            "inject",
            "inject",
            "--proxy-image",
            "registry.local/proxy",
            "--skip-outbound-ports",
            "3306,25",
            "--disable-identity",
            "--ignore-cluster",
            "manifest.yaml",
        ]);

        assert_eq!(args.file, "manifest.yaml");
        assert!(args.ignore_cluster);

        let overrides = args.overrides().unwrap();
        assert_eq!(overrides.source(), LayerSource::Override);
        assert_eq!(overrides.get(ConfigKey::ProxyImage), Some("registry.local/proxy"));
        assert_eq!(overrides.get(ConfigKey::SkipOutboundPorts), Some("3306,25"));
        assert_eq!(overrides.get(ConfigKey::DisableIdentity), Some("true"));
        assert!(!overrides.is_set(ConfigKey::EnableExternalProfiles));
    }

    #[test]
    fn utest_parse_global_options_after_subcommand() {
        let cli =
            InjectCli::try_parse_from(["inject", "uninject", "-", "-v", "--config", "a.conf"])
                .unwrap();

        assert!(cli.verbose);
        assert!(!cli.quiet);
        assert_eq!(cli.config_path.as_deref(), Some("a.conf"));
        assert!(matches!(cli.command, Commands::Uninject(args) if args.file == "-"));
    }

    #[test]
    fn utest_overrides_reject_invalid_values() {
        let args = inject_args(&["inject", "inject", "--inbound-port", "http", "-"]);

        assert!(matches!(
            args.overrides(),
            Err(ConfigError::InvalidValue {
                key,
                layer: LayerSource::Override,
                ..
            }) if key == ConfigKey::InboundPort.as_str()
        ));
    }

    #[test]
    fn utest_boolean_flags_accept_explicit_false() {
        let args = inject_args(&[
            "inject",
            "inject",
            "--disable-identity=false",
            "--enable-external-profiles",
            "-",
        ]);

        let overrides = args.overrides().unwrap();
        assert_eq!(overrides.get(ConfigKey::DisableIdentity), Some("false"));
        assert_eq!(
            overrides.get(ConfigKey::EnableExternalProfiles),
            Some("true")
        );
    }

    #[test]
    fn utest_no_flags_no_overrides() {
        let args = inject_args(&["inject", "inject", "-"]);

        assert!(args.overrides().unwrap().is_empty());
    }
}
