#![allow(dead_code)]

use assetdag::config::{ConfigFile, GroupConfig, RawConfigFile, WatchConfig};
use assetdag::errors::Result;
use assetdag::types::TriggerWhileRunningBehaviour;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults; `with_watch` replaces the default
/// watch bindings on first use.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_group(mut self, name: &str, group: GroupConfig) -> Self {
        self.config.group.insert(name.to_string(), group);
        self
    }

    pub fn with_watch(mut self, binding: WatchConfig) -> Self {
        self.config.watch.get_or_insert_with(Vec::new).push(binding);
        self
    }

    pub fn with_behaviour(
        mut self,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
    ) -> Self {
        self.config.config.triggered_while_running_behaviour = behaviour;
        self.config.config.queue_length = queue_length;
        self
    }

    pub fn with_server(mut self, host: &str, port: u16, root: &str) -> Self {
        self.config.server.host = host.to_string();
        self.config.server.port = port;
        self.config.server.root = root.to_string();
        self
    }

    /// Configure every external tool as a plain shell command.
    pub fn with_tools(mut self, compiler: &str, prefixer: &str, css: &str, js: &str) -> Self {
        self.config.tools.style_compiler = compiler.to_string();
        self.config.tools.autoprefixer = prefixer.to_string();
        self.config.tools.css_minifier = css.to_string();
        self.config.tools.js_minifier = js.to_string();
        self
    }

    pub fn with_vendor_styles(mut self, vendor: &[&str]) -> Self {
        self.config.styles.vendor = vendor.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
