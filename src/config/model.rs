// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{TaskName, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from `Assetdag.toml`.
///
/// Every section is optional; the defaults reproduce the classic layout:
///
/// ```toml
/// [server]
/// port = 3000
///
/// [styles]
/// source = ["scss/**/*.scss"]
/// out_dir = "css"
///
/// [group.build]
/// parallel = ["style", "js", "minImages"]
///
/// [[watch]]
/// pattern = "*.html"
/// action = "reload"
/// ```
///
/// This is the unvalidated form; see [`ConfigFile`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub tools: ToolsSection,

    #[serde(default)]
    pub styles: StylesSection,

    #[serde(default)]
    pub scripts: ScriptsSection,

    #[serde(default)]
    pub images: ImagesSection,

    /// Named groups from `[group.<name>]`. Entries here replace the built-in
    /// group of the same name.
    #[serde(default)]
    pub group: BTreeMap<TaskName, GroupConfig>,

    /// Watch bindings from `[[watch]]`. `None` means "use the defaults".
    #[serde(default)]
    pub watch: Option<Vec<WatchConfig>>,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`),
/// so holders can rely on groups being acyclic and every reference resolving.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    server: ServerSection,
    tools: ToolsSection,
    styles: StylesSection,
    scripts: ScriptsSection,
    images: ImagesSection,
    groups: BTreeMap<TaskName, GroupConfig>,
    watch: Vec<WatchConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        raw: RawConfigFile,
        groups: BTreeMap<TaskName, GroupConfig>,
        watch: Vec<WatchConfig>,
    ) -> Self {
        Self {
            config: raw.config,
            server: raw.server,
            tools: raw.tools,
            styles: raw.styles,
            scripts: raw.scripts,
            images: raw.images,
            groups,
            watch,
        }
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn server(&self) -> &ServerSection {
        &self.server
    }

    pub fn tools(&self) -> &ToolsSection {
        &self.tools
    }

    pub fn styles(&self) -> &StylesSection {
        &self.styles
    }

    pub fn scripts(&self) -> &ScriptsSection {
        &self.scripts
    }

    pub fn images(&self) -> &ImagesSection {
        &self.images
    }

    /// Effective groups: built-ins merged with `[group.*]` overrides.
    pub fn groups(&self) -> &BTreeMap<TaskName, GroupConfig> {
        &self.groups
    }

    /// Effective watch bindings.
    pub fn watch(&self) -> &[WatchConfig] {
        &self.watch
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        ConfigFile::new_unchecked(RawConfigFile::default(), default_groups(), default_watch())
    }
}

/// `[config]` section: watch reactor behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"queue"` (default) or `"cancel"`.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of pending triggers remembered per watch binding.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,
}

fn default_queue_length() -> usize {
    16
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served as the site root, relative to the project root.
    #[serde(default = "default_server_root")]
    pub root: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_server_root() -> String {
    ".".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            root: default_server_root(),
        }
    }
}

/// `[tools]` section: external commands used as stdin -> stdout filters.
///
/// An empty string disables that step (bytes pass through unchanged).
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    #[serde(default = "default_style_compiler")]
    pub style_compiler: String,

    #[serde(default = "default_autoprefixer")]
    pub autoprefixer: String,

    #[serde(default = "default_css_minifier")]
    pub css_minifier: String,

    #[serde(default = "default_js_minifier")]
    pub js_minifier: String,
}

fn default_style_compiler() -> String {
    "sass --stdin --load-path=scss".to_string()
}

fn default_autoprefixer() -> String {
    "postcss --use autoprefixer --autoprefixer.overrideBrowserslist 'last 2 versions'".to_string()
}

fn default_css_minifier() -> String {
    "postcss --use cssnano".to_string()
}

fn default_js_minifier() -> String {
    "terser --compress --mangle".to_string()
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            style_compiler: default_style_compiler(),
            autoprefixer: default_autoprefixer(),
            css_minifier: default_css_minifier(),
            js_minifier: default_js_minifier(),
        }
    }
}

/// `[styles]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StylesSection {
    #[serde(default = "default_styles_source")]
    pub source: Vec<String>,

    #[serde(default = "default_styles_out_dir")]
    pub out_dir: String,

    /// Pre-built third-party sheets prepended to the bundle.
    #[serde(default = "default_styles_vendor")]
    pub vendor: Vec<String>,

    /// Compiled sheets concatenated after the vendor sheets.
    #[serde(default = "default_styles_bundle_inputs")]
    pub bundle_inputs: Vec<String>,

    #[serde(default = "default_styles_bundle")]
    pub bundle: String,
}

fn default_styles_source() -> Vec<String> {
    vec!["scss/**/*.scss".to_string()]
}

fn default_styles_out_dir() -> String {
    "css".to_string()
}

fn default_styles_vendor() -> Vec<String> {
    vec!["node_modules/bootstrap/dist/css/bootstrap.min.css".to_string()]
}

fn default_styles_bundle_inputs() -> Vec<String> {
    vec!["css/style.css".to_string()]
}

fn default_styles_bundle() -> String {
    "css/style.min.css".to_string()
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            source: default_styles_source(),
            out_dir: default_styles_out_dir(),
            vendor: default_styles_vendor(),
            bundle_inputs: default_styles_bundle_inputs(),
            bundle: default_styles_bundle(),
        }
    }
}

/// `[scripts]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptsSection {
    #[serde(default = "default_scripts_source")]
    pub source: Vec<String>,

    /// The only file that ends up in the bundle.
    #[serde(default = "default_scripts_entry")]
    pub entry: String,

    #[serde(default = "default_scripts_bundle")]
    pub bundle: String,
}

fn default_scripts_source() -> Vec<String> {
    vec!["js/**/*.js".to_string()]
}

fn default_scripts_entry() -> String {
    "js/app.js".to_string()
}

fn default_scripts_bundle() -> String {
    "js/app.min.js".to_string()
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            source: default_scripts_source(),
            entry: default_scripts_entry(),
            bundle: default_scripts_bundle(),
        }
    }
}

/// `[images]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesSection {
    #[serde(default = "default_images_source")]
    pub source: Vec<String>,

    /// Lower-case file extension -> optimizer command.
    #[serde(default = "default_optimizers")]
    pub optimizers: BTreeMap<String, String>,
}

fn default_images_source() -> Vec<String> {
    vec!["img/**/*".to_string()]
}

fn default_optimizers() -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert("gif".to_string(), "gifsicle --interlace".to_string());
    map.insert(
        "jpg".to_string(),
        "jpegtran -progressive -copy none".to_string(),
    );
    map.insert(
        "jpeg".to_string(),
        "jpegtran -progressive -copy none".to_string(),
    );
    map.insert("png".to_string(), "oxipng -o 5 --stdout -".to_string());
    map.insert(
        "svg".to_string(),
        "svgo --input - --output - --config '{\"plugins\":[{\"name\":\"preset-default\",\"params\":{\"overrides\":{\"removeViewBox\":false}}},\"collapseGroups\"]}'".to_string(),
    );
    map
}

impl Default for ImagesSection {
    fn default() -> Self {
        Self {
            source: default_images_source(),
            optimizers: default_optimizers(),
        }
    }
}

/// `[group.<name>]`: exactly one of `series` / `parallel`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GroupConfig {
    #[serde(default)]
    pub series: Option<Vec<TaskName>>,

    #[serde(default)]
    pub parallel: Option<Vec<TaskName>>,
}

impl GroupConfig {
    pub fn series<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        Self {
            series: Some(members.into_iter().map(Into::into).collect()),
            parallel: None,
        }
    }

    pub fn parallel<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        Self {
            series: None,
            parallel: Some(members.into_iter().map(Into::into).collect()),
        }
    }

    /// All member names, in declaration order.
    pub fn members(&self) -> &[TaskName] {
        self.series
            .as_deref()
            .or(self.parallel.as_deref())
            .unwrap_or(&[])
    }
}

/// Static actions a watch binding can perform instead of running a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchAction {
    /// Tell connected browsers to reload.
    Reload,
}

/// `[[watch]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WatchConfig {
    /// Glob relative to the project root.
    pub pattern: String,

    /// Task or group to run on change.
    #[serde(default)]
    pub run: Option<TaskName>,

    /// Static action to perform on change.
    #[serde(default)]
    pub action: Option<WatchAction>,

    /// Skip triggers when the changed file's content did not change.
    #[serde(default)]
    pub use_hash: bool,
}

impl WatchConfig {
    pub fn run(pattern: &str, task: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            run: Some(task.to_string()),
            action: None,
            use_hash: false,
        }
    }

    pub fn action(pattern: &str, action: WatchAction) -> Self {
        Self {
            pattern: pattern.to_string(),
            run: None,
            action: Some(action),
            use_hash: false,
        }
    }
}

/// Groups available without any `[group.*]` section.
pub fn default_groups() -> BTreeMap<TaskName, GroupConfig> {
    let mut groups = BTreeMap::new();
    groups.insert(
        "style".to_string(),
        GroupConfig::series(["compileStyles", "minifyStyles"]),
    );
    groups.insert(
        "js".to_string(),
        GroupConfig::series(["minifyEachScript", "concatenateAndMinify"]),
    );
    groups.insert(
        "minImages".to_string(),
        GroupConfig::series(["optimizeImages"]),
    );
    groups.insert(
        "build".to_string(),
        GroupConfig::parallel(["style", "js", "minImages"]),
    );
    groups.insert(
        "watch".to_string(),
        GroupConfig::parallel(["watchFiles", "devServer"]),
    );
    groups
}

/// Watch bindings used when the config has no `[[watch]]` entries.
pub fn default_watch() -> Vec<WatchConfig> {
    vec![
        WatchConfig::run("scss/**/*.scss", "compileStyles"),
        WatchConfig::action("*.html", WatchAction::Reload),
    ]
}
