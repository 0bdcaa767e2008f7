// src/config/validate.rs

use std::collections::BTreeMap;

use globset::Glob;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{
    default_groups, default_watch, ConfigFile, GroupConfig, RawConfigFile, WatchConfig,
};
use crate::dag::builtin::{is_builtin, DEV_SERVER, WATCH_FILES};
use crate::errors::{AssetdagError, Result};
use crate::types::TaskName;
use crate::watch::patterns::strip_dot_prefix;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetdagError;

    fn try_from(mut raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_global_config(&raw)?;
        validate_source_patterns(&raw)?;

        let mut groups = default_groups();
        groups.append(&mut raw.group);
        validate_groups(&groups)?;
        validate_group_dag(&groups)?;

        let watch = raw.watch.take().unwrap_or_else(default_watch);
        validate_watch_bindings(&watch, &groups)?;

        Ok(ConfigFile::new_unchecked(raw, groups, watch))
    }
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.queue_length == 0 {
        return Err(AssetdagError::ConfigError(
            "[config].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.server.root.trim().is_empty() {
        return Err(AssetdagError::ConfigError(
            "[server].root must not be empty".to_string(),
        ));
    }

    if cfg.scripts.entry.trim().is_empty() || cfg.scripts.bundle.trim().is_empty() {
        return Err(AssetdagError::ConfigError(
            "[scripts].entry and [scripts].bundle must not be empty".to_string(),
        ));
    }

    if cfg.styles.bundle.trim().is_empty() {
        return Err(AssetdagError::ConfigError(
            "[styles].bundle must not be empty".to_string(),
        ));
    }

    for ext in cfg.images.optimizers.keys() {
        if ext.is_empty() || ext.starts_with('.') || ext.to_lowercase() != *ext {
            return Err(AssetdagError::ConfigError(format!(
                "[images.optimizers] key '{ext}' must be a lower-case extension without a dot"
            )));
        }
    }

    Ok(())
}

fn validate_source_patterns(cfg: &RawConfigFile) -> Result<()> {
    let all = cfg
        .styles
        .source
        .iter()
        .chain(cfg.scripts.source.iter())
        .chain(cfg.images.source.iter());

    for pattern in all {
        Glob::new(pattern).map_err(|e| {
            AssetdagError::ConfigError(format!("invalid source glob '{pattern}': {e}"))
        })?;
        check_root_relative("source glob", pattern)?;
    }
    Ok(())
}

/// Globs are matched against root-relative paths, so they must stay inside
/// the root. A leading `./` is fine and ignored.
fn check_root_relative(kind: &str, pattern: &str) -> Result<()> {
    let rel = strip_dot_prefix(pattern);
    let escapes = rel.starts_with('/') || rel.split('/').any(|seg| seg == "..");
    if rel.is_empty() || escapes {
        return Err(AssetdagError::ConfigError(format!(
            "{kind} '{pattern}' must name files inside the project root"
        )));
    }
    Ok(())
}

fn validate_groups(groups: &BTreeMap<TaskName, GroupConfig>) -> Result<()> {
    for (name, group) in groups.iter() {
        if is_builtin(name) {
            return Err(AssetdagError::ConfigError(format!(
                "group '{name}' has the same name as a built-in task"
            )));
        }

        match (&group.series, &group.parallel) {
            (Some(_), Some(_)) | (None, None) => {
                return Err(AssetdagError::ConfigError(format!(
                    "group '{name}' must set exactly one of `series` or `parallel`"
                )));
            }
            _ => {}
        }

        if group.members().is_empty() {
            return Err(AssetdagError::ConfigError(format!(
                "group '{name}' has no members"
            )));
        }

        for member in group.members() {
            if member == name {
                return Err(AssetdagError::ConfigError(format!(
                    "group '{name}' cannot contain itself"
                )));
            }
            if !is_builtin(member) && !groups.contains_key(member) {
                return Err(AssetdagError::ConfigError(format!(
                    "group '{name}' has unknown member '{member}'"
                )));
            }
        }
    }
    Ok(())
}

fn validate_group_dag(groups: &BTreeMap<TaskName, GroupConfig>) -> Result<()> {
    // Edge direction: group -> member.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for (name, group) in groups.iter() {
        graph.add_node(name.as_str());
        for member in group.members() {
            graph.add_edge(name.as_str(), member.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(AssetdagError::GroupCycle(format!(
            "cycle detected in task groups involving '{}'",
            cycle.node_id()
        ))),
    }
}

fn validate_watch_bindings(
    watch: &[WatchConfig],
    groups: &BTreeMap<TaskName, GroupConfig>,
) -> Result<()> {
    for binding in watch {
        Glob::new(&binding.pattern).map_err(|e| {
            AssetdagError::ConfigError(format!(
                "invalid watch pattern '{}': {e}",
                binding.pattern
            ))
        })?;
        check_root_relative("watch pattern", &binding.pattern)?;

        match (&binding.run, &binding.action) {
            (Some(task), None) => {
                if !is_builtin(task) && !groups.contains_key(task) {
                    return Err(AssetdagError::ConfigError(format!(
                        "watch pattern '{}' runs unknown task '{task}'",
                        binding.pattern
                    )));
                }
                if let Some(long_lived) = reaches_long_lived(task, groups) {
                    return Err(AssetdagError::ConfigError(format!(
                        "watch pattern '{}' runs '{task}', which starts '{long_lived}'",
                        binding.pattern
                    )));
                }
            }
            (None, Some(_)) => {}
            _ => {
                return Err(AssetdagError::ConfigError(format!(
                    "watch pattern '{}' must set exactly one of `run` or `action`",
                    binding.pattern
                )));
            }
        }
    }
    Ok(())
}

/// The long-lived task (`watchFiles` / `devServer`) `task` would start, if
/// any. Groups are acyclic at this point.
fn reaches_long_lived<'a>(
    task: &'a str,
    groups: &'a BTreeMap<TaskName, GroupConfig>,
) -> Option<&'a str> {
    if task == WATCH_FILES || task == DEV_SERVER {
        return Some(task);
    }
    groups
        .get(task)?
        .members()
        .iter()
        .find_map(|member| reaches_long_lived(member, groups))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_raw_config_is_valid() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        assert!(cfg.groups().contains_key("build"));
        assert_eq!(cfg.watch().len(), 2);
    }

    #[test]
    fn user_group_replaces_builtin_group() {
        let mut raw = RawConfigFile::default();
        raw.group
            .insert("build".to_string(), GroupConfig::series(["style"]));
        let cfg = ConfigFile::try_from(raw).unwrap();
        assert_eq!(cfg.groups()["build"], GroupConfig::series(["style"]));
    }

    #[test]
    fn group_named_like_builtin_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.group
            .insert("devServer".to_string(), GroupConfig::series(["style"]));
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(matches!(err, AssetdagError::ConfigError(msg) if msg.contains("built-in")));
    }

    #[test]
    fn watch_binding_cannot_start_the_watch_session() {
        let mut raw = RawConfigFile::default();
        raw.watch = Some(vec![WatchConfig::run("*.html", "watch")]);
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(matches!(err, AssetdagError::ConfigError(msg) if msg.contains("watchFiles")));
    }

    #[test]
    fn dot_slash_globs_are_accepted_and_escaping_globs_are_not() {
        let mut raw = RawConfigFile::default();
        raw.styles.source = vec!["./scss/**/*.scss".to_string()];
        raw.watch = Some(vec![WatchConfig::run("./scss/**/*.scss", "compileStyles")]);
        assert!(ConfigFile::try_from(raw).is_ok());

        let mut raw = RawConfigFile::default();
        raw.images.source = vec!["../shared/img/*".to_string()];
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(matches!(err, AssetdagError::ConfigError(msg) if msg.contains("inside the project root")));

        let mut raw = RawConfigFile::default();
        raw.watch = Some(vec![WatchConfig::run("/etc/*.conf", "style")]);
        assert!(ConfigFile::try_from(raw).is_err());
    }

    #[test]
    fn watch_binding_to_unknown_task_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.watch = Some(vec![WatchConfig::run("js/**/*.js", "lint")]);
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(matches!(err, AssetdagError::ConfigError(msg) if msg.contains("unknown task 'lint'")));
    }
}
