use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::rules::RuleSet;
use crate::rules::pattern::PatternAspect;

pub(crate) const DEFAULT_CLASS_SUFFIX: &str = "$$Woven";

/// Weave configuration loaded from JSON.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct WeaveConfig {
    /// Appended to an intercepted class name to name the generated class.
    #[serde(default = "default_class_suffix")]
    pub(crate) class_suffix: String,
    /// Aspects in priority order.
    #[serde(default)]
    pub(crate) aspects: Vec<PatternAspect>,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            class_suffix: default_class_suffix(),
            aspects: Vec::new(),
        }
    }
}

impl WeaveConfig {
    pub(crate) fn rule_set(&self) -> RuleSet {
        let mut rules = RuleSet::new();
        for aspect in &self.aspects {
            rules.push(aspect.clone());
        }
        rules
    }
}

fn default_class_suffix() -> String {
    DEFAULT_CLASS_SUFFIX.to_string()
}

pub(crate) fn load_config(path: &Path) -> Result<WeaveConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let config: WeaveConfig = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    if config.class_suffix.is_empty() {
        anyhow::bail!("class_suffix must not be empty in {}", path.display());
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CallKind, CallSite};

    #[test]
    fn load_config_reads_aspects_in_order() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("weave.json");
        fs::write(
            &path,
            r#"{
                "aspects": [
                    {"match": {"owner": "java/lang/System", "name": "exit"},
                     "replace": {"owner": "com/example/Guard", "name": "exit", "pass_target_class": true}},
                    {"match": {"owner": "java/lang/*", "name": "*"},
                     "replace": {"owner": "com/example/Trace", "name": "call"}}
                ]
            }"#,
        )
        .expect("write config");

        let config = load_config(&path).expect("load config");

        assert_eq!(config.class_suffix, DEFAULT_CLASS_SUFFIX);
        assert_eq!(config.aspects.len(), 2);
        let rules = config.rule_set();
        assert_eq!(rules.len(), 2);
        let plan = rules
            .first_match(&CallSite::new("java/lang/System", "exit", "(I)V", CallKind::Static))
            .expect("match");
        assert_eq!(plan.new_owner, "com/example/Guard");
        assert!(plan.pass_target_class);
    }

    #[test]
    fn load_config_rejects_unknown_fields() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("weave.json");
        fs::write(&path, r#"{"aspect": []}"#).expect("write config");

        let err = load_config(&path).expect_err("unknown field");

        assert!(format!("{err:#}").contains("weave.json"));
    }

    #[test]
    fn load_config_rejects_empty_suffix() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("weave.json");
        fs::write(&path, r#"{"class_suffix": ""}"#).expect("write config");

        assert!(load_config(&path).is_err());
    }
}
