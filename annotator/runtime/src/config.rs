use crate::core::RuleSet;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// The top-level shape of the configuration file.
///
/// ```yaml
/// rules:
///   - matchLabels:
///       team: x
///     annotations:
///       example.com/owner: x
/// ```
///
/// `rules` may instead map rule names to annotations; such a rule applies to
/// resources labeled `resource-annotator.fehe.eu/rule: <name>`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    #[serde(default)]
    rules: serde_json::Value,
}

/// Reads a rule set from a YAML (or JSON) file.
pub fn load(path: &Path) -> Result<RuleSet> {
    let buf = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse(&buf).with_context(|| format!("in file {:?}", path))
}

pub fn parse(yaml: &str) -> Result<RuleSet> {
    let Config { rules } = serde_yaml::from_str(yaml)?;
    let rules = RuleSet::load(rules)?;
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ConfigError, Map, ResourceContext, Rule, RULE_LABEL};
    use std::io::Write;

    #[test]
    fn parse_rules() {
        let rules = parse(
            r#"
rules:
  - name: team-x-owner
    matchLabels:
      team: x
    annotations:
      example.com/owner: x
  - matchNamespace: prod
    matchKind: Pod
    annotations:
      example.com/env: prod
"#,
        )
        .unwrap();

        assert_eq!(
            rules.rules(),
            [
                Rule::default()
                    .named("team-x-owner")
                    .with_labels([("team", "x")])
                    .with_annotations([("example.com/owner", "x")]),
                Rule::default()
                    .with_namespace("prod")
                    .with_kind("Pod")
                    .with_annotations([("example.com/env", "prod")]),
            ]
        );
    }

    #[test]
    fn parse_json() {
        let rules = parse(r#"{"rules": [{"matchKind": "Pod", "annotations": {"a": "1"}}]}"#)
            .unwrap();
        assert_eq!(
            rules.rules(),
            [Rule::default()
                .with_kind("Pod")
                .with_annotations([("a", "1")])]
        );
    }

    #[test]
    fn missing_rules() {
        let rules = parse("rules:\n").unwrap();
        assert!(rules.is_empty());

        let rules = parse("{}").unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn default_rule() {
        let rules = parse(
            r#"
rules:
  - annotations:
      example.com/managed: "true"
"#,
        )
        .unwrap();
        let labels = Map::new();
        let eval = rules.evaluate(
            &ResourceContext {
                namespace: "any",
                kind: "ConfigMap",
                name: "any",
                labels: &labels,
            },
            Map::new(),
        );
        assert!(eval.matched);
        assert_eq!(eval.annotations.get("example.com/managed").unwrap(), "true");
    }

    #[test]
    fn rejects_unquoted_numbers() {
        let err = parse(
            r#"
rules:
  - matchLabels:
      tier: 1
    annotations:
      example.com/tier: "1"
"#,
        )
        .unwrap_err();
        assert!(
            matches!(
                err.downcast_ref::<ConfigError>(),
                Some(ConfigError::InvalidRule { index: 0, .. })
            ),
            "{err:#}"
        );
    }

    #[test]
    fn parse_named_rules() {
        let rules = parse(
            r#"
rules:
  team-x:
    example.com/owner: x
  team-y:
    example.com/owner: y
"#,
        )
        .unwrap();
        assert_eq!(rules.len(), 2);

        let labels = Some((RULE_LABEL.to_string(), "team-x".to_string()))
            .into_iter()
            .collect::<Map>();
        let eval = rules.evaluate(
            &ResourceContext {
                namespace: "default",
                kind: "Pod",
                name: "web",
                labels: &labels,
            },
            Map::new(),
        );
        assert!(eval.matched);
        assert_eq!(eval.annotations.get("example.com/owner").unwrap(), "x");
        assert_eq!(eval.annotations.len(), 1);
    }

    #[test]
    fn rejects_invalid_named_rule() {
        let err = parse(
            r#"
rules:
  team-x: x
"#,
        )
        .unwrap_err();
        assert!(
            matches!(
                err.downcast_ref::<ConfigError>(),
                Some(ConfigError::InvalidNamedRule { .. })
            ),
            "{err:#}"
        );
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(parse("rule:\n  - annotations: {}\n").is_err());
    }

    #[test]
    fn rejects_malformed_yaml() {
        assert!(parse("rules: [\n").is_err());
    }

    #[test]
    fn load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "rules:\n  - matchKind: Pod\n    annotations:\n      a: \"1\""
        )
        .unwrap();

        let rules = load(file.path()).unwrap();
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.yaml");
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("missing.yaml"), "{err:#}");
    }

    #[test]
    fn load_names_file_on_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rules: 3").unwrap();

        let err = load(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("in file"), "{err:#}");
        assert!(err.downcast_ref::<ConfigError>().is_some(), "{err:#}");
    }
}
