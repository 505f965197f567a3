//! Resolved configuration inspector
//!
//! Loads a root configuration from disk together with plugin manifests and
//! prints what a given file resolves to.

use anyhow::{Context, Result, bail};
use cascade_core::{ConfigEngine, EngineOptions, FileSource, PluginManifest, PluginRuleRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Inputs shared by the inspection commands
#[derive(Debug, Clone)]
pub struct InspectorInput {
    pub config: PathBuf,
    pub manifests: Vec<PathBuf>,
    pub options: Option<PathBuf>,
}

pub struct ConfigInspector {
    engine: ConfigEngine,
}

impl ConfigInspector {
    pub fn open(input: &InspectorInput) -> Result<Self> {
        let mut registry = PluginRuleRegistry::new();
        for manifest_path in &input.manifests {
            let manifest = PluginManifest::load(manifest_path)
                .with_context(|| format!("loading manifest {}", manifest_path.display()))?;
            registry.register_provider(&manifest);
        }
        tracing::debug!("Registered {} rule(s)", registry.rule_count());

        let mut options = match &input.options {
            Some(path) => EngineOptions::load(path)
                .with_context(|| format!("loading options {}", path.display()))?,
            None => EngineOptions::default(),
        };

        let base_dir = input
            .config
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        if options.root_dir.is_none() {
            let root_dir = base_dir
                .canonicalize()
                .with_context(|| format!("resolving {}", base_dir.display()))?;
            options = options.with_root_dir(root_dir);
        }
        let root = input
            .config
            .file_name()
            .and_then(|n| n.to_str())
            .context("configuration path has no file name")?;

        let engine = ConfigEngine::initialize(
            root,
            Arc::new(FileSource::new(base_dir)),
            Arc::new(registry),
            options,
        )?;
        Ok(Self { engine })
    }

    /// The resolved configuration of `path` as pretty JSON
    pub fn print_config(&self, path: &Path) -> Result<String> {
        if self.engine.is_ignored(path)? {
            tracing::warn!("{} is covered by ignorePatterns", path.display());
        }
        Ok(self.engine.resolve(path)?.to_json_pretty()?)
    }

    /// Fail with every problem the configuration holds
    pub fn validate(&self) -> Result<()> {
        let problems = self.engine.validate();
        if problems.is_empty() {
            println!("✓ Configuration is valid");
            return Ok(());
        }
        for problem in &problems {
            eprintln!("✗ {problem}");
        }
        bail!("{} problem(s) found", problems.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn input(dir: &TempDir, rules: &str) -> InspectorInput {
        fs::write(
            dir.path().join("builtin.json"),
            r#"{ "rules": { "no-var": {}, "eqeqeq": { "defaultOptions": ["always"] } } }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join(".eslintrc.json"),
            format!(r#"{{ "rules": {rules} }}"#),
        )
        .unwrap();

        InspectorInput {
            config: dir.path().join(".eslintrc.json"),
            manifests: vec![dir.path().join("builtin.json")],
            options: None,
        }
    }

    #[test]
    fn test_print_config() {
        let dir = TempDir::new().unwrap();
        let inspector =
            ConfigInspector::open(&input(&dir, r#"{ "no-var": 2, "eqeqeq": "warn" }"#)).unwrap();

        let printed = inspector.print_config(Path::new("src/index.js")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&printed).unwrap();

        assert_eq!(value["path"], "src/index.js");
        assert_eq!(value["rules"]["no-var"]["severity"], "error");
        assert_eq!(value["rules"]["eqeqeq"]["options"][0], "always");
    }

    #[test]
    fn test_absolute_paths_default_to_config_directory() {
        let dir = TempDir::new().unwrap();
        let mut input = input(&dir, r#"{ "no-var": "warn" }"#);
        fs::write(
            &input.config,
            r#"{ "overrides": [{ "files": ["src/*.js"], "rules": { "no-var": "error" } }] }"#,
        )
        .unwrap();
        input.config = dir.path().canonicalize().unwrap().join(".eslintrc.json");
        let inspector = ConfigInspector::open(&input).unwrap();

        let path = dir.path().canonicalize().unwrap().join("src/index.js");
        let value: serde_json::Value =
            serde_json::from_str(&inspector.print_config(&path).unwrap()).unwrap();

        assert_eq!(value["path"], "src/index.js");
        assert_eq!(value["rules"]["no-var"]["severity"], "error");
    }

    #[test]
    fn test_validate_reports_unknown_rules() {
        let dir = TempDir::new().unwrap();
        let inspector =
            ConfigInspector::open(&input(&dir, r#"{ "no-such-rule": "error" }"#)).unwrap();

        assert!(inspector.validate().is_err());
    }
}
