//! Integration tests for configuration fragments read from disk

use cascade_core::{
    ConfigEngine, EngineOptions, ErrorKind, FileSource, PluginManifest, PluginRuleRegistry,
    Severity,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn registry() -> Arc<PluginRuleRegistry> {
    let builtin = PluginManifest::builtin()
        .with_simple_rule("no-var", Severity::Off)
        .with_simple_rule("no-console", Severity::Off)
        .with_simple_rule("semi", Severity::Off);
    Arc::new(PluginRuleRegistry::new().with_provider(&builtin))
}

fn engine_in(dir: &Path, root: &str) -> cascade_core::Result<ConfigEngine> {
    ConfigEngine::initialize(
        root,
        Arc::new(FileSource::new(dir)),
        registry(),
        EngineOptions::default(),
    )
}

#[test]
fn test_jsonc_root_with_comments_and_trailing_commas() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        ".eslintrc.json",
        r#"{
            // shared defaults
            "rules": {
                "no-var": "error",
                "semi": ["warn", "always",],
            },
            "parserOptions": { "ecmaVersion": 2021, },
        }"#,
    );

    let engine = engine_in(dir.path(), ".eslintrc.json").unwrap();
    let resolved = engine.resolve("src/index.js").unwrap();

    assert_eq!(resolved.severity("no-var"), Some(Severity::Error));
    assert_eq!(resolved.severity("semi"), Some(Severity::Warn));
    assert_eq!(resolved.rule("semi").unwrap().options.len(), 1);
    assert_eq!(
        resolved.parser_options.get("ecmaVersion").and_then(|v| v.as_i64()),
        Some(2021)
    );
}

#[test]
fn test_relative_extends_across_formats() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "shared/base.yaml",
        "rules:\n  no-var: error\n  no-console: warn\n",
    );
    write(
        dir.path(),
        "shared/strict.toml",
        "[rules]\nno-console = \"error\"\n",
    );
    write(
        dir.path(),
        "project/.eslintrc.json",
        r#"{ "extends": ["../shared/base.yaml", "../shared/strict.toml"], "rules": { "semi": 1 } }"#,
    );

    let engine = engine_in(dir.path(), "project/.eslintrc.json").unwrap();
    let resolved = engine.resolve("src/main.js").unwrap();

    assert_eq!(resolved.severity("no-var"), Some(Severity::Error));
    assert_eq!(resolved.severity("no-console"), Some(Severity::Error));
    assert_eq!(resolved.severity("semi"), Some(Severity::Warn));
    assert_eq!(engine.base().unwrap().sources().len(), 3);
}

#[test]
fn test_package_json_eslint_config() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "package.json",
        r#"{
            "name": "web",
            "version": "1.0.0",
            "eslintConfig": { "rules": { "no-console": "warn" } }
        }"#,
    );

    let engine = engine_in(dir.path(), "package.json").unwrap();
    assert_eq!(
        engine.resolve("index.js").unwrap().severity("no-console"),
        Some(Severity::Warn)
    );
}

#[test]
fn test_missing_relative_extends_is_unresolved() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        ".eslintrc.json",
        r#"{ "extends": "./does-not-exist.json" }"#,
    );

    let err = engine_in(dir.path(), ".eslintrc.json").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
}

#[test]
fn test_unparseable_fragment_is_parse_error() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), ".eslintrc.yaml", "rules: [unclosed\n");

    let err = engine_in(dir.path(), ".eslintrc.yaml").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn test_reload_after_file_changes_on_disk() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "base.json", r#"{ "rules": { "no-var": "warn" } }"#);
    write(
        dir.path(),
        ".eslintrc.json",
        r#"{ "extends": "./base.json", "rules": { "no-console": "error" } }"#,
    );

    let engine = engine_in(dir.path(), ".eslintrc.json").unwrap();
    assert_eq!(
        engine.resolve("a.js").unwrap().severity("no-var"),
        Some(Severity::Warn)
    );

    write(dir.path(), "base.json", r#"{ "rules": { "no-var": "error" } }"#);
    let report = engine.reload("base.json").unwrap();

    assert!(report.rebuilt);
    assert!(report.fingerprint_changed);
    assert_eq!(report.invalidated.len(), 2);
    assert_eq!(report.purged, 1);
    assert_eq!(
        engine.resolve("a.js").unwrap().severity("no-var"),
        Some(Severity::Error)
    );
}

#[test]
fn test_reload_of_deleted_base_never_serves_its_rules() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "base.json", r#"{ "rules": { "no-var": "warn" } }"#);
    write(dir.path(), ".eslintrc.json", r#"{ "extends": "./base.json" }"#);

    let engine = engine_in(dir.path(), ".eslintrc.json").unwrap();
    assert_eq!(
        engine.resolve("a.js").unwrap().severity("no-var"),
        Some(Severity::Warn)
    );

    fs::remove_file(dir.path().join("base.json")).unwrap();
    assert_eq!(
        engine.reload("./base.json").err().unwrap().kind(),
        ErrorKind::UnresolvedReference
    );
    assert_eq!(
        engine.resolve("a.js").err().unwrap().kind(),
        ErrorKind::Config
    );

    write(dir.path(), "base.json", r#"{ "rules": { "no-var": "error" } }"#);
    engine.reload("base.json").unwrap();
    assert_eq!(
        engine.resolve("a.js").unwrap().severity("no-var"),
        Some(Severity::Error)
    );
}

#[test]
fn test_reload_of_broken_file_fails_until_fixed() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), ".eslintrc.json", r#"{ "rules": { "no-var": "warn" } }"#);

    let engine = engine_in(dir.path(), ".eslintrc.json").unwrap();
    engine.resolve("a.js").unwrap();

    write(dir.path(), ".eslintrc.json", r#"{ "rules": { "no-var": "#);
    assert_eq!(
        engine.reload(".eslintrc.json").err().unwrap().kind(),
        ErrorKind::Parse
    );
    assert_eq!(
        engine.resolve("a.js").err().unwrap().kind(),
        ErrorKind::Config
    );

    write(dir.path(), ".eslintrc.json", r#"{ "rules": { "no-var": "off" } }"#);
    engine.reload(".eslintrc.json").unwrap();
    assert_eq!(
        engine.resolve("a.js").unwrap().severity("no-var"),
        Some(Severity::Off)
    );
}

#[test]
fn test_absolute_paths_matched_relative_to_root_dir() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        ".eslintrc.json",
        r#"{
            "ignorePatterns": ["build/"],
            "overrides": [{ "files": ["src/**/*.js"], "rules": { "no-var": "error" } }]
        }"#,
    );

    let engine = ConfigEngine::initialize(
        ".eslintrc.json",
        Arc::new(FileSource::new(dir.path())),
        registry(),
        EngineOptions::default().with_root_dir(dir.path()),
    )
    .unwrap();

    let resolved = engine.resolve(dir.path().join("src/app/main.js")).unwrap();
    assert_eq!(resolved.path, "src/app/main.js");
    assert_eq!(resolved.severity("no-var"), Some(Severity::Error));
    assert!(engine.is_ignored(dir.path().join("build/out.js")).unwrap());
    assert!(!engine.is_ignored(dir.path().join("src/app/main.js")).unwrap());
}

#[test]
fn test_manifest_and_options_loaded_from_files() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "react.yaml",
        "namespace: eslint-plugin-react\nrules:\n  prop-types:\n    defaultSeverity: error\n  jsx-key:\n    defaultSeverity: warn\n    optionSchema:\n      maxItems: 1\n      items: [object]\nconfigs:\n  recommended:\n    plugins: [react]\n    rules:\n      react/jsx-key: error\n",
    );
    write(
        dir.path(),
        "engine.toml",
        "cacheCapacity = 16\ndeepMergeSettings = [\"react\"]\nstrictPlugins = false\n",
    );
    write(
        dir.path(),
        ".eslintrc.json",
        r#"{ "extends": "plugin:react/recommended", "rules": { "react/prop-types": "warn" } }"#,
    );

    let manifest = PluginManifest::load(&dir.path().join("react.yaml")).unwrap();
    let options = EngineOptions::load(&dir.path().join("engine.toml")).unwrap();
    assert_eq!(options.cache_capacity, 16);
    assert!(!options.strict_plugins);

    let registry = Arc::new(PluginRuleRegistry::new().with_provider(&manifest));
    let engine = ConfigEngine::initialize(
        ".eslintrc.json",
        Arc::new(FileSource::new(dir.path())),
        registry,
        options,
    )
    .unwrap();

    let resolved = engine.resolve("src/App.jsx").unwrap();
    assert_eq!(resolved.severity("react/jsx-key"), Some(Severity::Error));
    assert_eq!(resolved.severity("react/prop-types"), Some(Severity::Warn));
    assert_eq!(engine.cache_stats().capacity, 16);
}
