//! Plugin rule registry
//!
//! Every component that contributes rules implements [`RuleDescriptorProvider`];
//! the registry composes any number of providers. Built-in rules live under
//! the empty namespace.
//!
//! ## Plugin manifest
//!
//! ```json
//! {
//!   "namespace": "react",
//!   "rules": {
//!     "prop-types": { "defaultSeverity": "error" },
//!     "jsx-filename-extension": {
//!       "defaultSeverity": "off",
//!       "optionSchema": { "maxItems": 1, "items": ["object"] }
//!     }
//!   },
//!   "configs": {
//!     "recommended": { "plugins": ["react"], "rules": { "react/prop-types": "error" } }
//!   }
//! }
//! ```

use super::fragment::FragmentDocument;
use super::severity::Severity;
use super::source::{MemorySource, parse_structured};
use super::value::{SettingValue, ValueKind};
use crate::error::CascadeError;
use crate::result::Result;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Namespace of built-in (unprefixed) rules
pub const BUILTIN_NAMESPACE: &str = "";

/// Prefix of built-in preset references (`eslint:recommended`)
pub const BUILTIN_PRESET_PREFIX: &str = "eslint:";

/// Canonical plugin namespace for a name as written in `plugins`
///
/// `eslint-plugin-foo` -> `foo`, `@scope/eslint-plugin` -> `@scope`,
/// `@scope/eslint-plugin-foo` -> `@scope/foo`.
pub fn normalize_plugin_name(name: &str) -> String {
    let name = name.trim();
    if let Some(scoped) = name.strip_prefix('@') {
        match scoped.split_once('/') {
            Some((scope, "eslint-plugin")) => format!("@{scope}"),
            Some((scope, rest)) => match rest.strip_prefix("eslint-plugin-") {
                Some(short) => format!("@{scope}/{short}"),
                None => name.to_string(),
            },
            None => name.to_string(),
        }
    } else {
        name.strip_prefix("eslint-plugin-")
            .unwrap_or(name)
            .to_string()
    }
}

/// Split a rule id into (namespace, rule name)
///
/// `foo/rule` -> (`foo`, `rule`); `@scope/rule` -> (`@scope`, `rule`);
/// `@scope/name/rule` -> (`@scope/name`, `rule`); `rule` -> (``, `rule`).
pub fn split_rule_id(rule_id: &str) -> (&str, &str) {
    if rule_id.starts_with('@') {
        match rule_id.rfind('/') {
            Some(idx) => (&rule_id[..idx], &rule_id[idx + 1..]),
            None => (BUILTIN_NAMESPACE, rule_id),
        }
    } else {
        match rule_id.split_once('/') {
            Some((namespace, name)) => (namespace, name),
            None => (BUILTIN_NAMESPACE, rule_id),
        }
    }
}

fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}/{name}")
    }
}

/// Expected shape of one positional rule option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OptionShape {
    Any,
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl OptionShape {
    fn accepts(self, value: &SettingValue) -> bool {
        matches!(
            (self, value.kind()),
            (OptionShape::Any, _)
                | (OptionShape::String, ValueKind::String)
                | (OptionShape::Number, ValueKind::Number)
                | (OptionShape::Boolean, ValueKind::Bool)
                | (OptionShape::Array, ValueKind::List)
                | (OptionShape::Object, ValueKind::Map)
        )
    }
}

/// Arity/shape of a rule's options; values themselves are not checked here
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionSchema {
    pub min_items: usize,
    /// `None` means unbounded
    pub max_items: Option<usize>,
    /// Per-position shapes; positions past the end accept anything
    pub items: Vec<OptionShape>,
}

impl OptionSchema {
    /// A schema for rules that take no options at all
    pub fn none() -> Self {
        Self {
            min_items: 0,
            max_items: Some(0),
            items: Vec::new(),
        }
    }

    pub fn validate(&self, options: &[SettingValue]) -> std::result::Result<(), String> {
        if options.len() < self.min_items {
            return Err(format!(
                "expected at least {} option(s), got {}",
                self.min_items,
                options.len()
            ));
        }
        if let Some(max) = self.max_items {
            if options.len() > max {
                return Err(format!(
                    "expected at most {max} option(s), got {}",
                    options.len()
                ));
            }
        }
        for (position, (shape, value)) in self.items.iter().zip(options).enumerate() {
            if !shape.accepts(value) {
                return Err(format!(
                    "option {position} should be {shape:?}, got {:?}",
                    value.kind()
                ));
            }
        }
        Ok(())
    }
}

/// Everything the resolver needs to know about one rule
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDescriptor {
    pub namespace: String,
    /// Fully qualified rule id (`react/prop-types`, `no-var`)
    pub rule_id: String,
    pub default_severity: Severity,
    pub schema: OptionSchema,
    pub default_options: Vec<SettingValue>,
}

/// Anything that contributes rule descriptors (and optionally presets)
pub trait RuleDescriptorProvider: Send + Sync {
    /// Canonical namespace; empty for built-in rules
    fn namespace(&self) -> &str;

    fn descriptors(&self) -> Vec<RuleDescriptor>;

    /// Named presets, referenced as `plugin:<namespace>/<name>`
    /// (or `eslint:<name>` for the built-in namespace)
    fn presets(&self) -> Vec<(String, FragmentDocument)> {
        Vec::new()
    }
}

/// Per-rule section of a plugin manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManifestRule {
    #[serde(default = "default_severity")]
    pub default_severity: Severity,
    #[serde(default)]
    pub option_schema: OptionSchema,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_options: Vec<SettingValue>,
}

fn default_severity() -> Severity {
    Severity::Off
}

/// A plugin manifest as shipped by a plugin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    /// Plugin name; normalized on registration
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub rules: IndexMap<String, ManifestRule>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub configs: IndexMap<String, FragmentDocument>,
}

impl PluginManifest {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// The manifest for built-in rules
    pub fn builtin() -> Self {
        Self::new(BUILTIN_NAMESPACE)
    }

    /// Add a rule by its short name
    pub fn with_rule(mut self, name: impl Into<String>, rule: ManifestRule) -> Self {
        self.rules.insert(name.into(), rule);
        self
    }

    /// Add a rule with a default severity and an unconstrained option schema
    pub fn with_simple_rule(self, name: impl Into<String>, default_severity: Severity) -> Self {
        self.with_rule(
            name,
            ManifestRule {
                default_severity,
                option_schema: OptionSchema::default(),
                default_options: Vec::new(),
            },
        )
    }

    pub fn with_config(mut self, name: impl Into<String>, document: FragmentDocument) -> Self {
        self.configs.insert(name.into(), document);
        self
    }

    /// Load a manifest from a JSON, YAML or TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| CascadeError::io_error(path, e))?;
        parse_structured(path, &content)
    }
}

impl RuleDescriptorProvider for PluginManifest {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn descriptors(&self) -> Vec<RuleDescriptor> {
        let namespace = normalize_plugin_name(&self.namespace);
        self.rules
            .iter()
            .map(|(name, rule)| RuleDescriptor {
                namespace: namespace.clone(),
                rule_id: qualify(&namespace, name),
                default_severity: rule.default_severity,
                schema: rule.option_schema.clone(),
                default_options: rule.default_options.clone(),
            })
            .collect()
    }

    fn presets(&self) -> Vec<(String, FragmentDocument)> {
        self.configs
            .iter()
            .map(|(name, document)| (name.clone(), document.clone()))
            .collect()
    }
}

/// Registry of every known rule, grouped by namespace
#[derive(Debug, Clone, Default)]
pub struct PluginRuleRegistry {
    namespaces: BTreeMap<String, BTreeMap<String, RuleDescriptor>>,
    presets: BTreeMap<String, FragmentDocument>,
}

impl PluginRuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every descriptor and preset of a provider
    ///
    /// Registering a namespace twice adds to it; a later descriptor for the
    /// same rule id replaces the earlier one.
    pub fn register_provider(&mut self, provider: &dyn RuleDescriptorProvider) {
        let namespace = normalize_plugin_name(provider.namespace());
        let rules = self.namespaces.entry(namespace.clone()).or_default();

        for descriptor in provider.descriptors() {
            if rules.contains_key(&descriptor.rule_id) {
                tracing::warn!(
                    "Rule '{}' registered twice; keeping the later descriptor",
                    descriptor.rule_id
                );
            }
            rules.insert(descriptor.rule_id.clone(), descriptor);
        }

        for (name, document) in provider.presets() {
            let reference = if namespace.is_empty() {
                format!("{BUILTIN_PRESET_PREFIX}{name}")
            } else {
                format!("plugin:{namespace}/{name}")
            };
            self.presets.insert(reference, document);
        }

        tracing::debug!(
            "Registered namespace '{}' ({} rules)",
            if namespace.is_empty() { "<builtin>" } else { namespace.as_str() },
            rules.len()
        );
    }

    /// Builder-style registration
    pub fn with_provider(mut self, provider: &dyn RuleDescriptorProvider) -> Self {
        self.register_provider(provider);
        self
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    pub fn rule_count(&self) -> usize {
        self.namespaces.values().map(BTreeMap::len).sum()
    }

    /// Look a rule up without any plugin-enablement check
    pub fn get(&self, rule_id: &str) -> Option<&RuleDescriptor> {
        let (namespace, _) = split_rule_id(rule_id);
        self.namespaces.get(namespace)?.get(rule_id)
    }

    /// Look a rule up on behalf of a configuration
    ///
    /// With `strict` set, a plugin rule's namespace must be among `enabled`;
    /// built-in rules never need enabling.
    pub fn lookup(
        &self,
        rule_id: &str,
        enabled: &BTreeSet<String>,
        strict: bool,
    ) -> Result<&RuleDescriptor> {
        let (namespace, _) = split_rule_id(rule_id);

        if strict && !namespace.is_empty() && !enabled.contains(namespace) {
            return Err(CascadeError::unknown_rule(
                rule_id,
                format!("plugin '{namespace}' is not enabled"),
            ));
        }

        let rules = self.namespaces.get(namespace).ok_or_else(|| {
            if namespace.is_empty() {
                CascadeError::unknown_rule(rule_id, "no built-in rule with this name")
            } else {
                CascadeError::unknown_rule(rule_id, format!("plugin '{namespace}' is not registered"))
            }
        })?;

        rules.get(rule_id).ok_or_else(|| {
            CascadeError::unknown_rule(
                rule_id,
                if namespace.is_empty() {
                    "no built-in rule with this name".to_string()
                } else {
                    format!("plugin '{namespace}' has no such rule")
                },
            )
        })
    }

    /// Presets contributed by providers, as a fragment source
    pub fn preset_source(&self) -> MemorySource {
        let source = MemorySource::new("presets");
        for (reference, document) in &self.presets {
            source.insert(reference.clone(), document.clone());
        }
        source
    }

    pub fn preset_names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> PluginRuleRegistry {
        PluginRuleRegistry::new()
            .with_provider(&PluginManifest::builtin().with_simple_rule("no-var", Severity::Error))
            .with_provider(
                &PluginManifest::new("eslint-plugin-react")
                    .with_simple_rule("prop-types", Severity::Error),
            )
            .with_provider(
                &PluginManifest::new("@next/eslint-plugin-next")
                    .with_simple_rule("no-img-element", Severity::Warn),
            )
    }

    fn enabled(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_normalize_plugin_name() {
        assert_eq!(normalize_plugin_name("react"), "react");
        assert_eq!(normalize_plugin_name("eslint-plugin-react"), "react");
        assert_eq!(normalize_plugin_name("@typescript-eslint"), "@typescript-eslint");
        assert_eq!(normalize_plugin_name("@typescript-eslint/eslint-plugin"), "@typescript-eslint");
        assert_eq!(normalize_plugin_name("@next/eslint-plugin-next"), "@next/next");
    }

    #[test]
    fn test_split_rule_id() {
        assert_eq!(split_rule_id("no-var"), ("", "no-var"));
        assert_eq!(split_rule_id("react/prop-types"), ("react", "prop-types"));
        assert_eq!(
            split_rule_id("@typescript-eslint/no-explicit-any"),
            ("@typescript-eslint", "no-explicit-any")
        );
        assert_eq!(split_rule_id("@next/next/no-img-element"), ("@next/next", "no-img-element"));
    }

    #[test]
    fn test_lookup_builtin_and_plugin_rules() {
        let registry = registry();
        let react = enabled(&["react"]);

        assert!(registry.lookup("no-var", &react, true).is_ok());
        let descriptor = registry.lookup("react/prop-types", &react, true).unwrap();
        assert_eq!(descriptor.namespace, "react");
        assert_eq!(descriptor.default_severity, Severity::Error);
    }

    #[test]
    fn test_lookup_requires_enabled_namespace_when_strict() {
        let registry = registry();
        let none = BTreeSet::new();

        let err = registry.lookup("react/prop-types", &none, true).unwrap_err();
        assert!(matches!(err, CascadeError::UnknownRule { .. }));
        assert!(registry.lookup("react/prop-types", &none, false).is_ok());
    }

    #[test]
    fn test_lookup_unknown_rules() {
        let registry = registry();
        let all = enabled(&["react", "pluginX"]);

        assert!(registry.lookup("no-such-rule", &all, true).is_err());
        assert!(registry.lookup("react/no-such-rule", &all, true).is_err());
        assert!(registry.lookup("pluginX/ruleY", &all, true).is_err());
    }

    #[test]
    fn test_option_schema_arity_and_shape() {
        let schema = OptionSchema {
            min_items: 0,
            max_items: Some(1),
            items: vec![OptionShape::Object],
        };

        assert!(schema.validate(&[]).is_ok());
        let object: SettingValue = serde_json::from_value(json!({"extensions": [".tsx"]})).unwrap();
        assert!(schema.validate(&[object.clone()]).is_ok());
        assert!(schema.validate(&["always".into()]).is_err());
        assert!(schema.validate(&[object.clone(), object]).is_err());
        assert!(OptionSchema::none().validate(&["x".into()]).is_err());
    }

    #[test]
    fn test_presets_are_exposed_as_references() {
        let manifest = PluginManifest::new("react").with_config(
            "recommended",
            serde_json::from_value(json!({"plugins": ["react"]})).unwrap(),
        );
        let registry = PluginRuleRegistry::new()
            .with_provider(&manifest)
            .with_provider(&PluginManifest::builtin().with_config("recommended", FragmentDocument::default()));

        let names: Vec<&str> = registry.preset_names().collect();
        assert_eq!(names, vec!["eslint:recommended", "plugin:react/recommended"]);
    }

    #[test]
    fn test_manifest_deserialization() {
        let manifest: PluginManifest = serde_json::from_value(json!({
            "namespace": "jsx-a11y",
            "rules": {
                "alt-text": {"defaultSeverity": "error"},
                "anchor-is-valid": {"optionSchema": {"maxItems": 1, "items": ["object"]}}
            }
        }))
        .unwrap();

        let descriptors = manifest.descriptors();
        assert_eq!(descriptors[0].rule_id, "jsx-a11y/alt-text");
        assert_eq!(descriptors[1].default_severity, Severity::Off);
        assert_eq!(descriptors[1].schema.max_items, Some(1));
    }
}
