//! Configuration fragments: the documents that `extends` chains are built from
//!
//! ## Document shape
//!
//! ```jsonc
//! {
//!   "extends": ["eslint:recommended", "plugin:react/recommended", "./base.json"],
//!   "plugins": ["react", "@typescript-eslint"],
//!   "parser": "@typescript-eslint/parser",
//!   "parserOptions": { "ecmaVersion": 2021, "ecmaFeatures": { "jsx": true } },
//!   "env": { "browser": true, "node": true },
//!   "settings": { "react": { "version": "detect" } },
//!   "rules": {
//!     "no-var": "error",
//!     "eqeqeq": ["error", "always"],
//!     "react/function-component-definition": [2, { "namedComponents": "arrow-function" }]
//!   },
//!   "overrides": [
//!     { "files": ["**/*.tsx"], "rules": { "react/prop-types": "off" } }
//!   ]
//! }
//! ```

use super::registry::normalize_plugin_name;
use super::severity::RawSeverity;
use super::value::{SettingValue, SettingsMap};
use crate::fingerprint::Fingerprint;
use crate::result::Result;
use indexmap::IndexMap;
use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use std::borrow::{Borrow, Cow};
use std::fmt;

/// Stable identity of a fragment (preset name or canonical file path)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(String);

impl FragmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FragmentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FragmentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A string or a list of strings (`"extends": "base"` or `"extends": ["a", "b"]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            OneOrMany::One(value) => vec![value.clone()],
            OneOrMany::Many(values) => values.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            OneOrMany::One(_) => false,
            OneOrMany::Many(values) => values.is_empty(),
        }
    }
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

/// One entry of a `rules` mapping
///
/// Written as a bare severity (`"error"`, `2`) or as an array whose first
/// element is the severity and whose remaining elements are the options.
/// `options: None` means "use the rule's declared default options".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RuleEntryRepr", into = "RuleEntryRepr")]
pub struct RuleEntry {
    pub severity: RawSeverity,
    pub options: Option<Vec<SettingValue>>,
}

impl RuleEntry {
    pub fn new(severity: impl Into<RawSeverity>) -> Self {
        Self {
            severity: severity.into(),
            options: None,
        }
    }

    pub fn with_options(severity: impl Into<RawSeverity>, options: Vec<SettingValue>) -> Self {
        Self {
            severity: severity.into(),
            options: Some(options),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
enum RuleEntryRepr {
    Bare(RawSeverity),
    Array(Vec<SettingValue>),
}

impl TryFrom<RuleEntryRepr> for RuleEntry {
    type Error = String;

    fn try_from(repr: RuleEntryRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            RuleEntryRepr::Bare(severity) => Ok(RuleEntry {
                severity,
                options: None,
            }),
            RuleEntryRepr::Array(mut items) => {
                if items.is_empty() {
                    return Err("rule entry array must start with a severity".to_string());
                }
                let severity = match items.remove(0) {
                    SettingValue::String(text) => RawSeverity::Text(text),
                    SettingValue::Number(number) => RawSeverity::Code(number),
                    other => {
                        return Err(format!(
                            "rule entry array must start with a severity, found {:?}",
                            other.kind()
                        ));
                    }
                };
                // `["error"]` means the same as `"error"`
                Ok(RuleEntry {
                    severity,
                    options: (!items.is_empty()).then_some(items),
                })
            }
        }
    }
}

impl From<RuleEntry> for RuleEntryRepr {
    fn from(entry: RuleEntry) -> Self {
        match entry.options {
            None => RuleEntryRepr::Bare(entry.severity),
            Some(options) => {
                let head = match entry.severity {
                    RawSeverity::Text(text) => SettingValue::String(text),
                    RawSeverity::Code(number) => SettingValue::Number(number),
                };
                let mut items = Vec::with_capacity(options.len() + 1);
                items.push(head);
                items.extend(options);
                RuleEntryRepr::Array(items)
            }
        }
    }
}

impl JsonSchema for RuleEntry {
    fn schema_name() -> Cow<'static, str> {
        "RuleEntry".into()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        RuleEntryRepr::json_schema(generator)
    }
}

/// Ordered rule mapping: rule id -> entry
pub type RuleMap = IndexMap<String, RuleEntry>;

/// A path-scoped overlay
///
/// Overrides are pure overlay data: they cannot `extends` anything, and any
/// unknown field is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OverrideBlock {
    /// Glob patterns selecting the files this override applies to
    pub files: OneOrMany,

    /// Glob patterns vetoing files that `files` selected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_files: Option<OneOrMany>,

    /// Additional plugin namespaces enabled for matching files
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub rules: RuleMap,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub settings: SettingsMap,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, bool>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub globals: SettingsMap,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parser_options: SettingsMap,
}

impl OverrideBlock {
    /// An override for the given include patterns with no overlay data yet
    pub fn for_files<S: Into<String>>(files: impl IntoIterator<Item = S>) -> Self {
        Self {
            files: OneOrMany::Many(files.into_iter().map(Into::into).collect()),
            excluded_files: None,
            plugins: Vec::new(),
            rules: RuleMap::new(),
            settings: SettingsMap::new(),
            env: IndexMap::new(),
            globals: SettingsMap::new(),
            parser: None,
            parser_options: SettingsMap::new(),
        }
    }
}

/// A configuration document as written
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FragmentDocument {
    /// Inherited fragments, applied left to right before this document
    #[serde(default, skip_serializing_if = "OneOrMany::is_empty")]
    pub extends: OneOrMany,

    /// Plugin namespaces whose rules this document may configure
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub rules: RuleMap,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub settings: SettingsMap,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, bool>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub globals: SettingsMap,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parser_options: SettingsMap,

    /// Paths the analysis pipeline should skip entirely
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_patterns: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<OverrideBlock>,
}

impl FragmentDocument {
    /// Canonical plugin names everywhere in the document
    fn normalized(mut self) -> Self {
        self.plugins = normalize_plugins(&self.plugins);
        for block in &mut self.overrides {
            block.plugins = normalize_plugins(&block.plugins);
        }
        self
    }
}

fn normalize_plugins(plugins: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(plugins.len());
    for name in plugins.iter().map(|p| normalize_plugin_name(p)) {
        if !normalized.contains(&name) {
            normalized.push(name);
        }
    }
    normalized
}

/// A loaded, immutable fragment
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    id: FragmentId,
    document: FragmentDocument,
    override_fingerprints: Vec<Fingerprint>,
    fingerprint: Fingerprint,
}

impl Fragment {
    /// Normalize a document and fingerprint its content
    pub fn new(id: FragmentId, document: FragmentDocument) -> Result<Self> {
        let document = document.normalized();
        let fingerprint = Fingerprint::of(&document)?;
        let override_fingerprints = document
            .overrides
            .iter()
            .map(Fingerprint::of)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id,
            document,
            override_fingerprints,
            fingerprint,
        })
    }

    pub fn id(&self) -> &FragmentId {
        &self.id
    }

    pub fn document(&self) -> &FragmentDocument {
        &self.document
    }

    pub fn extends(&self) -> Vec<String> {
        self.document.extends.to_vec()
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Fingerprints of this fragment's own override blocks, in order
    pub fn override_fingerprints(&self) -> &[Fingerprint] {
        &self.override_fingerprints
    }
}
