//! Fragment merging: folding an `extends` chain into one base configuration
//!
//! Per-field policy, applied base-to-derived:
//!
//! - `plugins`: union
//! - `rules`: a later entry for the same rule id replaces the earlier one
//!   wholesale (severity and options together)
//! - `settings`, `env`, `globals`, `parserOptions`: shallow key overlay;
//!   settings keys listed in [`MergeOptions::deep_merge_settings`] deep-merge
//! - `parser`: last one set wins
//! - `ignorePatterns`: concatenated
//! - `overrides`: concatenated in chain order, so a fragment's own overrides
//!   come after those of everything it extends

use super::fragment::{FragmentDocument, FragmentId, OverrideBlock, RuleMap};
use super::loader::LoadedChain;
use super::value::{SettingsMap, overlay_settings};
use crate::error::CascadeError;
use crate::fingerprint::Fingerprint;
use crate::glob_matcher::{GlobPattern, PatternSet};
use crate::result::Result;
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// The mergeable part of a document: everything except inheritance and scoping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigLayer {
    pub plugins: BTreeSet<String>,
    pub rules: RuleMap,
    pub settings: SettingsMap,
    pub env: IndexMap<String, bool>,
    pub globals: SettingsMap,
    pub parser: Option<String>,
    pub parser_options: SettingsMap,
}

impl ConfigLayer {
    pub fn from_document(document: &FragmentDocument) -> Self {
        Self {
            plugins: document.plugins.iter().cloned().collect(),
            rules: document.rules.clone(),
            settings: document.settings.clone(),
            env: document.env.clone(),
            globals: document.globals.clone(),
            parser: document.parser.clone(),
            parser_options: document.parser_options.clone(),
        }
    }

    pub fn from_override(block: &OverrideBlock) -> Self {
        Self {
            plugins: block.plugins.iter().cloned().collect(),
            rules: block.rules.clone(),
            settings: block.settings.clone(),
            env: block.env.clone(),
            globals: block.globals.clone(),
            parser: block.parser.clone(),
            parser_options: block.parser_options.clone(),
        }
    }

    /// Layer `other` on top of this one (`other` takes precedence)
    pub fn merge_with(&mut self, other: &ConfigLayer, options: &MergeOptions) {
        self.plugins.extend(other.plugins.iter().cloned());

        for (rule_id, entry) in &other.rules {
            self.rules.insert(rule_id.clone(), entry.clone());
        }

        overlay_settings(&mut self.settings, &other.settings, &options.deep_merge_settings);
        overlay_settings(&mut self.globals, &other.globals, &BTreeSet::new());
        overlay_settings(
            &mut self.parser_options,
            &other.parser_options,
            &BTreeSet::new(),
        );

        for (flag, enabled) in &other.env {
            self.env.insert(flag.clone(), *enabled);
        }

        if other.parser.is_some() {
            self.parser.clone_from(&other.parser);
        }
    }
}

/// Knobs that change merge results (and therefore fingerprints)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Settings keys whose nested maps deep-merge instead of being replaced
    pub deep_merge_settings: BTreeSet<String>,
}

impl MergeOptions {
    pub fn with_deep_merge<S: Into<String>>(keys: impl IntoIterator<Item = S>) -> Self {
        Self {
            deep_merge_settings: keys.into_iter().map(Into::into).collect(),
        }
    }
}

/// An override block placed in the merged, chain-ordered override list
#[derive(Debug, Clone)]
pub struct MergedOverride {
    origin: FragmentId,
    index: usize,
    include: PatternSet,
    exclude: PatternSet,
    layer: ConfigLayer,
    fingerprint: Fingerprint,
}

impl MergedOverride {
    fn new(origin: FragmentId, index: usize, block: &OverrideBlock, fingerprint: Fingerprint) -> Self {
        let exclude = block
            .excluded_files
            .as_ref()
            .map(|files| PatternSet::compile_lenient(&files.to_vec()))
            .unwrap_or_default();

        Self {
            include: PatternSet::compile_lenient(&block.files.to_vec()),
            exclude,
            layer: ConfigLayer::from_override(block),
            origin,
            index,
            fingerprint,
        }
    }

    /// The fragment that declared this override
    pub fn origin(&self) -> &FragmentId {
        &self.origin
    }

    /// Position within the declaring fragment's `overrides` list
    pub fn index(&self) -> usize {
        self.index
    }

    /// `<fragment>#overrides[<index>]`, for diagnostics
    pub fn label(&self) -> String {
        format!("{}#overrides[{}]", self.origin, self.index)
    }

    pub fn layer(&self) -> &ConfigLayer {
        &self.layer
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Decide whether this override applies to a normalized path
    ///
    /// A malformed pattern only fails the paths this override could have
    /// affected: those selected by a valid include pattern, or every path when
    /// no include pattern compiled at all.
    pub fn applies_to(&self, path: &str) -> Result<bool> {
        let selected = self.include.matches(path);

        if let Some(err) = self.include.malformed_error() {
            if selected || self.include.is_empty() {
                return Err(err.with_origin(self.label()));
            }
            return Ok(false);
        }

        if !selected {
            return Ok(false);
        }

        if let Some(err) = self.exclude.malformed_error() {
            return Err(err.with_origin(self.label()));
        }

        Ok(!self.exclude.matches(path))
    }

    /// Every malformed pattern in this override, as errors
    pub fn malformed_patterns(&self) -> Vec<CascadeError> {
        self.include
            .malformed()
            .iter()
            .chain(self.exclude.malformed())
            .map(|m| CascadeError::malformed_glob(&m.pattern, &m.reason).with_origin(self.label()))
            .collect()
    }
}

/// A fragment's `extends` chain fully merged, before any path-specific data
#[derive(Debug, Clone)]
pub struct BaseConfiguration {
    root: FragmentId,
    layer: ConfigLayer,
    overrides: Vec<MergedOverride>,
    ignore_patterns: PatternSet,
    sources: BTreeSet<FragmentId>,
    options: MergeOptions,
    fingerprint: Fingerprint,
    resolution_fingerprint: Fingerprint,
}

impl BaseConfiguration {
    pub fn root(&self) -> &FragmentId {
        &self.root
    }

    pub fn layer(&self) -> &ConfigLayer {
        &self.layer
    }

    pub fn overrides(&self) -> &[MergedOverride] {
        &self.overrides
    }

    pub fn ignore_patterns(&self) -> &PatternSet {
        &self.ignore_patterns
    }

    /// Distinct fragment identities this configuration was built from
    pub fn sources(&self) -> &BTreeSet<FragmentId> {
        &self.sources
    }

    pub fn depends_on(&self, id: &FragmentId) -> bool {
        self.sources.contains(id)
    }

    /// The merge options overrides are layered with
    pub fn merge_options(&self) -> &MergeOptions {
        &self.options
    }

    /// Fingerprint of the merged chain (fragment contents + merge options)
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Fingerprint of everything that can influence a per-path resolution:
    /// the base fingerprint plus every override fingerprint, in order
    pub fn resolution_fingerprint(&self) -> &Fingerprint {
        &self.resolution_fingerprint
    }

    /// Whether a normalized path falls under `ignorePatterns`
    pub fn is_ignored(&self, path: &str) -> bool {
        self.ignore_patterns.matches_path_or_ancestor(path)
    }
}

/// Folds loaded chains into base configurations
#[derive(Debug, Clone, Default)]
pub struct FragmentMerger {
    options: MergeOptions,
}

impl FragmentMerger {
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Merge a chain (base-to-derived) into one base configuration
    ///
    /// Pure: only the chain's fragments are consulted. Fails with
    /// `MalformedGlobPattern` when an `ignorePatterns` entry does not compile.
    pub fn merge(&self, chain: &LoadedChain) -> Result<BaseConfiguration> {
        let mut layer = ConfigLayer::default();
        let mut overrides = Vec::new();
        let mut ignore_patterns = Vec::new();

        for fragment in &chain.fragments {
            let document = fragment.document();
            layer.merge_with(&ConfigLayer::from_document(document), &self.options);

            for raw in &document.ignore_patterns {
                let pattern = GlobPattern::new(raw).map_err(|e| e.with_origin(fragment.id().as_str()))?;
                ignore_patterns.push(pattern);
            }

            for (index, (block, fingerprint)) in document
                .overrides
                .iter()
                .zip(fragment.override_fingerprints())
                .enumerate()
            {
                overrides.push(MergedOverride::new(
                    fragment.id().clone(),
                    index,
                    block,
                    fingerprint.clone(),
                ));
            }
        }

        let fingerprint = Fingerprint::combine(
            chain
                .fragments
                .iter()
                .map(|f| f.fingerprint().as_str())
                .chain(std::iter::once("deep-merge-settings"))
                .chain(self.options.deep_merge_settings.iter().map(String::as_str)),
        );
        let resolution_fingerprint = Fingerprint::combine(
            std::iter::once(fingerprint.as_str())
                .chain(overrides.iter().map(|o| o.fingerprint().as_str())),
        );

        tracing::debug!(
            "Merged '{}': {} fragment(s), {} rule(s), {} override(s), fingerprint {}",
            chain.root,
            chain.fragments.len(),
            layer.rules.len(),
            overrides.len(),
            fingerprint.short()
        );

        Ok(BaseConfiguration {
            root: chain.root.clone(),
            sources: chain.distinct_ids(),
            ignore_patterns: ignore_patterns.into_iter().collect(),
            options: self.options.clone(),
            layer,
            overrides,
            fingerprint,
            resolution_fingerprint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fragment::{Fragment, RuleEntry};
    use serde_json::json;
    use std::sync::Arc;

    fn fragment(id: &str, value: serde_json::Value) -> Arc<Fragment> {
        let document: FragmentDocument = serde_json::from_value(value).unwrap();
        Arc::new(Fragment::new(FragmentId::new(id), document).unwrap())
    }

    fn chain(fragments: Vec<Arc<Fragment>>) -> LoadedChain {
        let root = fragments.last().unwrap().id().clone();
        LoadedChain { root, fragments }
    }

    #[test]
    fn test_later_rule_entry_replaces_earlier_wholesale() {
        let base = chain(vec![
            fragment("base", json!({"rules": {"eqeqeq": ["warn", "always"], "no-var": "error"}})),
            fragment("root", json!({"rules": {"eqeqeq": "error"}})),
        ]);

        let merged = FragmentMerger::default().merge(&base).unwrap();
        assert_eq!(merged.layer().rules["eqeqeq"], RuleEntry::new("error"));
        assert_eq!(merged.layer().rules["no-var"], RuleEntry::new("error"));
    }

    #[test]
    fn test_plugins_union_and_parser_last_wins() {
        let base = chain(vec![
            fragment("base", json!({"plugins": ["react"], "parser": "espree"})),
            fragment("mid", json!({"plugins": ["import"]})),
            fragment("root", json!({"plugins": ["react"], "parser": "@typescript-eslint/parser"})),
        ]);

        let merged = FragmentMerger::default().merge(&base).unwrap();
        let plugins: Vec<&str> = merged.layer().plugins.iter().map(String::as_str).collect();
        assert_eq!(plugins, vec!["import", "react"]);
        assert_eq!(merged.layer().parser.as_deref(), Some("@typescript-eslint/parser"));
    }

    #[test]
    fn test_settings_overlay_is_shallow_by_default() {
        let fragments = vec![
            fragment("base", json!({"settings": {"import/resolver": {"node": {}}}, "env": {"node": true}})),
            fragment("root", json!({"settings": {"import/resolver": {"typescript": {}}}, "env": {"browser": true}})),
        ];

        let shallow = FragmentMerger::default().merge(&chain(fragments.clone())).unwrap();
        let resolver = shallow.layer().settings["import/resolver"].as_map().unwrap();
        assert!(!resolver.contains_key("node"));
        assert_eq!(shallow.layer().env.len(), 2);

        let deep = FragmentMerger::new(MergeOptions::with_deep_merge(["import/resolver"]))
            .merge(&chain(fragments))
            .unwrap();
        let resolver = deep.layer().settings["import/resolver"].as_map().unwrap();
        assert!(resolver.contains_key("node"));
        assert!(resolver.contains_key("typescript"));
        assert_ne!(shallow.fingerprint(), deep.fingerprint());
    }

    #[test]
    fn test_overrides_concatenate_in_chain_order() {
        let base = chain(vec![
            fragment("base", json!({"overrides": [{"files": "*.js"}]})),
            fragment("root", json!({"overrides": [{"files": "*.ts"}, {"files": "*.tsx"}]})),
        ]);

        let merged = FragmentMerger::default().merge(&base).unwrap();
        let labels: Vec<String> = merged.overrides().iter().map(MergedOverride::label).collect();
        assert_eq!(labels, vec!["base#overrides[0]", "root#overrides[0]", "root#overrides[1]"]);
    }

    #[test]
    fn test_override_change_changes_resolution_fingerprint_only() {
        let before = FragmentMerger::default()
            .merge(&chain(vec![fragment(
                "root",
                json!({"rules": {"no-var": "error"}, "overrides": [{"files": "*.ts"}]}),
            )]))
            .unwrap();
        let after = FragmentMerger::default()
            .merge(&chain(vec![fragment(
                "root",
                json!({"rules": {"no-var": "error"}, "overrides": [{"files": "*.tsx"}]}),
            )]))
            .unwrap();

        assert_ne!(before.resolution_fingerprint(), after.resolution_fingerprint());
    }

    #[test]
    fn test_malformed_ignore_pattern_fails_merge() {
        let base = chain(vec![fragment("root", json!({"ignorePatterns": ["dist/[oops"]}))]);
        match FragmentMerger::default().merge(&base).unwrap_err() {
            CascadeError::MalformedGlobPattern { origin, .. } => {
                assert_eq!(origin.as_deref(), Some("root"));
            }
            other => panic!("expected malformed glob, got {other:?}"),
        }
    }

    #[test]
    fn test_ignore_patterns_concatenate() {
        let base = chain(vec![
            fragment("base", json!({"ignorePatterns": ["node_modules/"]})),
            fragment("root", json!({"ignorePatterns": ["*.min.js"]})),
        ]);

        let merged = FragmentMerger::default().merge(&base).unwrap();
        assert!(merged.is_ignored("node_modules/react/index.js"));
        assert!(merged.is_ignored("public/vendor.min.js"));
        assert!(!merged.is_ignored("src/index.js"));
    }

    #[test]
    fn test_override_exclusion_and_malformed_scope() {
        let base = chain(vec![fragment(
            "root",
            json!({"overrides": [
                {"files": ["src/**/*.ts"], "excludedFiles": ["**/*.d.ts"]},
                {"files": ["test/**/*.ts", "test/[bad"]}
            ]}),
        )]);
        let merged = FragmentMerger::default().merge(&base).unwrap();
        let [scoped, broken] = merged.overrides() else {
            panic!("expected two overrides");
        };

        assert!(scoped.applies_to("src/a.ts").unwrap());
        assert!(!scoped.applies_to("src/types.d.ts").unwrap());
        assert!(!scoped.applies_to("lib/a.ts").unwrap());

        assert!(broken.applies_to("test/a.ts").is_err());
        assert!(!broken.applies_to("src/a.ts").unwrap());
        assert_eq!(broken.malformed_patterns().len(), 1);
    }
}
