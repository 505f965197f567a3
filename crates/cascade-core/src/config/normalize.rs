//! Severity canonicalization and rule validation against the registry

use super::fragment::RuleEntry;
use super::merge::ConfigLayer;
use super::registry::PluginRuleRegistry;
use super::resolved::ResolvedRule;
use super::severity::Severity;
use crate::error::CascadeError;
use crate::result::Result;
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// Turns raw rule entries into [`ResolvedRule`]s
///
/// Per entry, in order: canonicalize the severity (`InvalidSeverity`), look
/// the rule up (`UnknownRule`), then check supplied options against the
/// rule's schema (`InvalidRuleOptions`). Entries without options take the
/// rule's declared defaults.
#[derive(Debug, Clone, Copy)]
pub struct SeverityNormalizer<'a> {
    registry: &'a PluginRuleRegistry,
    strict: bool,
}

impl<'a> SeverityNormalizer<'a> {
    pub fn new(registry: &'a PluginRuleRegistry, strict: bool) -> Self {
        Self { registry, strict }
    }

    pub fn normalize_rule(
        &self,
        rule_id: &str,
        entry: &RuleEntry,
        enabled_plugins: &BTreeSet<String>,
    ) -> Result<ResolvedRule> {
        let severity = Severity::from_raw(&entry.severity)
            .ok_or_else(|| CascadeError::invalid_severity(rule_id, entry.severity.to_string()))?;

        let descriptor = self.registry.lookup(rule_id, enabled_plugins, self.strict)?;

        let options = match &entry.options {
            Some(options) => {
                descriptor
                    .schema
                    .validate(options)
                    .map_err(|reason| CascadeError::invalid_rule_options(rule_id, reason))?;
                options.clone()
            }
            None => descriptor.default_options.clone(),
        };

        Ok(ResolvedRule { severity, options })
    }

    /// Normalize every rule of a layer, keeping `off` entries
    pub fn normalize(&self, layer: &ConfigLayer) -> Result<IndexMap<String, ResolvedRule>> {
        layer
            .rules
            .iter()
            .map(|(rule_id, entry)| {
                self.normalize_rule(rule_id, entry, &layer.plugins)
                    .map(|rule| (rule_id.clone(), rule))
            })
            .collect()
    }

    /// Every problem in a layer instead of just the first
    pub fn diagnose(&self, layer: &ConfigLayer) -> Vec<CascadeError> {
        layer
            .rules
            .iter()
            .filter_map(|(rule_id, entry)| self.normalize_rule(rule_id, entry, &layer.plugins).err())
            .collect()
    }
}
