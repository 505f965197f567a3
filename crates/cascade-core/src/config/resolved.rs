//! The terminal per-file output handed to rule execution

use super::severity::Severity;
use super::value::{SettingValue, SettingsMap};
use crate::error::CascadeError;
use crate::fingerprint::Fingerprint;
use crate::result::Result;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;

/// One rule's final severity and options
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRule {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SettingValue>,
}

impl ResolvedRule {
    pub fn is_enabled(&self) -> bool {
        self.severity.is_enabled()
    }
}

/// Fully resolved, immutable configuration for one file path
///
/// Rules set to `off` are kept so consumers can tell "disabled" from "never
/// configured".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfiguration {
    pub path: String,
    /// Resolution fingerprint the result was computed under
    pub fingerprint: Fingerprint,
    pub plugins: BTreeSet<String>,
    pub rules: IndexMap<String, ResolvedRule>,
    pub settings: SettingsMap,
    pub env: IndexMap<String, bool>,
    pub globals: SettingsMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parser: Option<String>,
    pub parser_options: SettingsMap,
}

impl ResolvedConfiguration {
    pub fn rule(&self, rule_id: &str) -> Option<&ResolvedRule> {
        self.rules.get(rule_id)
    }

    /// Severity of a rule; `None` when the rule was never configured
    pub fn severity(&self, rule_id: &str) -> Option<Severity> {
        self.rules.get(rule_id).map(|rule| rule.severity)
    }

    /// Rules that will actually run, in configuration order
    pub fn enabled_rules(&self) -> impl Iterator<Item = (&str, &ResolvedRule)> {
        self.rules
            .iter()
            .filter(|(_, rule)| rule.is_enabled())
            .map(|(id, rule)| (id.as_str(), rule))
    }

    /// Whether an environment flag is switched on
    pub fn env_enabled(&self, flag: &str) -> bool {
        self.env.get(flag).copied().unwrap_or(false)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CascadeError::internal_error(format!("Failed to serialize '{}': {e}", self.path)))
    }
}
