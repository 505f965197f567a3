//! Configuration fragments and the resolution pipeline
//!
//! ```text
//! FragmentSource ──> FragmentLoader ──> FragmentMerger ──> BaseConfiguration
//!                    (extends chain)    (inheritance)           │
//!                                                     per path  ▼
//!                       ResolvedConfiguration <── SeverityNormalizer <── OverrideEngine
//! ```
//!
//! ## Configuration Inheritance
//!
//! A fragment inherits from other fragments through `extends`. Entries are
//! applied left to right before the fragment itself, and each may be:
//!
//! - a relative or absolute file path (`./base.json`, `../shared/eslint.yaml`)
//! - a plugin preset (`plugin:react/recommended`)
//! - a built-in preset (`eslint:recommended`)
//! - a shareable name served by a named source (`next/core-web-vitals`)
//!
//! ```jsonc
//! {
//!   "extends": ["eslint:recommended", "./base.json"],
//!   "plugins": ["react"],
//!   "rules": { "react/prop-types": "off" },
//!   "overrides": [
//!     { "files": ["**/*.test.tsx"], "env": { "jest": true } }
//!   ]
//! }
//! ```
//!
//! ## Supported formats
//!
//! - `*.json`, `*.jsonc`, `.eslintrc` - JSON, comments and trailing commas allowed
//! - `*.yaml`, `*.yml` - YAML
//! - `*.toml` - TOML
//! - `package.json` - the `eslintConfig` field

pub mod fragment;
pub mod loader;
pub mod merge;
pub mod normalize;
pub mod overrides;
pub mod registry;
pub mod resolved;
pub mod severity;
pub mod source;
pub mod value;

// Re-export main types
pub use fragment::{Fragment, FragmentDocument, FragmentId, OneOrMany, OverrideBlock, RuleEntry, RuleMap};
pub use loader::{FragmentLoader, LoadedChain};
pub use merge::{BaseConfiguration, ConfigLayer, FragmentMerger, MergeOptions, MergedOverride};
pub use normalize::SeverityNormalizer;
pub use overrides::{CandidateConfiguration, OverrideEngine};
pub use registry::{
    ManifestRule, OptionSchema, OptionShape, PluginManifest, PluginRuleRegistry, RuleDescriptor,
    RuleDescriptorProvider, normalize_plugin_name, split_rule_id,
};
pub use resolved::{ResolvedConfiguration, ResolvedRule};
pub use severity::{RawSeverity, Severity};
pub use source::{FileSource, FragmentSource, MemorySource, SourceChain, parse_document};
pub use value::{SettingValue, SettingsMap};
