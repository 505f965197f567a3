//! Cascade Core
//!
//! Configuration resolution engine for pluggable static-analysis tools.
//! Takes layered configuration fragments (inherited presets, plugin rule
//! sets, per-path overrides) and deterministically produces the concrete rule
//! set each file is analyzed with.
//!
//! ```no_run
//! use cascade_core::{ConfigEngine, EngineOptions, FileSource, PluginManifest, PluginRuleRegistry};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> cascade_core::Result<()> {
//! let registry = PluginRuleRegistry::new()
//!     .with_provider(&PluginManifest::load(Path::new("builtin-rules.json"))?)
//!     .with_provider(&PluginManifest::load(Path::new("react-manifest.json"))?);
//!
//! let engine = ConfigEngine::initialize(
//!     ".eslintrc.json",
//!     Arc::new(FileSource::new(".")),
//!     Arc::new(registry),
//!     EngineOptions::default(),
//! )?;
//!
//! let resolved = engine.resolve("src/App.tsx")?;
//! for (rule_id, rule) in resolved.enabled_rules() {
//!     println!("{rule_id}: {}", rule.severity);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod glob_matcher;
pub mod result;

// Re-export commonly used types
pub use cache::{CacheKey, CacheStats, ResolutionCache};
pub use config::{
    BaseConfiguration, FileSource, Fragment, FragmentDocument, FragmentId, FragmentLoader,
    FragmentMerger, FragmentSource, MemorySource, OverrideEngine, PluginManifest,
    PluginRuleRegistry, ResolvedConfiguration, ResolvedRule, RuleDescriptor,
    RuleDescriptorProvider, SettingValue, Severity, SeverityNormalizer, SourceChain,
};
pub use engine::{ConfigEngine, EngineOptions, ReloadReport};
pub use error::{CascadeError, ErrorKind};
pub use fingerprint::Fingerprint;
pub use glob_matcher::{GlobPattern, PatternSet};
pub use result::{Result, ResultExt};

/// Initialize the tracing subscriber for logging
///
/// Honors `RUST_LOG`; defaults to `cascade=info`. Calling it again is a no-op.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cascade=info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
