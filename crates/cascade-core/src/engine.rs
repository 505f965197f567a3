//! The configuration engine: initialization, per-path resolution and reload
//!
//! Fragment loading and merging happen once in [`ConfigEngine::initialize`]
//! (and again on [`ConfigEngine::reload`]). Resolution is the concurrent hot
//! path: it only reads the current base configuration and the cache.

use crate::cache::{CacheKey, CacheStats, DEFAULT_CAPACITY, ResolutionCache};
use crate::config::fragment::FragmentId;
use crate::config::loader::FragmentLoader;
use crate::config::merge::{BaseConfiguration, ConfigLayer, FragmentMerger, MergeOptions};
use crate::config::normalize::SeverityNormalizer;
use crate::config::overrides::OverrideEngine;
use crate::config::registry::PluginRuleRegistry;
use crate::config::resolved::{ResolvedConfiguration, ResolvedRule};
use crate::config::source::{FragmentSource, SourceChain, parse_structured};
use crate::error::CascadeError;
use crate::glob_matcher::normalize_path;
use crate::result::{Result, ResultExt};
use indexmap::IndexMap;
use rayon::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Engine configuration
///
/// ```json
/// { "cacheCapacity": 10000, "deepMergeSettings": ["import/resolver"], "strictPlugins": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineOptions {
    /// Maximum number of cached per-path resolutions
    pub cache_capacity: usize,

    /// Settings keys whose nested maps deep-merge instead of being replaced
    pub deep_merge_settings: Vec<String>,

    /// Require a plugin rule's namespace to be enabled through `plugins`
    pub strict_plugins: bool,

    /// Absolute paths under this directory are matched relative to it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_dir: Option<PathBuf>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CAPACITY,
            deep_merge_settings: Vec::new(),
            strict_plugins: true,
            root_dir: None,
        }
    }
}

impl EngineOptions {
    /// Load options from a JSON, YAML or TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| CascadeError::io_error(path, e))?;
        parse_structured(path, &content)
    }

    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(root_dir.into());
        self
    }

    fn merge_options(&self) -> MergeOptions {
        MergeOptions::with_deep_merge(self.deep_merge_settings.iter().cloned())
    }
}

/// Outcome of [`ConfigEngine::reload`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadReport {
    /// Fragments dropped from the load cache (the reloaded one and its dependents)
    pub invalidated: Vec<FragmentId>,
    /// Whether the base configuration was rebuilt
    pub rebuilt: bool,
    /// Whether the rebuilt base has a different fingerprint
    pub fingerprint_changed: bool,
    /// Cached resolutions dropped because their fingerprint went stale
    pub purged: usize,
}

/// Current base configuration, or why there is none
#[derive(Debug, Clone)]
enum EngineState {
    Ready(Arc<BaseConfiguration>),
    /// A reload failed; nothing resolves until a later reload succeeds
    Broken(String),
}

/// Resolves per-file configurations for one root fragment
pub struct ConfigEngine {
    root_reference: String,
    registry: Arc<PluginRuleRegistry>,
    loader: FragmentLoader,
    merger: FragmentMerger,
    options: EngineOptions,
    state: RwLock<EngineState>,
    cache: ResolutionCache,
    /// Serializes reloads: invalidate, load, merge, swap and purge
    reload_lock: Mutex<()>,
}

impl ConfigEngine {
    /// Load and merge the root fragment's inheritance chain
    ///
    /// Presets registered with `registry` are resolvable as `extends` targets
    /// ahead of `source`. Fails on any inheritance-graph error
    /// (`UnresolvedReference`, `CyclicInheritance`, `ParseError`) and on
    /// malformed `ignorePatterns`.
    pub fn initialize(
        root: &str,
        source: Arc<dyn FragmentSource>,
        registry: Arc<PluginRuleRegistry>,
        options: EngineOptions,
    ) -> Result<Self> {
        let sources = SourceChain::new()
            .with(Arc::new(registry.preset_source()))
            .with(source);
        let loader = FragmentLoader::new(Arc::new(sources));
        let merger = FragmentMerger::new(options.merge_options());

        let base = merger.merge(&loader.load(root)?)?;
        tracing::info!(
            "Initialized configuration '{}' from {} fragment(s), {} override(s)",
            base.root(),
            base.sources().len(),
            base.overrides().len()
        );

        Ok(Self {
            root_reference: root.to_string(),
            cache: ResolutionCache::with_capacity(options.cache_capacity),
            state: RwLock::new(EngineState::Ready(Arc::new(base))),
            reload_lock: Mutex::new(()),
            registry,
            loader,
            merger,
            options,
        })
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn registry(&self) -> &PluginRuleRegistry {
        &self.registry
    }

    /// The current base configuration
    pub fn base(&self) -> Result<Arc<BaseConfiguration>> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            EngineState::Ready(base) => Ok(Arc::clone(base)),
            EngineState::Broken(reason) => Err(CascadeError::config_error(format!(
                "configuration '{}' failed to reload: {reason}",
                self.root_reference
            ))),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Path as matched against globs: relative to `root_dir` when possible
    pub fn match_path(&self, path: &Path) -> String {
        let relative = match &self.options.root_dir {
            Some(root) if path.is_absolute() => path.strip_prefix(root).unwrap_or(path),
            _ => path,
        };
        normalize_path(relative)
    }

    /// Resolve the configuration for one file
    ///
    /// Served from the cache when this path was already resolved under the
    /// current fingerprint. Per-file problems (`UnknownRule`,
    /// `InvalidSeverity`, `InvalidRuleOptions`, `MalformedGlobPattern`) fail
    /// only this path.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<Arc<ResolvedConfiguration>> {
        let base = self.base()?;
        let path = self.match_path(path.as_ref());
        let key = CacheKey::new(path.clone(), base.resolution_fingerprint().clone());

        self.cache
            .get_or_try_insert_with(key, || self.compute(&base, &path))
    }

    /// Resolve many files in parallel; results keep the input order
    pub fn resolve_many<P>(&self, paths: &[P]) -> Vec<Result<Arc<ResolvedConfiguration>>>
    where
        P: AsRef<Path> + Sync,
    {
        paths.par_iter().map(|path| self.resolve(path)).collect()
    }

    /// Resolve many files, skipping those that fail with a per-file error
    ///
    /// Recoverable failures are logged and yield `None` in the input's
    /// position. The first fatal error (no usable base configuration) aborts.
    pub fn resolve_reported<P>(
        &self,
        paths: &[P],
    ) -> Result<Vec<Option<Arc<ResolvedConfiguration>>>>
    where
        P: AsRef<Path> + Sync,
    {
        self.resolve_many(paths)
            .into_iter()
            .map(|result| result.recoverable())
            .collect()
    }

    fn compute(&self, base: &BaseConfiguration, path: &str) -> Result<ResolvedConfiguration> {
        let candidate = OverrideEngine::new(base).apply(path)?;
        let rules = self.normalizer().normalize(&candidate.layer)?;

        tracing::debug!(
            "Resolved '{}': {} rule(s), {} override(s) applied",
            path,
            rules.len(),
            candidate.applied.len()
        );
        Ok(build_resolved(
            path,
            base,
            candidate.layer.into_owned(),
            rules,
        ))
    }

    fn normalizer(&self) -> SeverityNormalizer<'_> {
        SeverityNormalizer::new(&self.registry, self.options.strict_plugins)
    }

    /// Whether a file falls under the merged `ignorePatterns`
    pub fn is_ignored(&self, path: impl AsRef<Path>) -> Result<bool> {
        Ok(self.base()?.is_ignored(&self.match_path(path.as_ref())))
    }

    /// Every per-file problem reachable from the configuration
    ///
    /// Checks the base rules and each override layered onto the base on its
    /// own, plus every malformed override pattern. Empty when all is well.
    pub fn validate(&self) -> Vec<CascadeError> {
        let base = match self.base() {
            Ok(base) => base,
            Err(err) => return vec![err],
        };
        let normalizer = self.normalizer();
        let mut seen = BTreeSet::new();
        let mut problems = Vec::new();

        let mut record = |err: CascadeError| {
            if seen.insert(err.to_string()) {
                problems.push(err);
            }
        };

        normalizer.diagnose(base.layer()).into_iter().for_each(&mut record);

        for block in base.overrides() {
            block.malformed_patterns().into_iter().for_each(&mut record);

            let mut layer = base.layer().clone();
            layer.merge_with(block.layer(), base.merge_options());
            normalizer.diagnose(&layer).into_iter().for_each(&mut record);
        }

        problems
    }

    /// Re-read a fragment whose content changed and rebuild what depends on it
    ///
    /// `identity` is resolved like a top-level `extends` reference, or
    /// matched against loaded identities when it no longer resolves (a
    /// deleted file, a removed document). The fragment and every fragment
    /// that transitively extends it are dropped from the load cache; when the
    /// root configuration depends on it, the base is rebuilt and cached
    /// resolutions under the old fingerprint are purged. A failed rebuild
    /// leaves the engine unusable (every `resolve` fails) until a later
    /// reload succeeds, so stale results are never served. Concurrent
    /// reloads run one at a time.
    pub fn reload(&self, identity: &str) -> Result<ReloadReport> {
        let _serialized = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let previous = match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            EngineState::Ready(base) => Some(Arc::clone(base)),
            EngineState::Broken(_) => None,
        };

        let known: Vec<FragmentId> = self
            .loader
            .candidates(identity)
            .into_iter()
            .filter(|id| {
                self.loader.is_cached(id) || previous.as_ref().is_some_and(|b| b.depends_on(id))
            })
            .collect();

        let invalidated: Vec<FragmentId> = known
            .iter()
            .flat_map(|id| self.loader.invalidate(id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let affected = match &previous {
            Some(base) => invalidated.iter().chain(&known).any(|id| base.depends_on(id)),
            None => true,
        };
        if !affected {
            tracing::debug!(
                "Reload of '{}' does not affect '{}'",
                identity,
                self.root_reference
            );
            return Ok(ReloadReport {
                invalidated,
                rebuilt: false,
                fingerprint_changed: false,
                purged: 0,
            });
        }

        let rebuilt = self
            .loader
            .load(&self.root_reference)
            .and_then(|chain| self.merger.merge(&chain));

        let base = match rebuilt {
            Ok(base) => Arc::new(base),
            Err(err) => {
                tracing::error!("Reload of '{}' failed: {}", identity, err);
                *self.state.write().unwrap_or_else(PoisonError::into_inner) =
                    EngineState::Broken(err.to_string());
                self.cache.clear();
                return Err(err);
            }
        };

        let fingerprint_changed = previous
            .as_ref()
            .is_none_or(|old| old.resolution_fingerprint() != base.resolution_fingerprint());
        let live = base.resolution_fingerprint().clone();
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = EngineState::Ready(base);
        let purged = self.cache.purge_stale(&live);

        tracing::info!(
            "Reloaded '{}': {} fragment(s) invalidated, {} cached resolution(s) purged",
            identity,
            invalidated.len(),
            purged
        );
        Ok(ReloadReport {
            invalidated,
            rebuilt: true,
            fingerprint_changed,
            purged,
        })
    }
}

fn build_resolved(
    path: &str,
    base: &BaseConfiguration,
    layer: ConfigLayer,
    rules: IndexMap<String, ResolvedRule>,
) -> ResolvedConfiguration {
    ResolvedConfiguration {
        path: path.to_string(),
        fingerprint: base.resolution_fingerprint().clone(),
        plugins: layer.plugins,
        rules,
        settings: layer.settings,
        env: layer.env,
        globals: layer.globals,
        parser: layer.parser,
        parser_options: layer.parser_options,
    }
}
