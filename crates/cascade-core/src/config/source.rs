//! Fragment sources: where `extends` references are located and read from
//!
//! A source answers two questions: which identity does a reference denote
//! (relative to the fragment that wrote it), and what document lives at that
//! identity. Discovery of the root configuration file is the caller's job.

use super::fragment::{FragmentDocument, FragmentId};
use crate::error::CascadeError;
use crate::result::Result;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// A supplier of raw fragment documents
pub trait FragmentSource: Send + Sync {
    /// Name used in log output
    fn name(&self) -> &str;

    /// Resolve a reference to an identity, or `None` if this source does not
    /// know it
    fn locate(&self, reference: &str, parent: Option<&FragmentId>) -> Result<Option<FragmentId>>;

    /// Whether `id` was produced by this source's `locate`
    fn owns(&self, id: &FragmentId) -> bool;

    /// Read and parse the document behind an identity
    fn read(&self, id: &FragmentId) -> Result<FragmentDocument>;

    /// The identity a top-level reference would denote even if nothing
    /// exists there now
    fn identity_of(&self, _reference: &str) -> Option<FragmentId> {
        None
    }
}

/// Parse a structured document, choosing the format from the file extension
///
/// `.yaml`/`.yml` are YAML, `.toml` is TOML, anything else is JSON with
/// comments and trailing commas tolerated.
pub(crate) fn parse_structured<T: DeserializeOwned>(path: &Path, content: &str) -> Result<T> {
    let identity = path.display().to_string();
    let ext = path.extension().and_then(|e| e.to_str());

    match ext {
        Some("yaml") | Some("yml") => serde_yaml::from_str(content)
            .map_err(|e| CascadeError::parse_error(&identity, e.to_string())),
        Some("toml") => {
            toml::from_str(content).map_err(|e| CascadeError::parse_error(&identity, e.to_string()))
        }
        _ => parse_jsonc(&identity, content),
    }
}

/// JSON first, then JSON5 for files carrying comments or trailing commas
fn parse_jsonc<T: DeserializeOwned>(identity: &str, content: &str) -> Result<T> {
    match serde_json::from_str(content) {
        Ok(value) => Ok(value),
        Err(json_err) => {
            tracing::debug!("'{}' is not plain JSON: {}", identity, json_err);
            let mut value: serde_json::Value = json5::from_str(content)
                .map_err(|e| CascadeError::parse_error(identity, e.to_string()))?;
            restore_integers(&mut value);
            serde_json::from_value(value).map_err(|e| CascadeError::parse_error(identity, e.to_string()))
        }
    }
}

/// json5 reads every number as a float; turn `2021.0` back into `2021`
fn restore_integers(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Number(number) if number.is_f64() => {
            if let Some(float) = number.as_f64() {
                if float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
                    *number = serde_json::Number::from(float as i64);
                }
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(restore_integers),
        serde_json::Value::Object(map) => map.values_mut().for_each(restore_integers),
        _ => {}
    }
}

/// Parse a fragment document from file content
///
/// `package.json` files carry their configuration under `eslintConfig`.
pub fn parse_document(path: &Path, content: &str) -> Result<FragmentDocument> {
    let is_package_json = path.file_name().and_then(|n| n.to_str()) == Some("package.json");
    if !is_package_json {
        return parse_structured(path, content);
    }

    let identity = path.display().to_string();
    let mut package: serde_json::Value = parse_jsonc(&identity, content)?;
    let config = package
        .get_mut("eslintConfig")
        .map(serde_json::Value::take)
        .ok_or_else(|| CascadeError::parse_error(&identity, "no `eslintConfig` field"))?;

    serde_json::from_value(config).map_err(|e| CascadeError::parse_error(&identity, e.to_string()))
}

/// Named documents held in memory (presets, tests, embedded configs)
///
/// Documents can be replaced at any time; pair a replacement with
/// `ConfigEngine::reload` to make it visible.
pub struct MemorySource {
    name: String,
    documents: RwLock<HashMap<String, FragmentDocument>>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace a document
    pub fn insert(&self, name: impl Into<String>, document: FragmentDocument) {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), document);
    }

    /// Builder-style insert
    pub fn with(self, name: impl Into<String>, document: FragmentDocument) -> Self {
        self.insert(name, document);
        self
    }

    pub fn remove(&self, name: &str) -> Option<FragmentDocument> {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FragmentSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn locate(&self, reference: &str, _parent: Option<&FragmentId>) -> Result<Option<FragmentId>> {
        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        Ok(documents
            .contains_key(reference)
            .then(|| FragmentId::new(reference)))
    }

    fn owns(&self, id: &FragmentId) -> bool {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id.as_str())
    }

    fn read(&self, id: &FragmentId) -> Result<FragmentDocument> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| CascadeError::unresolved_reference(id.as_str(), None::<String>))
    }
}

/// Fragments stored as files
///
/// Path references (`./base.json`, `../shared/.eslintrc.yaml`, absolute
/// paths) are resolved against the directory of the referencing fragment,
/// or against the source's base directory for top-level references.
/// Identities are canonical absolute paths.
pub struct FileSource {
    base_dir: PathBuf,
}

impl FileSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn is_path_reference(reference: &str) -> bool {
        reference.starts_with("./")
            || reference.starts_with("../")
            || reference.starts_with(".\\")
            || reference.starts_with("..\\")
            || Path::new(reference).is_absolute()
    }

    fn anchor_dir(&self, parent: Option<&FragmentId>) -> PathBuf {
        parent
            .filter(|id| self.owns(id))
            .and_then(|id| Path::new(id.as_str()).parent().map(Path::to_path_buf))
            .unwrap_or_else(|| self.base_dir.clone())
    }
}

impl FragmentSource for FileSource {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn locate(&self, reference: &str, parent: Option<&FragmentId>) -> Result<Option<FragmentId>> {
        let top_level = parent.is_none();
        if !top_level && !Self::is_path_reference(reference) {
            return Ok(None);
        }

        let candidate = self.anchor_dir(parent).join(reference);
        if !candidate.is_file() {
            return Ok(None);
        }

        let canonical = candidate
            .canonicalize()
            .map_err(|e| CascadeError::io_error(&candidate, e))?;
        Ok(Some(FragmentId::new(canonical.to_string_lossy())))
    }

    fn owns(&self, id: &FragmentId) -> bool {
        Path::new(id.as_str()).is_absolute()
    }

    fn identity_of(&self, reference: &str) -> Option<FragmentId> {
        let candidate = self.base_dir.join(reference);
        let canonical = match candidate.canonicalize() {
            Ok(path) => path,
            // Gone: canonicalize the directory it lived in
            Err(_) => candidate
                .parent()?
                .canonicalize()
                .ok()?
                .join(candidate.file_name()?),
        };
        Some(FragmentId::new(canonical.to_string_lossy()))
    }

    fn read(&self, id: &FragmentId) -> Result<FragmentDocument> {
        let path = Path::new(id.as_str());
        let content = fs::read_to_string(path).map_err(|e| CascadeError::io_error(path, e))?;
        tracing::debug!("Read fragment file: {}", path.display());
        parse_document(path, &content)
    }
}

/// Sources consulted in order; the first that locates a reference wins
#[derive(Clone, Default)]
pub struct SourceChain {
    sources: Vec<Arc<dyn FragmentSource>>,
}

impl SourceChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: Arc<dyn FragmentSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn push(&mut self, source: Arc<dyn FragmentSource>) {
        self.sources.push(source);
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl FragmentSource for SourceChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn locate(&self, reference: &str, parent: Option<&FragmentId>) -> Result<Option<FragmentId>> {
        for source in &self.sources {
            if let Some(id) = source.locate(reference, parent)? {
                tracing::trace!("'{}' located by source '{}'", reference, source.name());
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    fn owns(&self, id: &FragmentId) -> bool {
        self.sources.iter().any(|s| s.owns(id))
    }

    fn read(&self, id: &FragmentId) -> Result<FragmentDocument> {
        self.sources
            .iter()
            .find(|s| s.owns(id))
            .ok_or_else(|| CascadeError::unresolved_reference(id.as_str(), None::<String>))?
            .read(id)
    }

    fn identity_of(&self, reference: &str) -> Option<FragmentId> {
        self.sources.iter().find_map(|s| s.identity_of(reference))
    }
}
