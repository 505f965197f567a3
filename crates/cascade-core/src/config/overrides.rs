//! Path-scoped override selection and layering

use super::merge::{BaseConfiguration, ConfigLayer, MergedOverride};
use crate::result::Result;
use std::borrow::Cow;

/// A per-path configuration before severity normalization
#[derive(Debug, Clone)]
pub struct CandidateConfiguration<'a> {
    /// Base layer with every matching override applied; borrowed when nothing matched
    pub layer: Cow<'a, ConfigLayer>,
    /// Positions (in the base's merged override list) of the overrides applied
    pub applied: Vec<usize>,
}

impl CandidateConfiguration<'_> {
    /// True when no override touched the base layer
    pub fn is_base(&self) -> bool {
        matches!(self.layer, Cow::Borrowed(_))
    }
}

/// Selects and layers the overrides of one base configuration
#[derive(Debug, Clone, Copy)]
pub struct OverrideEngine<'a> {
    base: &'a BaseConfiguration,
}

impl<'a> OverrideEngine<'a> {
    pub fn new(base: &'a BaseConfiguration) -> Self {
        Self { base }
    }

    /// Positions of the overrides that apply to a normalized path, in order
    ///
    /// Fails with `MalformedGlobPattern` when an override with a broken
    /// pattern could have applied to this path.
    pub fn select(&self, path: &str) -> Result<Vec<usize>> {
        let mut selected = Vec::new();
        for (position, candidate) in self.base.overrides().iter().enumerate() {
            if candidate.applies_to(path)? {
                selected.push(position);
            }
        }
        Ok(selected)
    }

    /// Layer every matching override onto the base, later ones winning
    pub fn apply(&self, path: &str) -> Result<CandidateConfiguration<'a>> {
        let applied = self.select(path)?;
        if applied.is_empty() {
            return Ok(CandidateConfiguration {
                layer: Cow::Borrowed(self.base.layer()),
                applied,
            });
        }

        let options = self.base.merge_options();
        let mut layer = self.base.layer().clone();
        for &position in &applied {
            let block: &MergedOverride = &self.base.overrides()[position];
            tracing::trace!("Applying {} to '{}'", block.label(), path);
            layer.merge_with(block.layer(), options);
        }

        Ok(CandidateConfiguration {
            layer: Cow::Owned(layer),
            applied,
        })
    }
}
