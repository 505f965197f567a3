//! Fragment loading: resolving `extends` chains depth-first
//!
//! Each visited identity sits on an explicit resolution stack while its
//! `extends` list is being walked. Meeting an identity that is already on the
//! stack is a cycle; meeting one that was fully loaded before (diamond
//! inheritance) is fine and served from the load cache.

use super::fragment::{Fragment, FragmentId};
use super::source::FragmentSource;
use crate::error::CascadeError;
use crate::result::Result;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

/// A fully resolved `extends` chain, flattened base-to-derived
///
/// Each `extends` entry expands in place to its own chain, so a base reached
/// through two paths appears twice, exactly as if both chains were inlined.
#[derive(Debug, Clone)]
pub struct LoadedChain {
    pub root: FragmentId,
    pub fragments: Vec<Arc<Fragment>>,
}

impl LoadedChain {
    /// Identities in application order (duplicates kept)
    pub fn ids(&self) -> impl Iterator<Item = &FragmentId> {
        self.fragments.iter().map(|f| f.id())
    }

    /// Distinct identities contributing to this chain
    pub fn distinct_ids(&self) -> BTreeSet<FragmentId> {
        self.ids().cloned().collect()
    }
}

#[derive(Default)]
struct LoadState {
    fragments: HashMap<FragmentId, Arc<Fragment>>,
    /// child -> fragments that extend it
    dependents: HashMap<FragmentId, BTreeSet<FragmentId>>,
}

/// Explicit resolution stack plus its membership set
#[derive(Default)]
struct ResolutionStack {
    order: Vec<FragmentId>,
    members: HashSet<FragmentId>,
}

impl ResolutionStack {
    fn push(&mut self, id: FragmentId) {
        self.members.insert(id.clone());
        self.order.push(id);
    }

    fn pop(&mut self) {
        if let Some(id) = self.order.pop() {
            self.members.remove(&id);
        }
    }

    fn contains(&self, id: &FragmentId) -> bool {
        self.members.contains(id)
    }

    /// The cycle closed by `id`, from its first occurrence on the stack
    fn cycle_through(&self, id: &FragmentId) -> Vec<String> {
        let start = self.order.iter().position(|s| s == id).unwrap_or(0);
        self.order[start..]
            .iter()
            .chain(std::iter::once(id))
            .map(|s| s.to_string())
            .collect()
    }
}

/// Loads fragments from a source, caching them by identity
pub struct FragmentLoader {
    source: Arc<dyn FragmentSource>,
    state: Mutex<LoadState>,
}

impl FragmentLoader {
    pub fn new(source: Arc<dyn FragmentSource>) -> Self {
        Self {
            source,
            state: Mutex::new(LoadState::default()),
        }
    }

    /// Resolve a reference to an identity without loading it
    pub fn locate(&self, reference: &str, parent: Option<&FragmentId>) -> Result<FragmentId> {
        self.source.locate(reference, parent)?.ok_or_else(|| {
            CascadeError::unresolved_reference(reference, parent.map(|p| p.to_string()))
        })
    }

    /// Identities a reload request may denote, most specific first
    ///
    /// A reference that still resolves yields its identity. One that no
    /// longer does (a deleted file) falls back to the source's best guess of
    /// the identity it used to have, then to the reference taken verbatim.
    pub fn candidates(&self, reference: &str) -> Vec<FragmentId> {
        let mut ids = Vec::new();
        let guesses = [
            self.locate(reference, None).ok(),
            self.source.identity_of(reference),
            Some(FragmentId::new(reference)),
        ];
        for id in guesses.into_iter().flatten() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Load a root reference and everything it extends
    pub fn load(&self, reference: &str) -> Result<LoadedChain> {
        let root = self.locate(reference, None)?;
        let mut stack = ResolutionStack::default();
        let mut fragments = Vec::new();

        self.load_into(&root, &mut stack, &mut fragments)?;

        tracing::debug!(
            "Loaded chain for '{}': {} fragment(s)",
            root,
            fragments.len()
        );
        Ok(LoadedChain { root, fragments })
    }

    fn load_into(
        &self,
        id: &FragmentId,
        stack: &mut ResolutionStack,
        out: &mut Vec<Arc<Fragment>>,
    ) -> Result<()> {
        if stack.contains(id) {
            return Err(CascadeError::cyclic_inheritance(stack.cycle_through(id)));
        }

        let fragment = self.fetch(id)?;
        stack.push(id.clone());

        for reference in fragment.extends() {
            let child = self.locate(&reference, Some(id))?;
            self.record_dependent(&child, id);
            self.load_into(&child, stack, out)?;
        }

        stack.pop();
        out.push(fragment);
        Ok(())
    }

    /// Return the cached fragment or read and parse it once
    fn fetch(&self, id: &FragmentId) -> Result<Arc<Fragment>> {
        if let Some(fragment) = self.lock().fragments.get(id) {
            return Ok(Arc::clone(fragment));
        }

        let document = self.source.read(id)?;
        let fragment = Arc::new(Fragment::new(id.clone(), document)?);
        tracing::debug!("Loaded fragment '{}' ({})", id, fragment.fingerprint().short());

        let mut state = self.lock();
        // Edges out of the old content; the walk re-records the current ones
        state.dependents.retain(|_, parents| {
            parents.remove(id);
            !parents.is_empty()
        });
        state.fragments.insert(id.clone(), Arc::clone(&fragment));
        Ok(fragment)
    }

    fn record_dependent(&self, child: &FragmentId, parent: &FragmentId) {
        self.lock()
            .dependents
            .entry(child.clone())
            .or_default()
            .insert(parent.clone());
    }

    /// Drop a fragment and every fragment that transitively extends it
    ///
    /// Returns the dropped identities (sorted). Identities that were never
    /// loaded are ignored.
    pub fn invalidate(&self, id: &FragmentId) -> Vec<FragmentId> {
        let mut state = self.lock();
        let mut pending = vec![id.clone()];
        let mut visited = BTreeSet::new();

        while let Some(current) = pending.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(parents) = state.dependents.get(&current) {
                pending.extend(parents.iter().cloned());
            }
        }

        visited
            .into_iter()
            .filter(|v| state.fragments.remove(v).is_some())
            .collect()
    }

    /// Fragments recorded as extending `id`
    pub fn dependents_of(&self, id: &FragmentId) -> BTreeSet<FragmentId> {
        self.lock().dependents.get(id).cloned().unwrap_or_default()
    }

    /// Whether an identity is currently in the load cache
    pub fn is_cached(&self, id: &FragmentId) -> bool {
        self.lock().fragments.contains_key(id)
    }

    pub fn cached_count(&self) -> usize {
        self.lock().fragments.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
