//! Per-class remote-method tables

use super::Trampoline;
use crate::error::{PLearnError, PResult};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Remote methods of one class, linked to its parent's table
///
/// Lookups search the most-derived table first, so a class shadows an
/// inherited overload by declaring the same `(name, arity)`.
pub struct RemoteMethodMap {
    class_name: &'static str,
    methods: BTreeMap<(String, usize), Arc<dyn Trampoline>>,
    parent: Option<&'static RemoteMethodMap>,
}

impl RemoteMethodMap {
    /// Create an empty table
    pub fn new(class_name: &'static str, parent: Option<&'static RemoteMethodMap>) -> Self {
        Self {
            class_name,
            methods: BTreeMap::new(),
            parent,
        }
    }

    /// Build the table of `class_name` by running its declaration routine
    pub fn for_class(
        class_name: &'static str,
        parent: Option<&'static RemoteMethodMap>,
        declare: fn(&mut RemoteMethodMap),
    ) -> Self {
        let mut map = Self::new(class_name, parent);
        declare(&mut map);
        log::debug!(
            "remote-method map of {} built with {} methods",
            class_name,
            map.methods.len()
        );
        map
    }

    /// Class owning the table
    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    /// Table of the parent class
    pub fn parent(&self) -> Option<&'static RemoteMethodMap> {
        self.parent
    }

    /// Add a method under `name`, keyed by the trampoline's arity
    ///
    /// Returns `false`, leaving the table unchanged, when this table already
    /// has an entry with the same name and arity.
    pub fn insert(&mut self, name: &str, trampoline: Arc<dyn Trampoline>) -> bool {
        let key = (name.to_string(), trampoline.arity());
        if self.methods.contains_key(&key) {
            log::debug!(
                "remote method {}/{} already declared in {}",
                key.0,
                key.1,
                self.class_name
            );
            return false;
        }
        self.methods.insert(key, trampoline);
        true
    }

    /// Find `(name, arity)`, in this table then, if `search_inherited`, in
    /// the ancestors' tables
    pub fn lookup(&self, name: &str, arity: usize, search_inherited: bool) -> Option<&Arc<dyn Trampoline>> {
        let key = (name.to_string(), arity);
        match self.methods.get(&key) {
            Some(found) => Some(found),
            None if search_inherited => self.parent.and_then(|p| p.lookup(name, arity, true)),
            None => None,
        }
    }

    /// Tables from this class up to the root
    fn chain(&self) -> impl Iterator<Item = &RemoteMethodMap> {
        std::iter::successors(Some(self), |map| map.parent)
    }

    /// Sorted arities registered under `name`, inherited ones included
    pub fn arities(&self, name: &str) -> Vec<usize> {
        let mut arities: Vec<usize> = self
            .chain()
            .flat_map(|map| map.methods.keys())
            .filter(|(n, _)| n == name)
            .map(|(_, arity)| *arity)
            .collect();
        arities.sort_unstable();
        arities.dedup();
        arities
    }

    /// Sorted method names, inherited ones included
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .chain()
            .flat_map(|map| map.methods.keys())
            .map(|(n, _)| n.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Entries declared by this class, without the inherited ones
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize, &Arc<dyn Trampoline>)> {
        self.methods
            .iter()
            .map(|((name, arity), t)| (name.as_str(), *arity, t))
    }

    /// Number of entries declared by this class
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// True when this class declares no method of its own
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Help text of a method
    ///
    /// With an arity, the exact overload must exist. Without one, every
    /// visible overload is described, most-derived first; a name with no
    /// overload at all yields a placeholder text.
    pub fn method_help_text(&self, name: &str, arity: Option<usize>) -> PResult<String> {
        if let Some(arity) = arity {
            return self
                .lookup(name, arity, true)
                .map(|t| t.help_text(name))
                .ok_or_else(|| PLearnError::UnknownMethod {
                    class: self.class_name.to_string(),
                    name: name.to_string(),
                    arity,
                });
        }

        let mut seen = Vec::new();
        let mut sections = Vec::new();
        for map in self.chain() {
            for ((n, arity), trampoline) in &map.methods {
                if n == name && !seen.contains(arity) {
                    seen.push(*arity);
                    sections.push(trampoline.help_text(name));
                }
            }
        }
        if sections.is_empty() {
            return Ok(format!(
                "** No remote method named '{}' in class {} **\n",
                name, self.class_name
            ));
        }
        Ok(sections.join("\n"))
    }
}

impl fmt::Debug for RemoteMethodMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteMethodMap")
            .field("class", &self.class_name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("parent", &self.parent.map(|p| p.class_name))
            .finish()
    }
}
