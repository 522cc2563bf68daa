//! Option list of a class

use super::{OptionBase, OptionValue, Opt};
use crate::object::ObjectClass;
use std::fmt;
use std::sync::Arc;

/// Ordered option descriptors of a class, own options first, then the
/// inherited ones
#[derive(Default, Clone)]
pub struct OptionList {
    options: Vec<Arc<dyn OptionBase>>,
}

impl OptionList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the list of `class_name` by running its declaration routine
    pub fn for_class(class_name: &str, declare: fn(&mut OptionList)) -> Self {
        let mut list = Self::new();
        declare(&mut list);
        log::debug!(
            "option list of {} built with {} options",
            class_name,
            list.len()
        );
        list
    }

    /// Declare an option from its typed descriptor
    pub fn declare<C: ObjectClass, T: OptionValue>(&mut self, option: Opt<C, T>) -> &mut Self {
        self.push(Arc::new(option))
    }

    /// Append a descriptor
    ///
    /// A name already in the list is kept: the first declaration, which
    /// comes from the most-derived class, wins.
    pub fn push(&mut self, option: Arc<dyn OptionBase>) -> &mut Self {
        match self.find(option.name()) {
            Some(existing) => log::debug!(
                "option '{}' of {} is redeclared by {}",
                option.name(),
                option.declared_in(),
                existing.declared_in()
            ),
            None => self.options.push(option),
        }
        self
    }

    /// Look up an option by exact name
    pub fn find(&self, name: &str) -> Option<&Arc<dyn OptionBase>> {
        self.options.iter().find(|o| o.name() == name)
    }

    /// Iterate in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn OptionBase>> {
        self.options.iter()
    }

    /// Option names in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.name()).collect()
    }

    /// Number of options
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// True when the class has no options
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl fmt::Debug for OptionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
