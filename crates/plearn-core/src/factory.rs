//! Type factory: class name → constructor and class metadata
//!
//! The process-wide factory starts with the abstract root class `Object`
//! and is filled by explicit [`register_class`] calls at startup. A
//! registration under an existing name replaces the previous one.
//! Independent [`TypeFactory`] values can be built for isolated use.

use crate::error::{PLearnError, PResult};
use crate::object::{root_option_list, root_remote_methods, ObjRef, Object, ObjectClass};
use crate::option::OptionList;
use crate::remote::RemoteMethodMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;

/// Name of the root class
pub const ROOT_CLASS: &str = "Object";

/// Registration record of a class
#[derive(Clone)]
pub struct TypeMapEntry {
    /// Class name
    pub type_name: String,
    /// Parent class name
    pub parent_class: String,
    /// Builds a default instance; `None` for abstract classes
    pub constructor: Option<fn() -> ObjRef>,
    /// Option list accessor
    pub getoptionlist_method: fn() -> &'static OptionList,
    /// Remote-method map accessor
    pub get_remote_methods: fn() -> &'static RemoteMethodMap,
    /// True when an object is an instance of the class or of a subclass
    pub isa_method: fn(&dyn Object) -> bool,
    /// One-line description
    pub one_line_descr: &'static str,
    /// Longer help text
    pub multi_line_help: &'static str,
}

impl TypeMapEntry {
    /// Entry of the root class `Object`
    pub fn root() -> Self {
        Self {
            type_name: ROOT_CLASS.to_string(),
            parent_class: String::new(),
            constructor: None,
            getoptionlist_method: root_option_list,
            get_remote_methods: root_remote_methods,
            isa_method: |_| true,
            one_line_descr: "Root of the class hierarchy",
            multi_line_help: "Every class derives from Object, which declares no option and \
                              provides the remote methods shared by all objects.",
        }
    }

    /// True when the class has no constructor
    pub fn is_abstract(&self) -> bool {
        self.constructor.is_none()
    }
}

impl fmt::Debug for TypeMapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMapEntry")
            .field("type_name", &self.type_name)
            .field("parent_class", &self.parent_class)
            .field("abstract", &self.is_abstract())
            .field("one_line_descr", &self.one_line_descr)
            .finish()
    }
}

/// Registry of classes by name
#[derive(Debug, Default, Clone)]
pub struct TypeFactory {
    entries: FxHashMap<String, TypeMapEntry>,
}

impl TypeFactory {
    /// Create an empty factory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory holding only the root class
    pub fn with_root() -> Self {
        let mut factory = Self::new();
        factory.register_type(TypeMapEntry::root());
        factory
    }

    /// Register an entry, replacing any entry with the same name
    pub fn register_type(&mut self, entry: TypeMapEntry) {
        let name = entry.type_name.clone();
        if self.entries.insert(name.clone(), entry).is_some() {
            log::debug!("class {} registered again, replacing the previous entry", name);
        } else {
            log::debug!("registered class {}", name);
        }
    }

    /// Register a declared class
    pub fn register_class<T: ObjectClass>(&mut self) {
        self.register_type(T::type_map_entry());
    }

    /// Remove a class; does nothing if it is not registered
    pub fn unregister_type(&mut self, name: &str) {
        if self.entries.remove(name).is_some() {
            log::debug!("unregistered class {}", name);
        }
    }

    /// Registration record of `name`
    pub fn type_map_entry(&self, name: &str) -> PResult<&TypeMapEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| PLearnError::UnknownClass(name.to_string()))
    }

    /// Constructor of `name`; fails for unknown and abstract classes
    pub fn constructor(&self, name: &str) -> PResult<fn() -> ObjRef> {
        self.type_map_entry(name)?
            .constructor
            .ok_or_else(|| PLearnError::AbstractClass(name.to_string()))
    }

    /// Create a default instance of `name`, not yet built
    pub fn new_object(&self, name: &str) -> PResult<ObjRef> {
        Ok(self.constructor(name)?())
    }

    /// True when `name` is registered without a constructor
    pub fn is_abstract(&self, name: &str) -> PResult<bool> {
        Ok(self.type_map_entry(name)?.is_abstract())
    }

    /// True when `name` is registered
    pub fn is_registered(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// True when `obj` is an instance of `name` or of one of its subclasses
    pub fn is_a(&self, obj: &dyn Object, name: &str) -> PResult<bool> {
        Ok((self.type_map_entry(name)?.isa_method)(obj))
    }

    /// Sorted registered class names
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Process-wide factory
// ============================================================================

static FACTORY: Lazy<RwLock<TypeFactory>> = Lazy::new(|| RwLock::new(TypeFactory::with_root()));

/// Register an entry in the process-wide factory
pub fn register_type(entry: TypeMapEntry) {
    FACTORY.write().register_type(entry);
}

/// Register a declared class in the process-wide factory
pub fn register_class<T: ObjectClass>() {
    FACTORY.write().register_class::<T>();
}

/// Remove a class from the process-wide factory
pub fn unregister_type(name: &str) {
    FACTORY.write().unregister_type(name);
}

/// Create a default instance of a registered class, not yet built
pub fn new_object(name: &str) -> PResult<ObjRef> {
    // The lock is released before running the constructor.
    let constructor = FACTORY.read().constructor(name)?;
    Ok(constructor())
}

/// True when `name` is registered without a constructor
pub fn is_abstract(name: &str) -> PResult<bool> {
    FACTORY.read().is_abstract(name)
}

/// Copy of the registration record of `name`
pub fn type_map_entry(name: &str) -> PResult<TypeMapEntry> {
    FACTORY.read().type_map_entry(name).cloned()
}

/// True when `name` is registered
pub fn is_registered(name: &str) -> bool {
    FACTORY.read().is_registered(name)
}

/// True when `obj` is an instance of `name` or of one of its subclasses
pub fn is_a(obj: &dyn Object, name: &str) -> PResult<bool> {
    let isa = FACTORY.read().type_map_entry(name)?.isa_method;
    Ok(isa(obj))
}

/// Sorted registered class names
pub fn type_names() -> Vec<String> {
    FACTORY.read().type_names()
}
