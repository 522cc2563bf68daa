//! Reflectable objects
//!
//! A class is a plain struct implementing [`Declare`] (its options, remote
//! methods and build step) and registered through [`declare_object!`],
//! which generates the [`Object`] and [`ObjectClass`] implementations.
//!
//! Single inheritance is modelled by embedding the parent struct as a
//! field. The generated [`Object::base`] exposes it, so descriptors and
//! remote methods declared by an ancestor reach the ancestor part of any
//! derived instance through [`as_class`] / [`as_class_mut`].
//!
//! Instances are shared through [`ObjRef`]; back-references to a parent
//! use the non-owning [`WeakObjRef`].

mod macros;
mod ops;
mod path;
mod root;

pub use ops::{ObjectExt, OptionTarget};
pub(crate) use ops::read_body;
pub use root::{root_option_list, root_remote_methods};

use crate::error::{PLearnError, PResult};
use crate::factory::TypeMapEntry;
use crate::option::OptionList;
use crate::remote::RemoteMethodMap;
use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

// ============================================================================
// Object traits
// ============================================================================

/// Dynamic interface of every reflectable instance
///
/// Implemented by [`declare_object!`]; hand-written implementations must
/// keep `build` calling the base's `build` first.
pub trait Object: Any {
    /// Registered class name
    fn class_name(&self) -> &'static str;

    /// Option list of the dynamic class, inherited options included
    fn option_list(&self) -> &'static OptionList;

    /// Remote-method map of the dynamic class
    fn remote_methods(&self) -> &'static RemoteMethodMap;

    /// The embedded parent-class part, if any
    fn base(&self) -> Option<&dyn Object> {
        None
    }

    /// The embedded parent-class part, if any
    fn base_mut(&mut self) -> Option<&mut dyn Object> {
        None
    }

    /// Finish construction after options are set
    ///
    /// Must be idempotent.
    fn build(&mut self) -> PResult<()>;

    /// Record the object owning this one
    fn set_parent(&mut self, _parent: &WeakObjRef) {}

    /// Upcast for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Upcast for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Upcast to a trait object
    fn as_dyn(&self) -> &dyn Object;

    /// Upcast to a trait object
    fn as_dyn_mut(&mut self) -> &mut dyn Object;
}

/// Per-class declarations, written by hand for each class
pub trait Declare: Default + 'static {
    /// Append the class's options, then call the parent's `declare_options`
    fn declare_options(_ol: &mut OptionList) {}

    /// Insert the class's remote methods
    fn declare_methods(_rmm: &mut RemoteMethodMap) {}

    /// Class-specific part of `build`, run after the base was built
    fn build_(&mut self) -> PResult<()> {
        Ok(())
    }

    /// Class-specific part of `set_parent`
    fn on_parent(&mut self, _parent: &WeakObjRef) {}
}

/// Static side of a declared class
pub trait ObjectClass: Object + Declare + Sized {
    /// Registered class name
    const CLASS_NAME: &'static str;
    /// Parent class name, `Object` at the root
    const PARENT_CLASS: &'static str;
    /// One-line description
    const ONE_LINE_DESCR: &'static str;
    /// Longer help text
    const MULTI_LINE_HELP: &'static str;
    /// Abstract classes are registered without a constructor
    const ABSTRACT: bool;

    /// The class's option list, built once
    fn class_option_list() -> &'static OptionList;

    /// The class's remote-method map, built once
    fn class_remote_methods() -> &'static RemoteMethodMap;

    /// Registration record for the type factory
    fn type_map_entry() -> TypeMapEntry {
        TypeMapEntry {
            type_name: Self::CLASS_NAME.to_string(),
            parent_class: Self::PARENT_CLASS.to_string(),
            constructor: if Self::ABSTRACT {
                None
            } else {
                Some(construct::<Self>)
            },
            getoptionlist_method: Self::class_option_list,
            get_remote_methods: Self::class_remote_methods,
            isa_method: is_instance::<Self>,
            one_line_descr: Self::ONE_LINE_DESCR,
            multi_line_help: Self::MULTI_LINE_HELP,
        }
    }
}

fn construct<T: ObjectClass>() -> ObjRef {
    ObjRef::new(T::default())
}

fn is_instance<T: Object>(obj: &dyn Object) -> bool {
    as_class::<T>(obj).is_some()
}

/// View `obj`, or one of its bases, as a `T`
pub fn as_class<T: Object>(obj: &dyn Object) -> Option<&T> {
    let mut current = obj;
    loop {
        if let Some(found) = current.as_any().downcast_ref::<T>() {
            return Some(found);
        }
        current = current.base()?;
    }
}

/// View `obj`, or one of its bases, as a mutable `T`
pub fn as_class_mut<T: Object>(obj: &mut dyn Object) -> Option<&mut T> {
    let mut current = obj;
    loop {
        if current.as_any().is::<T>() {
            return current.as_any_mut().downcast_mut::<T>();
        }
        current = current.base_mut()?;
    }
}

// ============================================================================
// Handles
// ============================================================================

/// Shared handle to an object
#[derive(Clone)]
pub struct ObjRef {
    inner: Rc<RefCell<dyn Object>>,
    class_name: &'static str,
}

impl ObjRef {
    /// Wrap a new object
    pub fn new<T: Object>(obj: T) -> Self {
        let class_name = obj.class_name();
        Self {
            inner: Rc::new(RefCell::new(obj)),
            class_name,
        }
    }

    /// Class of the held object, available while it is borrowed
    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    /// Borrow the object
    pub fn borrow(&self) -> PResult<Ref<'_, dyn Object>> {
        self.inner
            .try_borrow()
            .map_err(|_| PLearnError::Borrowed(self.class_name.to_string()))
    }

    /// Borrow the object mutably
    pub fn borrow_mut(&self) -> PResult<RefMut<'_, dyn Object>> {
        self.inner
            .try_borrow_mut()
            .map_err(|_| PLearnError::Borrowed(self.class_name.to_string()))
    }

    /// Run `f` on the object viewed as a `T`
    pub fn with<T: Object, R>(&self, f: impl FnOnce(&T) -> R) -> PResult<R> {
        let guard = self.borrow()?;
        let obj = as_class::<T>(&*guard).ok_or_else(|| self.cast_error::<T>())?;
        Ok(f(obj))
    }

    /// Run `f` on the object viewed as a mutable `T`
    pub fn with_mut<T: Object, R>(&self, f: impl FnOnce(&mut T) -> R) -> PResult<R> {
        let mut guard = self.borrow_mut()?;
        let obj = as_class_mut::<T>(&mut *guard).ok_or_else(|| self.cast_error::<T>())?;
        Ok(f(obj))
    }

    /// True when the held object is a `T` or derives from it
    pub fn is<T: Object>(&self) -> PResult<bool> {
        Ok(as_class::<T>(&*self.borrow()?).is_some())
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjRef) -> bool {
        self.addr() == other.addr()
    }

    /// Address of the held object, used as its identity
    pub fn addr(&self) -> usize {
        self.inner.as_ptr() as *const () as usize
    }

    /// Non-owning reference to the same object
    pub fn downgrade(&self) -> WeakObjRef {
        WeakObjRef {
            inner: Rc::downgrade(&self.inner),
            class_name: self.class_name,
        }
    }

    /// Number of strong handles
    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    fn cast_error<T: Object>(&self) -> PLearnError {
        PLearnError::ClassCast {
            expected: std::any::type_name::<T>()
                .rsplit("::")
                .next()
                .unwrap_or_default()
                .to_string(),
            found: self.class_name.to_string(),
        }
    }
}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjRef({} @ {:#x})", self.class_name, self.addr())
    }
}

/// Non-owning reference to an object, used for parent links
#[derive(Clone)]
pub struct WeakObjRef {
    inner: Weak<RefCell<dyn Object>>,
    class_name: &'static str,
}

impl WeakObjRef {
    /// The object, if it is still alive
    pub fn upgrade(&self) -> Option<ObjRef> {
        self.inner.upgrade().map(|inner| ObjRef {
            inner,
            class_name: self.class_name,
        })
    }

    /// Class of the referenced object
    pub fn class_name(&self) -> &'static str {
        self.class_name
    }
}

impl fmt::Debug for WeakObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakObjRef({})", self.class_name)
    }
}
