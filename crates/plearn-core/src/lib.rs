//! PLearn object core
//!
//! This crate provides the reflection layer shared by PLearn objects:
//! - Named, flagged, typed options with runtime read/write by path
//! - A text (and binary) serialization format preserving shared references
//! - A process-wide type factory for construction by class name
//! - Remote method invocation through typed trampolines
//!
//! ```ignore
//! use plearn_core::prelude::*;
//!
//! #[derive(Default)]
//! struct Pair {
//!     first: i32,
//!     second: f64,
//! }
//!
//! impl Declare for Pair {
//!     fn declare_options(ol: &mut OptionList) {
//!         declare_option!(ol, Pair, first, OptionFlags::BUILD, "First element");
//!         declare_option!(ol, Pair, second, OptionFlags::LEARNT, "Second element");
//!     }
//! }
//!
//! declare_object! { class Pair, "A pair of numbers", "" }
//!
//! factory::register_class::<Pair>();
//! let obj = load_object_from_str("Pair(first = 1; second = 2.5)")?;
//! assert_eq!(obj.borrow()?.get_option("second")?, "2.5");
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod factory;
pub mod graph;
pub mod help;
pub mod io;
pub mod object;
pub mod option;
pub mod persist;
pub mod preprocess;
pub mod remote;
pub mod server;
pub mod stream;

#[doc(hidden)]
pub use once_cell;

pub use config::PLearnConfig;
pub use error::{PLearnError, PResult, ResultExt};
pub use factory::{TypeFactory, TypeMapEntry};
pub use graph::{collect_objects, read_object, write_object};
pub use io::{load_object, load_object_from_str, macro_load_object, save_object, write_object_to_string};
pub use object::{Declare, ObjRef, Object, ObjectClass, ObjectExt, OptionTarget, WeakObjRef};
pub use option::{OptionBase, OptionFlags, OptionLevel, OptionList, OptionValue};
pub use persist::Persist;
pub use remote::{RemoteMethodDoc, RemoteMethodMap, RemoteReturn, Serialized};
pub use server::RemoteServer;
pub use stream::{PStream, PointerMode, StreamMode};

/// Everything needed to declare a class
pub mod prelude {
    pub use crate::object::{as_class, as_class_mut, Declare, ObjRef, Object, ObjectClass, ObjectExt, WeakObjRef};
    pub use crate::option::{OptionFlags, OptionLevel, OptionList};
    pub use crate::remote::{RemoteMethodDoc, RemoteMethodMap};
    pub use crate::{declare_abstract_object, declare_object, declare_option};
    pub use crate::{factory, load_object_from_str, PLearnError, PResult};
}
