//! Option descriptors
//!
//! An option is a named, flagged, typed field of a reflectable class. Each
//! class owns an [`OptionList`] of type-erased [`OptionBase`] descriptors;
//! the concrete descriptor [`Opt`] holds a pair of field accessors and is
//! the only place that knows the field's Rust type.
//!
//! Options are declared inside [`Declare::declare_options`](crate::object::Declare::declare_options):
//!
//! ```ignore
//! fn declare_options(ol: &mut OptionList) {
//!     declare_option!(ol, Pair, first, OptionFlags::BUILD, "First element");
//!     declare_option!(ol, Pair, second, OptionFlags::LEARNT | OptionFlags::NOSAVE,
//!         "Second element", level = OptionLevel::Advanced);
//! }
//! ```

mod descriptor;
mod flags;
mod list;
mod value;

pub use descriptor::{OptionBase, Opt};
pub use flags::{OptionFlags, OptionLevel};
pub use list::OptionList;
pub use value::OptionValue;

/// Declare one option of a class
///
/// `declare_option!(list, Class, field, flags, "description")`, optionally
/// followed by builder calls such as `level = OptionLevel::Expert` or
/// `default_value = "0"`.
#[macro_export]
macro_rules! declare_option {
    ($ol:expr, $class:ty, $field:ident, $flags:expr, $descr:expr $(, $setter:ident = $value:expr)* $(,)?) => {
        $ol.declare(
            $crate::option::Opt::<$class, _>::new(
                stringify!($field),
                |o: &$class| &o.$field,
                |o: &mut $class| &mut o.$field,
                $flags,
                $descr,
            )
            $(.$setter($value))*,
        )
    };
}
