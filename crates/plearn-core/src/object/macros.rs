//! Class declaration macros

/// Declare a concrete class
///
/// ```ignore
/// declare_object! {
///     class Linear: Learner => base,
///     "Linear model",
///     "Computes a weighted sum of its inputs plus a bias."
/// }
/// ```
///
/// `Learner => base` names the parent class and the field embedding it.
/// The type must implement [`Declare`](crate::object::Declare).
#[macro_export]
macro_rules! declare_object {
    (class $ty:ident $(: $parent:ident => $base:ident)?, $descr:expr, $help:expr $(,)?) => {
        $crate::declare_object!(@impl false, $ty $(: $parent => $base)?, $descr, $help);
    };

    (@impl $is_abstract:expr, $ty:ident $(: $parent:ident => $base:ident)?, $descr:expr, $help:expr) => {
        impl $crate::object::Object for $ty {
            fn class_name(&self) -> &'static str {
                <$ty as $crate::object::ObjectClass>::CLASS_NAME
            }

            fn option_list(&self) -> &'static $crate::option::OptionList {
                <$ty as $crate::object::ObjectClass>::class_option_list()
            }

            fn remote_methods(&self) -> &'static $crate::remote::RemoteMethodMap {
                <$ty as $crate::object::ObjectClass>::class_remote_methods()
            }

            $(
                fn base(&self) -> ::std::option::Option<&dyn $crate::object::Object> {
                    ::std::option::Option::Some(&self.$base)
                }

                fn base_mut(&mut self) -> ::std::option::Option<&mut dyn $crate::object::Object> {
                    ::std::option::Option::Some(&mut self.$base)
                }
            )?

            fn build(&mut self) -> $crate::error::PResult<()> {
                if let ::std::option::Option::Some(base) = $crate::object::Object::base_mut(self) {
                    base.build()?;
                }
                <$ty as $crate::object::Declare>::build_(self)
            }

            fn set_parent(&mut self, parent: &$crate::object::WeakObjRef) {
                if let ::std::option::Option::Some(base) = $crate::object::Object::base_mut(self) {
                    base.set_parent(parent);
                }
                <$ty as $crate::object::Declare>::on_parent(self, parent);
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn as_dyn(&self) -> &dyn $crate::object::Object {
                self
            }

            fn as_dyn_mut(&mut self) -> &mut dyn $crate::object::Object {
                self
            }
        }

        impl $crate::object::ObjectClass for $ty {
            const CLASS_NAME: &'static str = stringify!($ty);
            const PARENT_CLASS: &'static str = $crate::declare_object!(@parent_name $($parent)?);
            const ONE_LINE_DESCR: &'static str = $descr;
            const MULTI_LINE_HELP: &'static str = $help;
            const ABSTRACT: bool = $is_abstract;

            fn class_option_list() -> &'static $crate::option::OptionList {
                static LIST: $crate::once_cell::sync::OnceCell<$crate::option::OptionList> =
                    $crate::once_cell::sync::OnceCell::new();
                LIST.get_or_init(|| {
                    $crate::option::OptionList::for_class(
                        stringify!($ty),
                        <$ty as $crate::object::Declare>::declare_options,
                    )
                })
            }

            fn class_remote_methods() -> &'static $crate::remote::RemoteMethodMap {
                static MAP: $crate::once_cell::sync::OnceCell<$crate::remote::RemoteMethodMap> =
                    $crate::once_cell::sync::OnceCell::new();
                MAP.get_or_init(|| {
                    $crate::remote::RemoteMethodMap::for_class(
                        stringify!($ty),
                        ::std::option::Option::Some($crate::declare_object!(@parent_methods $($parent)?)),
                        <$ty as $crate::object::Declare>::declare_methods,
                    )
                })
            }
        }
    };

    (@parent_name) => {
        "Object"
    };
    (@parent_name $parent:ident) => {
        <$parent as $crate::object::ObjectClass>::CLASS_NAME
    };

    (@parent_methods) => {
        $crate::object::root_remote_methods()
    };
    (@parent_methods $parent:ident) => {
        <$parent as $crate::object::ObjectClass>::class_remote_methods()
    };
}

/// Declare an abstract class: registered, documented and inheritable, but
/// never instantiated by the type factory
///
/// Takes the same arguments as [`declare_object!`].
#[macro_export]
macro_rules! declare_abstract_object {
    (class $ty:ident $(: $parent:ident => $base:ident)?, $descr:expr, $help:expr $(,)?) => {
        $crate::declare_object!(@impl true, $ty $(: $parent => $base)?, $descr, $help);
    };
}
