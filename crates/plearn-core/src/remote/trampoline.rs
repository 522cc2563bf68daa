//! Typed trampolines for arities 0 to 5

use super::{FunctionTrampoline, RemoteMethodDoc, Trampoline};
use crate::error::{PLearnError, PResult, ResultExt};
use crate::object::{as_class_mut, ObjRef, Object, ObjectClass};
use crate::persist::Persist;
use crate::stream::PStream;
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// Results
// ============================================================================

/// A value a remote method can return
pub trait RemoteReturn {
    /// Number of results written after `!R`
    fn result_count() -> usize;

    /// Type name shown in help
    fn return_type() -> String;

    /// Write the results, separated by spaces
    fn write_results(&self, io: &mut PStream) -> PResult<()>;
}

/// Write the reply `!R <n> results...` followed by a newline
pub fn write_reply<R: RemoteReturn>(value: &R, io: &mut PStream) -> PResult<()> {
    io.write_str(&format!("!R {}", R::result_count()));
    if R::result_count() > 0 {
        io.put(b' ');
        value.write_results(io)?;
    }
    io.put(b'\n');
    Ok(())
}

impl RemoteReturn for () {
    fn result_count() -> usize {
        0
    }

    fn return_type() -> String {
        "void".to_string()
    }

    fn write_results(&self, _io: &mut PStream) -> PResult<()> {
        Ok(())
    }
}

macro_rules! impl_remote_return_persist {
    ($($ty:ty),*) => {
        $(
            impl RemoteReturn for $ty {
                fn result_count() -> usize {
                    1
                }

                fn return_type() -> String {
                    <$ty as Persist>::type_name()
                }

                fn write_results(&self, io: &mut PStream) -> PResult<()> {
                    self.write_to(io)
                }
            }
        )*
    };
}

impl_remote_return_persist!(i32, u32, i64, u64, usize, f32, f64, bool, String, ObjRef, Option<ObjRef>);

impl<T: Persist> RemoteReturn for Vec<T> {
    fn result_count() -> usize {
        1
    }

    fn return_type() -> String {
        <Vec<T> as Persist>::type_name()
    }

    fn write_results(&self, io: &mut PStream) -> PResult<()> {
        self.write_to(io)
    }
}

impl<K: Persist + Ord, V: Persist> RemoteReturn for BTreeMap<K, V> {
    fn result_count() -> usize {
        1
    }

    fn return_type() -> String {
        <BTreeMap<K, V> as Persist>::type_name()
    }

    fn write_results(&self, io: &mut PStream) -> PResult<()> {
        self.write_to(io)
    }
}

impl<A: Persist, B: Persist> RemoteReturn for (A, B) {
    fn result_count() -> usize {
        2
    }

    fn return_type() -> String {
        format!("({}, {})", A::type_name(), B::type_name())
    }

    fn write_results(&self, io: &mut PStream) -> PResult<()> {
        self.0.write_to(io)?;
        io.put(b' ');
        self.1.write_to(io)
    }
}

impl<A: Persist, B: Persist, C: Persist> RemoteReturn for (A, B, C) {
    fn result_count() -> usize {
        3
    }

    fn return_type() -> String {
        format!("({}, {}, {})", A::type_name(), B::type_name(), C::type_name())
    }

    fn write_results(&self, io: &mut PStream) -> PResult<()> {
        self.0.write_to(io)?;
        io.put(b' ');
        self.1.write_to(io)?;
        io.put(b' ');
        self.2.write_to(io)
    }
}

/// A result that is already serialized, written verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Serialized(pub String);

impl RemoteReturn for Serialized {
    fn result_count() -> usize {
        1
    }

    fn return_type() -> String {
        "serialized".to_string()
    }

    fn write_results(&self, io: &mut PStream) -> PResult<()> {
        io.write_str(&self.0);
        Ok(())
    }
}

// ============================================================================
// Trampolines
// ============================================================================

fn read_argument<A: Persist>(io: &mut PStream, name: &str) -> PResult<A> {
    A::read_from(io).with_context(|| format!("reading argument {} ({})", name, A::type_name()))
}

fn receiver<C: ObjectClass>(obj: &mut dyn Object) -> PResult<&mut C> {
    let found = obj.class_name();
    as_class_mut::<C>(obj).ok_or_else(|| PLearnError::ClassCast {
        expected: C::CLASS_NAME.to_string(),
        found: found.to_string(),
    })
}

macro_rules! trampolines {
    ($(
        $arity:literal => $Method:ident $method:ident, $DynMethod:ident $dyn_method:ident,
            $Function:ident $function:ident $(, $A:ident $a:ident)*;
    )*) => {
        $(
            #[doc = concat!("Method of class `C` taking ", stringify!($arity), " arguments")]
            pub struct $Method<C, R, $($A,)*> {
                f: fn(&mut C, $($A),*) -> PResult<R>,
                doc: RemoteMethodDoc,
            }

            impl<C, R, $($A,)*> Trampoline for $Method<C, R, $($A,)*>
            where
                C: ObjectClass,
                R: RemoteReturn + 'static,
                $($A: Persist + 'static,)*
            {
                fn arity(&self) -> usize {
                    $arity
                }

                fn doc(&self) -> &RemoteMethodDoc {
                    &self.doc
                }

                fn arg_types(&self) -> Vec<String> {
                    vec![$(<$A as Persist>::type_name()),*]
                }

                fn return_type(&self) -> String {
                    R::return_type()
                }

                fn call(&self, obj: &mut dyn Object, io: &mut PStream) -> PResult<()> {
                    $(let $a = read_argument::<$A>(io, stringify!($a))?;)*
                    let result = (self.f)(receiver::<C>(obj)?, $($a),*)?;
                    write_reply(&result, io)
                }
            }

            #[doc = concat!("Wrap a method of class `C` taking ", stringify!($arity), " arguments")]
            pub fn $method<C, R, $($A,)*>(
                f: fn(&mut C, $($A),*) -> PResult<R>,
                doc: RemoteMethodDoc,
            ) -> Arc<dyn Trampoline>
            where
                C: ObjectClass,
                R: RemoteReturn + 'static,
                $($A: Persist + 'static,)*
            {
                Arc::new($Method { f, doc })
            }

            #[doc = concat!("Method of any object taking ", stringify!($arity), " arguments")]
            pub struct $DynMethod<R, $($A,)*> {
                f: fn(&mut dyn Object, $($A),*) -> PResult<R>,
                doc: RemoteMethodDoc,
            }

            impl<R, $($A,)*> Trampoline for $DynMethod<R, $($A,)*>
            where
                R: RemoteReturn + 'static,
                $($A: Persist + 'static,)*
            {
                fn arity(&self) -> usize {
                    $arity
                }

                fn doc(&self) -> &RemoteMethodDoc {
                    &self.doc
                }

                fn arg_types(&self) -> Vec<String> {
                    vec![$(<$A as Persist>::type_name()),*]
                }

                fn return_type(&self) -> String {
                    R::return_type()
                }

                fn call(&self, obj: &mut dyn Object, io: &mut PStream) -> PResult<()> {
                    $(let $a = read_argument::<$A>(io, stringify!($a))?;)*
                    let result = (self.f)(obj, $($a),*)?;
                    write_reply(&result, io)
                }
            }

            #[doc = concat!("Wrap a method of any object taking ", stringify!($arity), " arguments")]
            pub fn $dyn_method<R, $($A,)*>(
                f: fn(&mut dyn Object, $($A),*) -> PResult<R>,
                doc: RemoteMethodDoc,
            ) -> Arc<dyn Trampoline>
            where
                R: RemoteReturn + 'static,
                $($A: Persist + 'static,)*
            {
                Arc::new($DynMethod { f, doc })
            }

            #[doc = concat!("Free function taking ", stringify!($arity), " arguments")]
            pub struct $Function<R, $($A,)*> {
                f: fn($($A),*) -> PResult<R>,
                doc: RemoteMethodDoc,
            }

            impl<R, $($A,)*> FunctionTrampoline for $Function<R, $($A,)*>
            where
                R: RemoteReturn + 'static,
                $($A: Persist + 'static,)*
            {
                fn arity(&self) -> usize {
                    $arity
                }

                fn doc(&self) -> &RemoteMethodDoc {
                    &self.doc
                }

                fn arg_types(&self) -> Vec<String> {
                    vec![$(<$A as Persist>::type_name()),*]
                }

                fn return_type(&self) -> String {
                    R::return_type()
                }

                fn call(&self, io: &mut PStream) -> PResult<()> {
                    $(let $a = read_argument::<$A>(io, stringify!($a))?;)*
                    let result = (self.f)($($a),*)?;
                    write_reply(&result, io)
                }
            }

            #[doc = concat!("Wrap a free function taking ", stringify!($arity), " arguments")]
            pub fn $function<R, $($A,)*>(
                f: fn($($A),*) -> PResult<R>,
                doc: RemoteMethodDoc,
            ) -> Arc<dyn FunctionTrampoline>
            where
                R: RemoteReturn + 'static,
                $($A: Persist + 'static,)*
            {
                Arc::new($Function { f, doc })
            }
        )*
    };
}

trampolines! {
    0 => Method0 method0, DynMethod0 dyn_method0, Function0 function0;
    1 => Method1 method1, DynMethod1 dyn_method1, Function1 function1, A0 arg0;
    2 => Method2 method2, DynMethod2 dyn_method2, Function2 function2, A0 arg0, A1 arg1;
    3 => Method3 method3, DynMethod3 dyn_method3, Function3 function3, A0 arg0, A1 arg1, A2 arg2;
    4 => Method4 method4, DynMethod4 dyn_method4, Function4 function4, A0 arg0, A1 arg1, A2 arg2, A3 arg3;
    5 => Method5 method5, DynMethod5 dyn_method5, Function5 function5, A0 arg0, A1 arg1, A2 arg2, A3 arg3, A4 arg4;
}
