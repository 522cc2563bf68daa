//! Remote method invocation
//!
//! Each class owns a [`RemoteMethodMap`] from `(name, arity)` to a
//! [`Trampoline`]: a type-erased callable that reads its arguments from a
//! [`PStream`], invokes a typed Rust function and writes the reply
//! `!R <n> result...`.
//!
//! Class methods are wrapped with [`method0`] ... [`method5`], methods on
//! any object with [`dyn_method0`] ... [`dyn_method5`], and free functions
//! with [`function0`] ... [`function5`].

mod functions;
mod map;
mod trampoline;

pub use functions::{
    call_function, function_help_text, function_names, register_function, unregister_function,
};
pub use map::RemoteMethodMap;
pub use trampoline::{write_reply, RemoteReturn, Serialized};
pub use trampoline::{
    dyn_method0, dyn_method1, dyn_method2, dyn_method3, dyn_method4, dyn_method5, function0,
    function1, function2, function3, function4, function5, method0, method1, method2, method3,
    method4, method5,
};
pub use trampoline::{
    DynMethod0, DynMethod1, DynMethod2, DynMethod3, DynMethod4, DynMethod5, Function0, Function1,
    Function2, Function3, Function4, Function5, Method0, Method1, Method2, Method3, Method4,
    Method5,
};

use crate::error::PResult;
use crate::object::Object;
use crate::stream::PStream;
use std::fmt::Write as _;

/// Documentation of a remote method or function
///
/// Argument and return types come from the wrapped signature; this holds
/// the prose.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteMethodDoc {
    body: String,
    args: Vec<(String, String)>,
    return_doc: String,
}

impl RemoteMethodDoc {
    /// Start a documentation record with its main description
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    /// Document the next argument
    pub fn arg(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.args.push((name.into(), description.into()));
        self
    }

    /// Document the return value
    pub fn returns(mut self, description: impl Into<String>) -> Self {
        self.return_doc = description.into();
        self
    }

    /// Main description
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Documented arguments, in order
    pub fn args(&self) -> &[(String, String)] {
        &self.args
    }

    /// Return value description
    pub fn return_doc(&self) -> &str {
        &self.return_doc
    }
}

/// A remote method bound to a class
pub trait Trampoline: Send + Sync {
    /// Number of arguments read from the stream
    fn arity(&self) -> usize;

    /// Documentation
    fn doc(&self) -> &RemoteMethodDoc;

    /// Type names of the arguments
    fn arg_types(&self) -> Vec<String>;

    /// Type name of the result
    fn return_type(&self) -> String;

    /// Read the arguments, call, write the reply
    fn call(&self, obj: &mut dyn Object, io: &mut PStream) -> PResult<()>;

    /// Help text of this overload
    fn help_text(&self, name: &str) -> String {
        format_help(name, self.doc(), &self.arg_types(), &self.return_type())
    }
}

/// A free remote function
pub trait FunctionTrampoline: Send + Sync {
    /// Number of arguments read from the stream
    fn arity(&self) -> usize;

    /// Documentation
    fn doc(&self) -> &RemoteMethodDoc;

    /// Type names of the arguments
    fn arg_types(&self) -> Vec<String>;

    /// Type name of the result
    fn return_type(&self) -> String;

    /// Read the arguments, call, write the reply
    fn call(&self, io: &mut PStream) -> PResult<()>;

    /// Help text of this overload
    fn help_text(&self, name: &str) -> String {
        format_help(name, self.doc(), &self.arg_types(), &self.return_type())
    }
}

fn format_help(name: &str, doc: &RemoteMethodDoc, arg_types: &[String], return_type: &str) -> String {
    let arg_name = |i: usize| -> String {
        doc.args
            .get(i)
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| format!("arg{}", i))
    };

    let signature = arg_types
        .iter()
        .enumerate()
        .map(|(i, ty)| format!("{}: {}", arg_name(i), ty))
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = format!("{}({}) -> {}\n", name, signature, return_type);
    if !doc.body.is_empty() {
        let _ = writeln!(out, "    {}", doc.body);
    }
    for (i, ty) in arg_types.iter().enumerate() {
        let description = doc.args.get(i).map(|(_, d)| d.as_str()).unwrap_or("");
        let _ = writeln!(out, "    Argument {} ({}): {}", arg_name(i), ty, description);
    }
    if return_type != "void" {
        let _ = writeln!(out, "    Returns ({}): {}", return_type, doc.return_doc);
    }
    out
}
