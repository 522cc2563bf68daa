//! Error type shared by every layer of the object core
//!
//! All failures are hard errors: they abort the current load, save or call
//! and propagate to the caller. Higher layers add context with
//! [`PLearnError::context`] instead of recovering.

use thiserror::Error;

/// Result type used throughout the crate
pub type PResult<T> = Result<T, PLearnError>;

/// Errors raised by the object core
#[derive(Debug, Error)]
pub enum PLearnError {
    /// No class registered under this name
    #[error("Unknown class '{0}'")]
    UnknownClass(String),

    /// The class is registered without a constructor
    #[error("Cannot instantiate abstract class '{0}'")]
    AbstractClass(String),

    /// The option name does not resolve in the class
    #[error("No option named '{option}' in class {class}")]
    UnknownOption {
        /// Class that was searched
        class: String,
        /// Requested option name
        option: String,
    },

    /// No remote method with this name exists
    #[error("No method named '{name}' taking {arity} arguments in class {class}")]
    UnknownMethod {
        /// Class that was searched
        class: String,
        /// Method name
        name: String,
        /// Requested arity
        arity: usize,
    },

    /// The method exists, but not with the requested arity
    #[error(
        "Method '{name}' of class {class} takes {available:?} arguments, but was called with {arity}"
    )]
    ArityMismatch {
        /// Class that was searched
        class: String,
        /// Method name
        name: String,
        /// Requested arity
        arity: usize,
        /// Arities registered under that name
        available: Vec<usize>,
    },

    /// A backreference names an id never defined in the stream
    #[error("Reference *{0} was never defined in this stream")]
    DanglingReference(u32),

    /// A backreference names an id only declared as a dummy forward reference
    #[error("Reference *{0} is a dummy forward reference (written as '*{0};') and cannot be dereferenced")]
    DummyReference(u32),

    /// The stream holds a different class than the one being read
    #[error("Expected an object of class {expected}, but the stream contains {found}")]
    ClassMismatch {
        /// Class of the receiving instance
        expected: String,
        /// Class name found in the stream
        found: String,
    },

    /// Malformed stream content
    #[error("Syntax error at byte {pos}: {message}")]
    Syntax {
        /// Byte offset in the input
        pos: usize,
        /// What went wrong
        message: String,
    },

    /// Malformed option path (brackets and dots)
    #[error("Malformed option name '{name}': {reason}")]
    OptionName {
        /// The offending path
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Indexed access on an option whose type has no indexing
    #[error("Option '{0}' does not support indexed reads or writes")]
    NotIndexable(String),

    /// Object access on an option that does not hold objects
    #[error("Option '{0}' does not hold an object")]
    NotAnObject(String),

    /// The option holds an object slot, but it is empty
    #[error("Option '{0}' holds a null object")]
    NullObject(String),

    /// Index out of range or unparsable for the option's container
    #[error("Invalid index '{index}' for option '{option}'")]
    BadIndex {
        /// Option name
        option: String,
        /// The index string
        index: String,
    },

    /// A descriptor or trampoline was applied to an instance of another class
    #[error("Object of class {found} is not an instance of {expected}")]
    ClassCast {
        /// Class the descriptor belongs to
        expected: String,
        /// Dynamic class of the object
        found: String,
    },

    /// Option flags carry bits that no known flag accounts for
    #[error("Unrecognized option flag bits {0:#x}")]
    UnknownFlags(u32),

    /// An object could not be borrowed because it is already in use
    #[error("Object of class {0} is already borrowed")]
    Borrowed(String),

    /// A cyclic graph was written in inline pointer mode
    #[error("Cannot write a cyclic object graph inline (cycle through class {0})")]
    Cycle(String),

    /// A cross-file reference leads back to a file that is still being loaded
    #[error("Cross-file reference cycle: {0} is already being loaded")]
    FileCycle(String),

    /// Failure reported by class code (build, remote methods)
    #[error("{0}")]
    Runtime(String),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration file
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// An error with context prepended by an enclosing operation
    #[error("{context}: {source}")]
    Context {
        /// Description of the enclosing operation
        context: String,
        /// The underlying error
        #[source]
        source: Box<PLearnError>,
    },
}

impl PLearnError {
    /// Build a [`PLearnError::Runtime`] error
    pub fn runtime(message: impl Into<String>) -> Self {
        PLearnError::Runtime(message.into())
    }

    /// Build a [`PLearnError::Syntax`] error
    pub fn syntax(pos: usize, message: impl Into<String>) -> Self {
        PLearnError::Syntax {
            pos,
            message: message.into(),
        }
    }

    /// Wrap this error with a description of the enclosing operation
    pub fn context(self, context: impl Into<String>) -> Self {
        PLearnError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with every context layer removed
    pub fn root_cause(&self) -> &PLearnError {
        let mut err = self;
        while let PLearnError::Context { source, .. } = err {
            err = source;
        }
        err
    }
}

/// Attach context to a failing result
pub trait ResultExt<T> {
    /// Wrap the error, computing the context lazily
    fn with_context<F, S>(self, f: F) -> PResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for PResult<T> {
    fn with_context<F, S>(self, f: F) -> PResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}
