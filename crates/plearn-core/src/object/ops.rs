//! Generic protocol available on every object

use super::path::{is_compound, split_path, PathHop};
use super::{ObjRef, Object};
use crate::error::{PLearnError, PResult, ResultExt};
use crate::factory;
use crate::option::{OptionBase, OptionFlags};
use crate::stream::{PStream, StreamMode};
use std::path::Path;
use std::sync::Arc;

/// Where an option path leads
#[derive(Debug, Clone)]
pub struct OptionTarget {
    /// Object owning the option; `None` for the object the path was
    /// resolved on
    pub owner: Option<ObjRef>,
    /// Descriptor of the final option
    pub option: Arc<dyn OptionBase>,
    /// Index applied to the option, for `name[index]` paths
    pub index: Option<String>,
}

/// Operations shared by all objects, built on [`Object`] and the option
/// descriptors
pub trait ObjectExt: Object {
    /// Parse `value` into the option at path `name`
    fn set_option(&mut self, name: &str, value: &str) -> PResult<()> {
        let mut io = PStream::from_text(value).with_mode(StreamMode::PlearnAscii);
        self.read_option_val(&mut io, name)
    }

    /// Text of the option at path `name`
    fn get_option(&self, name: &str) -> PResult<String> {
        let mut io = PStream::new().with_mode(StreamMode::PlearnAscii);
        self.write_option_val(&mut io, name)?;
        io.output_string()
    }

    /// Read one value from `io` into the option at path `name`
    fn read_option_val(&mut self, io: &mut PStream, name: &str) -> PResult<()> {
        let obj = self.as_dyn_mut();
        let class = obj.class_name();
        read_path(obj, io, name)
            .with_context(|| format!("reading option '{}' of class {}", name, class))
    }

    /// Write the value of the option at path `name` to `io`
    fn write_option_val(&self, io: &mut PStream, name: &str) -> PResult<()> {
        let obj = self.as_dyn();
        write_path(obj, io, name)
            .with_context(|| format!("writing option '{}' of class {}", name, obj.class_name()))
    }

    /// Resolve an option path without reading or writing
    fn parse_option_name(&self, name: &str) -> PResult<OptionTarget> {
        let obj = self.as_dyn();
        let list = obj.option_list();
        if let Some(option) = list.find(name) {
            return Ok(OptionTarget {
                owner: None,
                option: option.clone(),
                index: None,
            });
        }
        let nested = |child: ObjRef, rest: &str| -> PResult<OptionTarget> {
            let target = child.borrow()?.parse_option_name(rest)?;
            Ok(OptionTarget {
                owner: target.owner.or(Some(child)),
                ..target
            })
        };
        match split_path(name)? {
            PathHop::Plain(plain) => Err(unknown_option(obj, plain)),
            PathHop::Indexed { base, index, rest } => {
                let option = lookup(obj, base)?;
                match rest {
                    None => Ok(OptionTarget {
                        owner: None,
                        option: option.clone(),
                        index: Some(index.to_string()),
                    }),
                    Some(rest) => nested(option.get_indexed_object(obj, index)?, rest),
                }
            }
            PathHop::Member { base, rest } => nested(lookup(obj, base)?.get_as_object(obj)?, rest),
        }
    }

    /// Names of the options written by `newwrite`
    fn options_to_save(&self) -> Vec<&'static str> {
        self.option_list()
            .iter()
            .filter(|o| !o.flags().contains(OptionFlags::NOSAVE))
            .map(|o| option_name(o))
            .collect()
    }

    /// Names of the options transmitted over remote calls
    fn options_to_remote_transmit(&self) -> Vec<&'static str> {
        self.option_list()
            .iter()
            .filter(|o| {
                let flags = o.flags();
                !flags.contains(OptionFlags::NOSAVE) || flags.contains(OptionFlags::REMOTE_TRANSMIT)
            })
            .map(|o| option_name(o))
            .collect()
    }

    /// Write `ClassName(opt1 = v1; opt2 = v2)`
    fn newwrite(&self, io: &mut PStream) -> PResult<()> {
        let obj = self.as_dyn();
        let names = if io.is_remote_transmit() {
            obj.options_to_remote_transmit()
        } else {
            obj.options_to_save()
        };
        io.write_str(obj.class_name());
        io.put(b'(');
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                io.write_str("; ");
            }
            io.write_str(name);
            io.write_str(" = ");
            obj.write_option_val(io, name)?;
        }
        io.put(b')');
        Ok(())
    }

    /// Read `ClassName(...)` into this instance
    ///
    /// The class name in the stream must be this object's class.
    fn newread(&mut self, io: &mut PStream) -> PResult<()> {
        let obj = self.as_dyn_mut();
        let found = io.read_word()?;
        if found != obj.class_name() {
            return Err(PLearnError::ClassMismatch {
                expected: obj.class_name().to_string(),
                found,
            });
        }
        read_body(obj, io)
    }

    /// Remote method call: read `nargs` arguments, invoke, write the reply
    fn call(&mut self, name: &str, nargs: usize, io: &mut PStream) -> PResult<()> {
        let obj = self.as_dyn_mut();
        let class = obj.class_name();
        let methods = obj.remote_methods();
        match methods.lookup(name, nargs, true) {
            Some(trampoline) => {
                log::trace!("calling {}::{}/{}", class, name, nargs);
                let trampoline = trampoline.clone();
                trampoline
                    .call(obj, io)
                    .with_context(|| format!("calling method '{}' of class {}", name, class))
            }
            None => {
                let available = methods.arities(name);
                if available.is_empty() {
                    Err(PLearnError::UnknownMethod {
                        class: class.to_string(),
                        name: name.to_string(),
                        arity: nargs,
                    })
                } else {
                    Err(PLearnError::ArityMismatch {
                        class: class.to_string(),
                        name: name.to_string(),
                        arity: nargs,
                        available,
                    })
                }
            }
        }
    }

    /// Set several options, in order
    fn change_options<I, K, V>(&mut self, pairs: I) -> PResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in pairs {
            self.set_option(name.as_ref(), value.as_ref())?;
        }
        Ok(())
    }

    /// The object in the text format
    fn as_string(&self) -> PResult<String> {
        let mut io = PStream::new().with_mode(StreamMode::PlearnAscii);
        self.newwrite(&mut io)?;
        io.output_string()
    }

    /// Write the object to a file
    fn save(&self, path: impl AsRef<Path>, mode: StreamMode) -> PResult<()> {
        let path = path.as_ref();
        let mut io = PStream::new().with_mode(mode);
        self.newwrite(&mut io)?;
        io.put(b'\n');
        std::fs::write(path, io.output())
            .map_err(|e| PLearnError::from(e).context(format!("saving {}", path.display())))?;
        log::debug!("saved {} to {}", self.class_name(), path.display());
        Ok(())
    }
}

impl<T: Object + ?Sized> ObjectExt for T {}

// ============================================================================
// Path resolution
// ============================================================================

/// Option names live as long as their `'static` option list
fn option_name(option: &'static Arc<dyn OptionBase>) -> &'static str {
    option.name()
}

fn unknown_option(obj: &dyn Object, name: &str) -> PLearnError {
    PLearnError::UnknownOption {
        class: obj.class_name().to_string(),
        option: name.to_string(),
    }
}

fn lookup(obj: &dyn Object, name: &str) -> PResult<&'static Arc<dyn OptionBase>> {
    obj.option_list()
        .find(name)
        .ok_or_else(|| unknown_option(obj, name))
}

fn read_path(obj: &mut dyn Object, io: &mut PStream, name: &str) -> PResult<()> {
    if let Some(option) = obj.option_list().find(name) {
        return option.read(obj, io);
    }
    match split_path(name)? {
        PathHop::Plain(plain) => Err(unknown_option(obj, plain)),
        PathHop::Indexed { base, index, rest } => {
            let option = lookup(obj, base)?;
            match rest {
                None => option.read_into_index(obj, io, index),
                Some(rest) => {
                    let child = option.get_indexed_object(obj, index)?;
                    let mut child = child.borrow_mut()?;
                    child.read_option_val(io, rest)
                }
            }
        }
        PathHop::Member { base, rest } => {
            let child = lookup(obj, base)?.get_as_object(obj)?;
            let mut child = child.borrow_mut()?;
            child.read_option_val(io, rest)
        }
    }
}

fn write_path(obj: &dyn Object, io: &mut PStream, name: &str) -> PResult<()> {
    if let Some(option) = obj.option_list().find(name) {
        return option.write(obj, io);
    }
    match split_path(name)? {
        PathHop::Plain(plain) => Err(unknown_option(obj, plain)),
        PathHop::Indexed { base, index, rest } => {
            let option = lookup(obj, base)?;
            match rest {
                None => option.write_at_index(obj, io, index),
                Some(rest) => {
                    let child = option.get_indexed_object(obj, index)?;
                    let child = child.borrow()?;
                    child.write_option_val(io, rest)
                }
            }
        }
        PathHop::Member { base, rest } => {
            let child = lookup(obj, base)?.get_as_object(obj)?;
            let child = child.borrow()?;
            child.write_option_val(io, rest)
        }
    }
}

// ============================================================================
// Reading a definition body
// ============================================================================

/// Read `( name = value; ... )` into `obj`
pub(crate) fn read_body(obj: &mut dyn Object, io: &mut PStream) -> PResult<()> {
    io.expect(b'(')?;
    loop {
        io.skip_separators();
        match io.peek() {
            Some(b')') => {
                io.get()?;
                return Ok(());
            }
            None => {
                return Err(io.error(format!(
                    "Unterminated definition of {}",
                    obj.class_name()
                )))
            }
            Some(_) => {}
        }
        let name = io.read_option_name()?;
        io.expect(b'=')?;
        match obj.option_list().find(&name) {
            Some(option) if option.should_be_skipped() => {
                read_discarded(obj.class_name(), option, io)
                    .with_context(|| format!("reading option '{}' of class {}", name, obj.class_name()))?;
            }
            Some(_) => obj.read_option_val(io, &name)?,
            None if is_compound(&name) => obj.read_option_val(io, &name)?,
            None => {
                if io.warn_unknown_options() {
                    log::warn!(
                        "skipping unknown option '{}' while reading {}",
                        name,
                        obj.class_name()
                    );
                }
                crate::graph::skip_unknown_value(io)?;
            }
        }
    }
}

/// Read a legacy option's value into a throw-away instance of the class
fn read_discarded(class: &str, option: &Arc<dyn OptionBase>, io: &mut PStream) -> PResult<()> {
    log::debug!("reading legacy option '{}' of {} into a discarded instance", option.name(), class);
    let scratch = factory::new_object(class)?;
    let mut scratch = scratch.borrow_mut()?;
    option.read(&mut *scratch, io)
}
