//! The type-erased option descriptor and its generic implementation

use super::{OptionFlags, OptionLevel, OptionValue};
use crate::error::{PLearnError, PResult};
use crate::object::{as_class, as_class_mut, ObjRef, Object, ObjectClass};
use crate::stream::PStream;
use std::fmt;

/// Descriptor of one option, independent of the field's type
///
/// Everything above this layer (get/set by name, serialization, remote
/// argument binding) goes through this interface only.
pub trait OptionBase: Send + Sync {
    /// Option name
    fn name(&self) -> &str;

    /// Flags
    fn flags(&self) -> OptionFlags;

    /// Help level
    fn level(&self) -> OptionLevel;

    /// Type name of the field, e.g. `TVec<double>`
    fn option_type(&self) -> &str;

    /// Default value as documented, possibly empty
    fn default_value(&self) -> &str;

    /// Description
    fn description(&self) -> &str;

    /// Class whose declaration introduced the option
    fn declared_in(&self) -> &'static str;

    /// Parse one value from the stream into the field
    fn read(&self, obj: &mut dyn Object, io: &mut PStream) -> PResult<()>;

    /// Write the field value
    fn write(&self, obj: &dyn Object, io: &mut PStream) -> PResult<()>;

    /// Parse one value into the element addressed by `index`
    fn read_into_index(&self, _obj: &mut dyn Object, _io: &mut PStream, _index: &str) -> PResult<()> {
        Err(PLearnError::NotIndexable(self.name().to_string()))
    }

    /// Write the element addressed by `index`
    fn write_at_index(&self, _obj: &dyn Object, _io: &mut PStream, _index: &str) -> PResult<()> {
        Err(PLearnError::NotIndexable(self.name().to_string()))
    }

    /// The object held by the option
    fn get_as_object(&self, _obj: &dyn Object) -> PResult<ObjRef> {
        Err(PLearnError::NotAnObject(self.name().to_string()))
    }

    /// The object held at `index` of the option
    fn get_indexed_object(&self, _obj: &dyn Object, _index: &str) -> PResult<ObjRef> {
        Err(PLearnError::NotAnObject(self.name().to_string()))
    }

    /// Objects directly held by the option
    fn children(&self, _obj: &dyn Object) -> PResult<Vec<ObjRef>> {
        Ok(Vec::new())
    }

    /// True when none of BUILD, LEARNT, TUNING is set
    fn should_be_skipped(&self) -> bool {
        self.flags().should_be_skipped()
    }

    /// Flag names; fails on unrecognized bits
    fn flag_strings(&self) -> PResult<Vec<&'static str>> {
        self.flags().flag_strings()
    }
}

impl fmt::Debug for dyn OptionBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Option")
            .field("name", &self.name())
            .field("type", &self.option_type())
            .field("flags", &self.flags())
            .field("declared_in", &self.declared_in())
            .finish()
    }
}

/// Descriptor of option `name` of class `C`, holding a field of type `T`
pub struct Opt<C, T> {
    name: &'static str,
    get: fn(&C) -> &T,
    get_mut: fn(&mut C) -> &mut T,
    flags: OptionFlags,
    level: OptionLevel,
    option_type: String,
    default_value: String,
    description: String,
}

impl<C: ObjectClass, T: OptionValue> Opt<C, T> {
    /// Create a descriptor from its field accessors
    pub fn new(
        name: &'static str,
        get: fn(&C) -> &T,
        get_mut: fn(&mut C) -> &mut T,
        flags: OptionFlags,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name,
            get,
            get_mut,
            flags,
            level: OptionLevel::default(),
            option_type: T::type_name(),
            default_value: String::new(),
            description: description.into(),
        }
    }

    /// Set the help level
    pub fn level(mut self, level: OptionLevel) -> Self {
        self.level = level;
        self
    }

    /// Set the documented default value
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = value.into();
        self
    }

    /// Override the documented type name
    pub fn option_type(mut self, option_type: impl Into<String>) -> Self {
        self.option_type = option_type.into();
        self
    }

    fn field<'a>(&self, obj: &'a dyn Object) -> PResult<&'a T> {
        let owner = as_class::<C>(obj).ok_or_else(|| PLearnError::ClassCast {
            expected: C::CLASS_NAME.to_string(),
            found: obj.class_name().to_string(),
        })?;
        Ok((self.get)(owner))
    }

    fn field_mut<'a>(&self, obj: &'a mut dyn Object) -> PResult<&'a mut T> {
        let found = obj.class_name();
        let owner = as_class_mut::<C>(obj).ok_or_else(|| PLearnError::ClassCast {
            expected: C::CLASS_NAME.to_string(),
            found: found.to_string(),
        })?;
        Ok((self.get_mut)(owner))
    }
}

impl<C: ObjectClass, T: OptionValue> OptionBase for Opt<C, T> {
    fn name(&self) -> &str {
        self.name
    }

    fn flags(&self) -> OptionFlags {
        self.flags
    }

    fn level(&self) -> OptionLevel {
        self.level
    }

    fn option_type(&self) -> &str {
        &self.option_type
    }

    fn default_value(&self) -> &str {
        &self.default_value
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn declared_in(&self) -> &'static str {
        C::CLASS_NAME
    }

    fn read(&self, obj: &mut dyn Object, io: &mut PStream) -> PResult<()> {
        self.field_mut(obj)?.read_into(io)
    }

    fn write(&self, obj: &dyn Object, io: &mut PStream) -> PResult<()> {
        self.field(obj)?.write_to(io)
    }

    fn read_into_index(&self, obj: &mut dyn Object, io: &mut PStream, index: &str) -> PResult<()> {
        self.field_mut(obj)?.read_at_index(self.name, index, io)
    }

    fn write_at_index(&self, obj: &dyn Object, io: &mut PStream, index: &str) -> PResult<()> {
        self.field(obj)?.write_at_index(self.name, index, io)
    }

    fn get_as_object(&self, obj: &dyn Object) -> PResult<ObjRef> {
        self.field(obj)?.as_object(self.name)
    }

    fn get_indexed_object(&self, obj: &dyn Object, index: &str) -> PResult<ObjRef> {
        self.field(obj)?.indexed_object(self.name, index)
    }

    fn children(&self, obj: &dyn Object) -> PResult<Vec<ObjRef>> {
        Ok(self.field(obj)?.child_objects())
    }
}
