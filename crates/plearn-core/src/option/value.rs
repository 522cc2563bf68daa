//! Per-type capabilities of option fields
//!
//! Indexing and object access depend on the field's type. Scalars support
//! neither; vectors are indexed by position, maps by key; object handles
//! expose the object they hold.

use crate::error::{PLearnError, PResult};
use crate::object::ObjRef;
use crate::persist::Persist;
use crate::stream::PStream;
use std::collections::BTreeMap;

/// A type usable as an option field
///
/// Every hook receives the option name for its error messages.
pub trait OptionValue: Persist + 'static {
    /// Read one element into position `index`
    fn read_at_index(&mut self, option: &str, _index: &str, _io: &mut PStream) -> PResult<()> {
        Err(PLearnError::NotIndexable(option.to_string()))
    }

    /// Write the element at position `index`
    fn write_at_index(&self, option: &str, _index: &str, _io: &mut PStream) -> PResult<()> {
        Err(PLearnError::NotIndexable(option.to_string()))
    }

    /// The object this value holds
    fn as_object(&self, option: &str) -> PResult<ObjRef> {
        Err(PLearnError::NotAnObject(option.to_string()))
    }

    /// The object held at position `index`
    fn indexed_object(&self, option: &str, _index: &str) -> PResult<ObjRef> {
        Err(PLearnError::NotIndexable(option.to_string()))
    }

    /// Objects directly held by this value
    fn child_objects(&self) -> Vec<ObjRef> {
        Vec::new()
    }
}

macro_rules! impl_scalar_option_value {
    ($($ty:ty),*) => {
        $(impl OptionValue for $ty {})*
    };
}

impl_scalar_option_value!(i32, u32, i64, u64, usize, f32, f64, bool, String);

fn position(option: &str, index: &str, len: usize) -> PResult<usize> {
    index
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| PLearnError::BadIndex {
            option: option.to_string(),
            index: index.to_string(),
        })
}

impl<T: OptionValue> OptionValue for Vec<T> {
    fn read_at_index(&mut self, option: &str, index: &str, io: &mut PStream) -> PResult<()> {
        let i = position(option, index, self.len())?;
        self[i].read_into(io)
    }

    fn write_at_index(&self, option: &str, index: &str, io: &mut PStream) -> PResult<()> {
        let i = position(option, index, self.len())?;
        self[i].write_to(io)
    }

    fn indexed_object(&self, option: &str, index: &str) -> PResult<ObjRef> {
        let i = position(option, index, self.len())?;
        self[i].as_object(option)
    }

    fn child_objects(&self) -> Vec<ObjRef> {
        self.iter().flat_map(OptionValue::child_objects).collect()
    }
}

impl<T: OptionValue> OptionValue for BTreeMap<String, T> {
    fn read_at_index(&mut self, _option: &str, index: &str, io: &mut PStream) -> PResult<()> {
        let value = T::read_from(io)?;
        self.insert(index.to_string(), value);
        Ok(())
    }

    fn write_at_index(&self, option: &str, index: &str, io: &mut PStream) -> PResult<()> {
        match self.get(index) {
            Some(value) => value.write_to(io),
            None => Err(PLearnError::BadIndex {
                option: option.to_string(),
                index: index.to_string(),
            }),
        }
    }

    fn indexed_object(&self, option: &str, index: &str) -> PResult<ObjRef> {
        match self.get(index) {
            Some(value) => value.as_object(option),
            None => Err(PLearnError::BadIndex {
                option: option.to_string(),
                index: index.to_string(),
            }),
        }
    }

    fn child_objects(&self) -> Vec<ObjRef> {
        self.values().flat_map(OptionValue::child_objects).collect()
    }
}

impl OptionValue for ObjRef {
    fn as_object(&self, _option: &str) -> PResult<ObjRef> {
        Ok(self.clone())
    }

    fn child_objects(&self) -> Vec<ObjRef> {
        vec![self.clone()]
    }
}

impl OptionValue for Option<ObjRef> {
    fn as_object(&self, option: &str) -> PResult<ObjRef> {
        self.clone()
            .ok_or_else(|| PLearnError::NullObject(option.to_string()))
    }

    fn child_objects(&self) -> Vec<ObjRef> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_is_not_indexable() {
        let mut x = 3i32;
        let mut io = PStream::from_text("4");
        assert!(matches!(
            x.read_at_index("x", "0", &mut io),
            Err(PLearnError::NotIndexable(name)) if name == "x"
        ));
        assert!(matches!(x.as_object("x"), Err(PLearnError::NotAnObject(_))));
    }

    #[test]
    fn test_vec_index_read_write() {
        let mut v = vec![1.0f64, 2.0, 3.0];
        let mut io = PStream::from_text("9.5");
        v.read_at_index("v", "1", &mut io).unwrap();
        assert_eq!(v, vec![1.0, 9.5, 3.0]);

        let mut out = PStream::new();
        v.write_at_index("v", "2", &mut out).unwrap();
        assert_eq!(out.output_string().unwrap(), "3");
    }

    #[test]
    fn test_vec_bad_index() {
        let v = vec![1i32];
        let mut out = PStream::new();
        assert!(matches!(
            v.write_at_index("v", "5", &mut out),
            Err(PLearnError::BadIndex { .. })
        ));
        assert!(matches!(
            v.write_at_index("v", "x", &mut out),
            Err(PLearnError::BadIndex { .. })
        ));
    }

    #[test]
    fn test_vec_of_numbers_has_no_objects() {
        let v = vec![1i32, 2];
        assert!(matches!(v.indexed_object("v", "0"), Err(PLearnError::NotAnObject(_))));
    }

    #[test]
    fn test_map_index_inserts() {
        let mut m: BTreeMap<String, i32> = BTreeMap::new();
        let mut io = PStream::from_text("7");
        m.read_at_index("m", "new_key", &mut io).unwrap();
        assert_eq!(m.get("new_key"), Some(&7));
    }

    #[test]
    fn test_null_object() {
        let empty: Option<ObjRef> = None;
        assert!(matches!(empty.as_object("sub"), Err(PLearnError::NullObject(_))));
        assert!(empty.child_objects().is_empty());
    }
}
