//! Stream representation of value types
//!
//! Every option field, remote-method argument and remote-method result
//! implements [`Persist`]. Text forms:
//!
//! - integers and floats as decimal text (`nan`, `inf` accepted for floats),
//! - booleans as `true`/`false` (`1`/`0` accepted on read),
//! - strings double-quoted (bare words accepted on read),
//! - vectors as `[a, b, c]`, optionally prefixed by their length on read,
//! - maps as `{key: value, ...}`.
//!
//! In `plearn_binary` mode numbers and booleans are written as tagged
//! little-endian bytes; readers accept both forms in both modes.

use crate::error::PResult;
use crate::stream::{BinaryNumber, PStream, StreamMode};
use crate::stream::{TAG_BOOL, TAG_F32, TAG_F64, TAG_I32, TAG_I64, TAG_U32, TAG_U64};
use std::collections::BTreeMap;

/// A value that can be read from and written to a [`PStream`]
pub trait Persist: Sized {
    /// Name of the type as shown in documentation (`int`, `TVec<double>`...)
    fn type_name() -> String;

    /// Read one value
    fn read_from(io: &mut PStream) -> PResult<Self>;

    /// Write this value
    fn write_to(&self, io: &mut PStream) -> PResult<()>;

    /// Read one value into an existing location
    fn read_into(&mut self, io: &mut PStream) -> PResult<()> {
        *self = Self::read_from(io)?;
        Ok(())
    }
}

/// Serialize a value to text
pub fn write_into_string<T: Persist>(value: &T) -> PResult<String> {
    let mut io = PStream::new().with_mode(StreamMode::PlearnAscii);
    value.write_to(&mut io)?;
    io.output_string()
}

/// Parse a value from text
pub fn read_from_str<T: Persist>(text: &str) -> PResult<T> {
    let mut io = PStream::from_text(text);
    T::read_from(&mut io)
}

// ============================================================================
// Numbers
// ============================================================================

fn read_integer(io: &mut PStream) -> PResult<i128> {
    io.skip_blanks_and_comments();
    if let Some(number) = io.read_binary_number()? {
        return match number {
            BinaryNumber::Int(v) => Ok(v as i128),
            BinaryNumber::UInt(v) => Ok(v as i128),
            BinaryNumber::Bool(b) => Ok(b as i128),
            BinaryNumber::Float(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i128),
            BinaryNumber::Float(f) => Err(io.error(format!("Expected an integer, found {}", f))),
        };
    }
    let token = io.read_token()?;
    token
        .parse::<i128>()
        .map_err(|_| io.error(format!("Expected an integer, found '{}'", token)))
}

fn read_float<T: std::str::FromStr>(io: &mut PStream, from_binary: fn(f64) -> T) -> PResult<T> {
    io.skip_blanks_and_comments();
    if let Some(number) = io.read_binary_number()? {
        return match number {
            BinaryNumber::Float(f) => Ok(from_binary(f)),
            BinaryNumber::Int(v) => Ok(from_binary(v as f64)),
            BinaryNumber::UInt(v) => Ok(from_binary(v as f64)),
            BinaryNumber::Bool(_) => Err(io.error("Expected a number, found a boolean")),
        };
    }
    let token = io.read_token()?;
    token
        .parse::<T>()
        .map_err(|_| io.error(format!("Expected a number, found '{}'", token)))
}

macro_rules! impl_persist_int {
    ($($ty:ty => $name:expr, $tag:expr;)*) => {
        $(
            impl Persist for $ty {
                fn type_name() -> String {
                    $name.to_string()
                }

                fn read_from(io: &mut PStream) -> PResult<Self> {
                    let value = read_integer(io)?;
                    <$ty>::try_from(value).map_err(|_| {
                        io.error(format!("Value {} is out of range for {}", value, $name))
                    })
                }

                fn write_to(&self, io: &mut PStream) -> PResult<()> {
                    match io.mode() {
                        StreamMode::PlearnAscii => io.write_str(&self.to_string()),
                        StreamMode::PlearnBinary => io.write_tagged($tag, &self.to_le_bytes()),
                    }
                    Ok(())
                }
            }
        )*
    };
}

impl_persist_int! {
    i32 => "int", TAG_I32;
    u32 => "uint", TAG_U32;
    i64 => "long", TAG_I64;
    u64 => "ulong", TAG_U64;
}

impl Persist for usize {
    fn type_name() -> String {
        "size_t".to_string()
    }

    fn read_from(io: &mut PStream) -> PResult<Self> {
        let value = read_integer(io)?;
        usize::try_from(value)
            .map_err(|_| io.error(format!("Value {} is out of range for size_t", value)))
    }

    fn write_to(&self, io: &mut PStream) -> PResult<()> {
        match io.mode() {
            StreamMode::PlearnAscii => io.write_str(&self.to_string()),
            StreamMode::PlearnBinary => io.write_tagged(TAG_U64, &(*self as u64).to_le_bytes()),
        }
        Ok(())
    }
}

impl Persist for f64 {
    fn type_name() -> String {
        "double".to_string()
    }

    fn read_from(io: &mut PStream) -> PResult<Self> {
        read_float(io, |f| f)
    }

    fn write_to(&self, io: &mut PStream) -> PResult<()> {
        match io.mode() {
            StreamMode::PlearnAscii => io.write_str(&self.to_string()),
            StreamMode::PlearnBinary => io.write_tagged(TAG_F64, &self.to_le_bytes()),
        }
        Ok(())
    }
}

impl Persist for f32 {
    fn type_name() -> String {
        "float".to_string()
    }

    fn read_from(io: &mut PStream) -> PResult<Self> {
        read_float(io, |f| f as f32)
    }

    fn write_to(&self, io: &mut PStream) -> PResult<()> {
        match io.mode() {
            StreamMode::PlearnAscii => io.write_str(&self.to_string()),
            StreamMode::PlearnBinary => io.write_tagged(TAG_F32, &self.to_le_bytes()),
        }
        Ok(())
    }
}

impl Persist for bool {
    fn type_name() -> String {
        "bool".to_string()
    }

    fn read_from(io: &mut PStream) -> PResult<Self> {
        io.skip_blanks_and_comments();
        if let Some(number) = io.read_binary_number()? {
            return match number {
                BinaryNumber::Bool(b) => Ok(b),
                BinaryNumber::Int(0) | BinaryNumber::UInt(0) => Ok(false),
                BinaryNumber::Int(1) | BinaryNumber::UInt(1) => Ok(true),
                other => Err(io.error(format!("Expected a boolean, found {:?}", other))),
            };
        }
        let token = io.read_token()?;
        match token.as_str() {
            "true" | "True" | "1" => Ok(true),
            "false" | "False" | "0" => Ok(false),
            _ => Err(io.error(format!("Expected a boolean, found '{}'", token))),
        }
    }

    fn write_to(&self, io: &mut PStream) -> PResult<()> {
        match io.mode() {
            StreamMode::PlearnAscii => io.write_str(if *self { "true" } else { "false" }),
            StreamMode::PlearnBinary => io.write_tagged(TAG_BOOL, &[*self as u8]),
        }
        Ok(())
    }
}

impl Persist for String {
    fn type_name() -> String {
        "string".to_string()
    }

    fn read_from(io: &mut PStream) -> PResult<Self> {
        io.read_string()
    }

    fn write_to(&self, io: &mut PStream) -> PResult<()> {
        io.write_quoted(self);
        Ok(())
    }
}

// ============================================================================
// Containers
// ============================================================================

impl<T: Persist> Persist for Vec<T> {
    fn type_name() -> String {
        format!("TVec<{}>", T::type_name())
    }

    fn read_from(io: &mut PStream) -> PResult<Self> {
        io.skip_blanks_and_comments();
        // Optional length prefix: `3 [a, b, c]`
        let declared_len = if io.peek().is_some_and(|b| b.is_ascii_digit()) {
            Some(usize::read_from(io)?)
        } else {
            None
        };
        io.expect(b'[')?;
        // Every element takes at least one input byte.
        let capacity = declared_len.unwrap_or(0).min(io.remaining().len());
        let mut items = Vec::with_capacity(capacity);
        loop {
            io.skip_separators();
            match io.peek() {
                Some(b']') => {
                    io.get()?;
                    break;
                }
                None => return Err(io.error("Unterminated list")),
                _ => items.push(T::read_from(io)?),
            }
        }
        if let Some(len) = declared_len {
            if len != items.len() {
                return Err(io.error(format!(
                    "List announced {} elements but contains {}",
                    len,
                    items.len()
                )));
            }
        }
        Ok(items)
    }

    fn write_to(&self, io: &mut PStream) -> PResult<()> {
        io.put(b'[');
        for (i, item) in self.iter().enumerate() {
            if i > 0 {
                io.write_str(", ");
            }
            item.write_to(io)?;
        }
        io.put(b']');
        Ok(())
    }
}

impl<K: Persist + Ord, V: Persist> Persist for BTreeMap<K, V> {
    fn type_name() -> String {
        format!("map<{}, {}>", K::type_name(), V::type_name())
    }

    fn read_from(io: &mut PStream) -> PResult<Self> {
        io.expect(b'{')?;
        let mut map = BTreeMap::new();
        loop {
            io.skip_separators();
            match io.peek() {
                Some(b'}') => {
                    io.get()?;
                    break;
                }
                None => return Err(io.error("Unterminated map")),
                _ => {
                    let key = K::read_from(io)?;
                    io.expect(b':')?;
                    let value = V::read_from(io)?;
                    map.insert(key, value);
                }
            }
        }
        Ok(map)
    }

    fn write_to(&self, io: &mut PStream) -> PResult<()> {
        io.put(b'{');
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                io.write_str(", ");
            }
            key.write_to(io)?;
            io.write_str(": ");
            value.write_to(io)?;
        }
        io.put(b'}');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_round_trip<T: Persist>(value: &T) -> T {
        let mut out = PStream::new().with_mode(StreamMode::PlearnBinary);
        value.write_to(&mut out).unwrap();
        let mut input = PStream::from_bytes(out.take_output());
        T::read_from(&mut input).unwrap()
    }

    #[test]
    fn test_integers_text() {
        assert_eq!(write_into_string(&-42i32).unwrap(), "-42");
        assert_eq!(read_from_str::<i32>("  -42 ").unwrap(), -42);
        assert_eq!(read_from_str::<u64>("18446744073709551615").unwrap(), u64::MAX);
    }

    #[test]
    fn test_integer_out_of_range() {
        assert!(read_from_str::<i32>("4294967296").is_err());
        assert!(read_from_str::<u32>("-1").is_err());
    }

    #[test]
    fn test_floats_text() {
        assert_eq!(write_into_string(&0.5f64).unwrap(), "0.5");
        assert_eq!(read_from_str::<f64>("1e-3").unwrap(), 0.001);
        assert!(read_from_str::<f64>("nan").unwrap().is_nan());
        assert_eq!(read_from_str::<f64>("-inf").unwrap(), f64::NEG_INFINITY);
        assert!(read_from_str::<f64>("abc").is_err());
    }

    #[test]
    fn test_bool_accepts_digits() {
        assert!(read_from_str::<bool>("1").unwrap());
        assert!(!read_from_str::<bool>("false").unwrap());
        assert!(read_from_str::<bool>("maybe").is_err());
    }

    #[test]
    fn test_strings_quoted_and_bare() {
        assert_eq!(write_into_string(&"a b".to_string()).unwrap(), "\"a b\"");
        assert_eq!(read_from_str::<String>("\"a b\"").unwrap(), "a b");
        assert_eq!(read_from_str::<String>("bare;").unwrap(), "bare");
    }

    #[test]
    fn test_vec_text() {
        let v = vec![1.5f64, -2.0, 3.25];
        assert_eq!(write_into_string(&v).unwrap(), "[1.5, -2, 3.25]");
        assert_eq!(read_from_str::<Vec<f64>>("[1.5 -2 3.25]").unwrap(), v);
        assert_eq!(read_from_str::<Vec<i32>>("3 [1, 2, 3]").unwrap(), vec![1, 2, 3]);
        assert!(read_from_str::<Vec<i32>>("2 [1, 2, 3]").is_err());
        assert!(read_from_str::<Vec<i32>>("[1, 2").is_err());
    }

    #[test]
    fn test_vec_huge_length_prefix_is_an_error() {
        let err = read_from_str::<Vec<f64>>("18446744073709551615 [1]").unwrap_err();
        assert!(err.to_string().contains("announced 18446744073709551615 elements"));
    }

    #[test]
    fn test_map_text() {
        let mut map = BTreeMap::new();
        map.insert("alpha".to_string(), 1i32);
        map.insert("beta".to_string(), 2);
        let text = write_into_string(&map).unwrap();
        assert_eq!(text, "{\"alpha\": 1, \"beta\": 2}");
        assert_eq!(read_from_str::<BTreeMap<String, i32>>(&text).unwrap(), map);
        assert_eq!(
            read_from_str::<BTreeMap<String, i32>>("{alpha: 1; beta: 2}").unwrap(),
            map
        );
    }

    #[test]
    fn test_binary_values() {
        assert_eq!(binary_round_trip(&-7i32), -7);
        assert_eq!(binary_round_trip(&u64::MAX), u64::MAX);
        assert_eq!(binary_round_trip(&12usize), 12);
        assert_eq!(binary_round_trip(&0.1f64), 0.1);
        assert_eq!(binary_round_trip(&0.1f32), 0.1f32);
        assert!(binary_round_trip(&true));
        assert_eq!(binary_round_trip(&vec![1i64, 2, 3]), vec![1, 2, 3]);
    }

    #[test]
    fn test_text_reader_accepts_binary_input() {
        let mut out = PStream::new().with_mode(StreamMode::PlearnBinary);
        5i32.write_to(&mut out).unwrap();
        let mut input = PStream::from_bytes(out.take_output()).with_mode(StreamMode::PlearnAscii);
        assert_eq!(f64::read_from(&mut input).unwrap(), 5.0);
    }
}
