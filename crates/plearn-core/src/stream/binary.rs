//! Tagged binary numbers of the `plearn_binary` format
//!
//! Each value is one tag byte followed by its little-endian payload. Tags
//! are control bytes that never start a textual value, so readers accept
//! either encoding in either mode.

use super::PStream;
use crate::error::PResult;

pub(crate) const TAG_BOOL: u8 = 0x01;
pub(crate) const TAG_I32: u8 = 0x02;
pub(crate) const TAG_U32: u8 = 0x03;
pub(crate) const TAG_I64: u8 = 0x04;
pub(crate) const TAG_U64: u8 = 0x05;
pub(crate) const TAG_F32: u8 = 0x06;
pub(crate) const TAG_F64: u8 = 0x07;

/// Payload size following a tag
pub(crate) fn binary_payload_len(tag: u8) -> Option<usize> {
    match tag {
        TAG_BOOL => Some(1),
        TAG_I32 | TAG_U32 | TAG_F32 => Some(4),
        TAG_I64 | TAG_U64 | TAG_F64 => Some(8),
        _ => None,
    }
}

pub(crate) fn is_binary_tag(byte: u8) -> bool {
    binary_payload_len(byte).is_some()
}

/// A decoded binary number
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryNumber {
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Floating point
    Float(f64),
}

fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

impl PStream {
    /// Decode a binary number if the next byte is a binary tag
    ///
    /// Returns `Ok(None)` without consuming anything otherwise.
    pub fn read_binary_number(&mut self) -> PResult<Option<BinaryNumber>> {
        let tag = match self.peek() {
            Some(tag) if is_binary_tag(tag) => tag,
            _ => return Ok(None),
        };
        let len = binary_payload_len(tag).unwrap_or(0);
        let bytes = self.read_bytes(1 + len)?;
        let payload = &bytes[1..];
        let number = match tag {
            TAG_BOOL => BinaryNumber::Bool(payload[0] != 0),
            TAG_I32 => BinaryNumber::Int(i32::from_le_bytes(array(payload)) as i64),
            TAG_U32 => BinaryNumber::UInt(u32::from_le_bytes(array(payload)) as u64),
            TAG_I64 => BinaryNumber::Int(i64::from_le_bytes(array(payload))),
            TAG_U64 => BinaryNumber::UInt(u64::from_le_bytes(array(payload))),
            TAG_F32 => BinaryNumber::Float(f32::from_le_bytes(array(payload)) as f64),
            _ => BinaryNumber::Float(f64::from_le_bytes(array(payload))),
        };
        Ok(Some(number))
    }

    /// Write a tag followed by its payload
    pub(crate) fn write_tagged(&mut self, tag: u8, payload: &[u8]) {
        self.put(tag);
        self.write_bytes(payload);
    }
}
