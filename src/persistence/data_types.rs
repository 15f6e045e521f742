//! Primitive types of the claim files: LEB128 VarInt/VarLong, length-prefixed UTF-8 strings,
//! raw UUIDs and single-byte booleans. Integers use the same wire form as the game protocol.

use std::fmt;

use bytes::{BufMut, BytesMut};
use thiserror::Error;
use uuid::Uuid;

/// Represents datatypes in errors
#[derive(Eq, PartialEq, Clone, Debug)]
pub enum DataType {
    VarInt,
    VarLong,
    String,
    Uuid,
    Byte,
    Other(&'static str),
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::VarInt => write!(f, "VarInt"),
            DataType::VarLong => write!(f, "VarLong"),
            DataType::String => write!(f, "String"),
            DataType::Uuid => write!(f, "UUID"),
            DataType::Byte => write!(f, "Byte"),
            DataType::Other(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Eq, PartialEq, Clone, Debug)]
pub enum ErrorReason {
    ValueTooLarge,
    ValueTooSmall,
    ValueEmpty,
    InvalidFormat(String),
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorReason::ValueTooLarge => write!(f, "Value too large"),
            ErrorReason::ValueTooSmall => write!(f, "Value too small"),
            ErrorReason::ValueEmpty => write!(f, "Value empty"),
            ErrorReason::InvalidFormat(reason) => write!(f, "Invalid format: {reason}"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Encoding error for {0}: {1}")]
    Encoding(DataType, ErrorReason),

    #[error("Decoding error for {0}: {1}")]
    Decoding(DataType, ErrorReason),
}

/// A value with a fixed binary form.
pub trait Encodable: Sized {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Decodes a value from the start of `data`. Returns it with the number of bytes it took.
    fn decode(data: &[u8]) -> Result<(Self, usize), CodecError>;
}

const SEGMENT_BITS: u8 = 0x7F; // 0111 1111
const CONTINUE_BIT: u8 = 0x80; // 1000 0000

/// LEB128 over the raw bits of an unsigned value, so negative numbers take the maximum length.
fn write_leb128(buf: &mut BytesMut, mut bits: u64) {
    loop {
        let byte = (bits as u8) & SEGMENT_BITS;
        bits >>= 7;
        if bits == 0 {
            buf.put_u8(byte);
            return;
        }
        buf.put_u8(byte | CONTINUE_BIT);
    }
}

/// Reads at most `max_len` bytes of LEB128. `width` is the bit width of the target type.
fn read_leb128(
    data: &[u8],
    max_len: usize,
    width: u32,
    data_type: DataType,
) -> Result<(u64, usize), CodecError> {
    let mut value: u64 = 0;
    for (index, byte) in data.iter().enumerate() {
        if index >= max_len {
            break;
        }
        let shift = 7 * index as u32;
        let segment = (byte & SEGMENT_BITS) as u64;
        if shift + 7 > width && segment >> (width - shift) != 0 {
            return Err(CodecError::Decoding(data_type, ErrorReason::ValueTooLarge));
        }
        value |= segment << shift;

        if byte & CONTINUE_BIT == 0 {
            return Ok((value, index + 1));
        }
    }

    let reason = if data.is_empty() {
        ErrorReason::ValueEmpty
    } else if data.len() < max_len {
        ErrorReason::InvalidFormat("Unterminated value".to_string())
    } else {
        ErrorReason::ValueTooLarge
    };
    Err(CodecError::Decoding(data_type, reason))
}

/// A 32-bit integer in at most 5 bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VarInt(pub i32);

impl Encodable for VarInt {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        write_leb128(buf, self.0 as u32 as u64);
        Ok(())
    }

    fn decode(data: &[u8]) -> Result<(Self, usize), CodecError> {
        let (bits, length) = read_leb128(data, 5, 32, DataType::VarInt)?;
        Ok((VarInt(bits as u32 as i32), length))
    }
}

/// A 64-bit integer in at most 10 bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VarLong(pub i64);

impl Encodable for VarLong {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        write_leb128(buf, self.0 as u64);
        Ok(())
    }

    fn decode(data: &[u8]) -> Result<(Self, usize), CodecError> {
        let (bits, length) = read_leb128(data, 10, 64, DataType::VarLong)?;
        Ok((VarLong(bits as i64), length))
    }
}

/// UTF-8 prefixed with its size in bytes as a VarInt.
impl Encodable for String {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        if self.len() > MAX_STRING_BYTES {
            return Err(CodecError::Encoding(
                DataType::String,
                ErrorReason::ValueTooLarge,
            ));
        }
        VarInt(self.len() as i32).encode(buf)?;
        buf.put_slice(self.as_bytes());
        Ok(())
    }

    fn decode(data: &[u8]) -> Result<(Self, usize), CodecError> {
        let (VarInt(length), prefix) = VarInt::decode(data)?;
        let length = usize::try_from(length)
            .map_err(|_| CodecError::Decoding(DataType::String, ErrorReason::ValueTooSmall))?;
        if length > MAX_STRING_BYTES {
            return Err(CodecError::Decoding(
                DataType::String,
                ErrorReason::ValueTooLarge,
            ));
        }

        let end = prefix + length;
        let bytes = data.get(prefix..end).ok_or_else(|| {
            CodecError::Decoding(
                DataType::String,
                ErrorReason::InvalidFormat("String length is greater than provided bytes".into()),
            )
        })?;
        let string = std::str::from_utf8(bytes).map_err(|err| {
            CodecError::Decoding(
                DataType::String,
                ErrorReason::InvalidFormat(format!("String UTF-8 decoding error: {err}")),
            )
        })?;
        Ok((string.to_string(), end))
    }
}

/// Strings longer than this are refused both ways.
pub const MAX_STRING_BYTES: usize = 32767 * 3;

/// 16 raw bytes, most significant first.
impl Encodable for Uuid {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_slice(self.as_bytes());
        Ok(())
    }

    fn decode(data: &[u8]) -> Result<(Self, usize), CodecError> {
        let bytes: [u8; 16] = data
            .get(..16)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(CodecError::Decoding(DataType::Uuid, ErrorReason::ValueEmpty))?;
        Ok((Uuid::from_bytes(bytes), 16))
    }
}

impl Encodable for u8 {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u8(*self);
        Ok(())
    }

    fn decode(data: &[u8]) -> Result<(Self, usize), CodecError> {
        data.first()
            .map(|byte| (*byte, 1))
            .ok_or(CodecError::Decoding(DataType::Byte, ErrorReason::ValueEmpty))
    }
}

impl Encodable for bool {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        (*self as u8).encode(buf)
    }

    fn decode(data: &[u8]) -> Result<(Self, usize), CodecError> {
        match u8::decode(data)? {
            (0, length) => Ok((false, length)),
            (1, length) => Ok((true, length)),
            (other, _) => Err(CodecError::Decoding(
                DataType::Other("Boolean"),
                ErrorReason::InvalidFormat(format!("{other} is not a boolean")),
            )),
        }
    }
}
