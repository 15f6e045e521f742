//! Framing of the claim files.
//!
//! ```text
//! magic (4 bytes) | version (VarInt) | payload | SHA-256 of the payload (32 bytes)
//! ```

use bytes::{Bytes, BytesMut};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::data_types::{CodecError, DataType, Encodable, ErrorReason, VarInt, VarLong};
use super::StorageError;

const DIGEST_LENGTH: usize = 32;

/// Builds the payload of a claim file, then frames it.
#[derive(Default)]
pub struct RecordBuilder {
    payload: BytesMut,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self {
            payload: BytesMut::with_capacity(256),
        }
    }

    pub fn append<T: Encodable>(&mut self, value: &T) -> Result<&mut Self, CodecError> {
        value.encode(&mut self.payload)?;
        Ok(self)
    }

    pub fn append_varint(&mut self, value: i32) -> Result<&mut Self, CodecError> {
        self.append(&VarInt(value))
    }

    pub fn append_varlong(&mut self, value: i64) -> Result<&mut Self, CodecError> {
        self.append(&VarLong(value))
    }

    /// Appends a collection length.
    pub fn append_len(&mut self, len: usize) -> Result<&mut Self, CodecError> {
        let len = i32::try_from(len).map_err(|_| {
            CodecError::Encoding(DataType::VarInt, ErrorReason::ValueTooLarge)
        })?;
        self.append_varint(len)
    }

    pub fn append_str(&mut self, string: &str) -> Result<&mut Self, CodecError> {
        self.append(&string.to_string())
    }

    pub fn append_uuid(&mut self, id: &Uuid) -> Result<&mut Self, CodecError> {
        self.append(id)
    }

    /// Frames the payload: magic, version, payload and its digest.
    pub fn finish(self, magic: &[u8; 4], version: i32) -> Result<Bytes, CodecError> {
        let mut file = BytesMut::with_capacity(self.payload.len() + DIGEST_LENGTH + 9);
        file.extend_from_slice(magic);
        VarInt(version).encode(&mut file)?;
        file.extend_from_slice(&self.payload);
        file.extend_from_slice(&Sha256::digest(&self.payload));
        Ok(file.freeze())
    }
}

/// Reads the payload of a claim file front to back.
pub struct RecordReader<'a> {
    payload: &'a [u8],
    position: usize,
}

impl<'a> RecordReader<'a> {
    /// Checks the magic, the version and the digest, then positions the reader at the start of
    /// the payload.
    pub fn open(file: &'a [u8], magic: &[u8; 4], version: i32) -> Result<Self, StorageError> {
        let body = file
            .strip_prefix(magic.as_slice())
            .ok_or(StorageError::BadMagic {
                expected: String::from_utf8_lossy(magic).into_owned(),
            })?;

        let (VarInt(found), length) = VarInt::decode(body)?;
        if found != version {
            return Err(StorageError::Version {
                found,
                expected: version,
            });
        }

        let body = &body[length..];
        if body.len() < DIGEST_LENGTH {
            return Err(StorageError::Truncated);
        }
        let (payload, digest) = body.split_at(body.len() - DIGEST_LENGTH);
        if Sha256::digest(payload).as_slice() != digest {
            return Err(StorageError::Checksum);
        }

        Ok(Self {
            payload,
            position: 0,
        })
    }

    pub fn read<T: Encodable>(&mut self) -> Result<T, CodecError> {
        let (value, length) = T::decode(&self.payload[self.position..])?;
        self.position += length;
        Ok(value)
    }

    pub fn read_varint(&mut self) -> Result<i32, CodecError> {
        self.read::<VarInt>().map(|VarInt(value)| value)
    }

    pub fn read_varlong(&mut self) -> Result<i64, CodecError> {
        self.read::<VarLong>().map(|VarLong(value)| value)
    }

    /// Reads a collection length written by [`RecordBuilder::append_len`].
    pub fn read_len(&mut self) -> Result<usize, CodecError> {
        let len = self.read_varint()?;
        usize::try_from(len).map_err(|_| {
            CodecError::Decoding(DataType::Other("Length"), ErrorReason::ValueTooSmall)
        })
    }

    /// Whether the whole payload was consumed.
    pub fn is_empty(&self) -> bool {
        self.position >= self.payload.len()
    }
}
