//! Byte stream primitives.
//!
//! Fixed-width integers are little-endian. Bedrock varints are LEB128 groups
//! of 7 bits; the signed forms apply zigzag encoding on top.

use crate::NbtError;

/// Maximum encoded size of a 32-bit varint.
const MAX_VARINT_BYTES: usize = 5;
/// Maximum encoded size of a 64-bit varint.
const MAX_VARLONG_BYTES: usize = 10;

/// Cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Current read position.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// True once every byte has been consumed.
    pub fn feof(&self) -> bool {
        self.offset >= self.data.len()
    }

    pub fn get_bytes(&mut self, len: usize) -> Result<&'a [u8], NbtError> {
        if self.remaining() < len {
            return Err(NbtError::Truncated {
                offset: self.offset,
                needed: len - self.remaining(),
            });
        }
        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn get_array<const N: usize>(&mut self) -> Result<[u8; N], NbtError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.get_bytes(N)?);
        Ok(buf)
    }

    pub fn get_byte(&mut self) -> Result<u8, NbtError> {
        Ok(self.get_array::<1>()?[0])
    }

    pub fn get_lshort(&mut self) -> Result<i16, NbtError> {
        Ok(i16::from_le_bytes(self.get_array()?))
    }

    pub fn get_lushort(&mut self) -> Result<u16, NbtError> {
        Ok(u16::from_le_bytes(self.get_array()?))
    }

    pub fn get_lint(&mut self) -> Result<i32, NbtError> {
        Ok(i32::from_le_bytes(self.get_array()?))
    }

    pub fn get_luint(&mut self) -> Result<u32, NbtError> {
        Ok(u32::from_le_bytes(self.get_array()?))
    }

    pub fn get_llong(&mut self) -> Result<i64, NbtError> {
        Ok(i64::from_le_bytes(self.get_array()?))
    }

    pub fn get_lfloat(&mut self) -> Result<f32, NbtError> {
        Ok(f32::from_le_bytes(self.get_array()?))
    }

    pub fn get_ldouble(&mut self) -> Result<f64, NbtError> {
        Ok(f64::from_le_bytes(self.get_array()?))
    }

    fn get_leb128(&mut self, max_bytes: usize) -> Result<u64, NbtError> {
        let start = self.offset;
        let mut value = 0u64;
        for i in 0..max_bytes {
            let b = self.get_byte()?;
            value |= u64::from(b & 0x7f) << (7 * i);
            if b & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(NbtError::VarIntTooLong {
            offset: start,
            max_bytes,
        })
    }

    /// Unsigned 32-bit varint. Bits beyond 32 are discarded.
    pub fn get_unsigned_varint(&mut self) -> Result<u32, NbtError> {
        Ok(self.get_leb128(MAX_VARINT_BYTES)? as u32)
    }

    /// Zigzag-encoded signed 32-bit varint.
    pub fn get_varint(&mut self) -> Result<i32, NbtError> {
        let raw = self.get_unsigned_varint()?;
        Ok(((raw >> 1) as i32) ^ -((raw & 1) as i32))
    }

    pub fn get_unsigned_varlong(&mut self) -> Result<u64, NbtError> {
        self.get_leb128(MAX_VARLONG_BYTES)
    }

    /// Zigzag-encoded signed 64-bit varint.
    pub fn get_varlong(&mut self) -> Result<i64, NbtError> {
        let raw = self.get_unsigned_varlong()?;
        Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
    }
}

/// Append-only writers mirroring [`ByteReader`].
pub trait ByteWriter {
    fn put_bytes(&mut self, bytes: &[u8]);

    fn put_byte(&mut self, v: u8) {
        self.put_bytes(&[v]);
    }

    fn put_lshort(&mut self, v: i16) {
        self.put_bytes(&v.to_le_bytes());
    }

    fn put_lushort(&mut self, v: u16) {
        self.put_bytes(&v.to_le_bytes());
    }

    fn put_lint(&mut self, v: i32) {
        self.put_bytes(&v.to_le_bytes());
    }

    fn put_luint(&mut self, v: u32) {
        self.put_bytes(&v.to_le_bytes());
    }

    fn put_llong(&mut self, v: i64) {
        self.put_bytes(&v.to_le_bytes());
    }

    fn put_lfloat(&mut self, v: f32) {
        self.put_bytes(&v.to_le_bytes());
    }

    fn put_ldouble(&mut self, v: f64) {
        self.put_bytes(&v.to_le_bytes());
    }

    fn put_unsigned_varlong(&mut self, mut v: u64) {
        let mut buf = [0u8; MAX_VARLONG_BYTES];
        let mut len = 0;
        loop {
            let low = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                buf[len] = low;
                len += 1;
                break;
            }
            buf[len] = low | 0x80;
            len += 1;
        }
        self.put_bytes(&buf[..len]);
    }

    fn put_unsigned_varint(&mut self, v: u32) {
        self.put_unsigned_varlong(u64::from(v));
    }

    fn put_varint(&mut self, v: i32) {
        self.put_unsigned_varint(((v << 1) ^ (v >> 31)) as u32);
    }

    fn put_varlong(&mut self, v: i64) {
        self.put_unsigned_varlong(((v << 1) ^ (v >> 63)) as u64);
    }
}

impl ByteWriter for Vec<u8> {
    fn put_bytes(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}
