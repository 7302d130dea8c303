//! NBT encoding for the two Bedrock flavors.
//!
//! Layout of a root: tag type byte (always compound), name, payload. The
//! flavors differ only in how integers and lengths are written:
//!
//! | value            | LittleEndian | Network            |
//! |------------------|--------------|--------------------|
//! | short            | i16 LE       | i16 LE             |
//! | int              | i32 LE       | zigzag varint      |
//! | long             | i64 LE       | zigzag varlong     |
//! | string length    | u16 LE       | unsigned varint    |
//! | array/list length| i32 LE       | zigzag varint      |

use std::sync::Arc;

use crate::binary::{ByteReader, ByteWriter};
use crate::{CompoundTag, ListTag, NbtError, Tag, TagType};

/// Deepest nesting of lists/compounds accepted when reading.
pub const MAX_DEPTH: usize = 512;

/// Longest string the network flavor accepts.
const MAX_NETWORK_STRING: u32 = 32_767;

/// Which integer encoding to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NbtFlavor {
    /// Fixed-width little-endian, as stored on disk.
    LittleEndian,
    /// Varint-based encoding used on the wire.
    Network,
}

/// Reads one root compound from the start of `data`.
pub fn read_root(data: &[u8], flavor: NbtFlavor) -> Result<CompoundTag, NbtError> {
    read_root_from(&mut ByteReader::new(data), flavor)
}

/// Reads one root compound at the reader's position, advancing past it.
pub fn read_root_from(reader: &mut ByteReader<'_>, flavor: NbtFlavor) -> Result<CompoundTag, NbtError> {
    let id = reader.get_byte()?;
    if id != TagType::Compound.id() {
        return Err(NbtError::RootNotCompound(id));
    }
    let mut decoder = Decoder { reader, flavor };
    decoder.read_string()?;
    decoder.read_compound(0)
}

/// Reads consecutive root compounds until the data is exhausted.
pub fn read_multiple(data: &[u8], flavor: NbtFlavor) -> Result<Vec<CompoundTag>, NbtError> {
    let mut reader = ByteReader::new(data);
    let mut roots = Vec::new();
    while !reader.feof() {
        roots.push(read_root_from(&mut reader, flavor)?);
    }
    Ok(roots)
}

/// Appends `root` as an unnamed root compound.
pub fn write_root(out: &mut Vec<u8>, root: &CompoundTag, flavor: NbtFlavor) -> Result<(), NbtError> {
    let mut encoder = Encoder { out, flavor };
    encoder.out.put_byte(TagType::Compound.id());
    encoder.write_string("")?;
    encoder.write_compound(root)
}

struct Decoder<'r, 'a> {
    reader: &'r mut ByteReader<'a>,
    flavor: NbtFlavor,
}

impl Decoder<'_, '_> {
    fn read_int(&mut self) -> Result<i32, NbtError> {
        match self.flavor {
            NbtFlavor::LittleEndian => self.reader.get_lint(),
            NbtFlavor::Network => self.reader.get_varint(),
        }
    }

    fn read_long(&mut self) -> Result<i64, NbtError> {
        match self.flavor {
            NbtFlavor::LittleEndian => self.reader.get_llong(),
            NbtFlavor::Network => self.reader.get_varlong(),
        }
    }

    fn read_len(&mut self) -> Result<usize, NbtError> {
        let len = self.read_int()?;
        usize::try_from(len).map_err(|_| NbtError::NegativeLength(i64::from(len)))
    }

    fn read_string(&mut self) -> Result<Arc<str>, NbtError> {
        let len = match self.flavor {
            NbtFlavor::LittleEndian => usize::from(self.reader.get_lushort()?),
            NbtFlavor::Network => {
                let len = self.reader.get_unsigned_varint()?;
                if len > MAX_NETWORK_STRING {
                    return Err(NbtError::StringTooLong(len as usize));
                }
                len as usize
            }
        };
        let offset = self.reader.offset();
        let bytes = self.reader.get_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(Arc::from)
            .map_err(|_| NbtError::InvalidUtf8 { offset })
    }

    fn read_compound(&mut self, depth: usize) -> Result<CompoundTag, NbtError> {
        if depth >= MAX_DEPTH {
            return Err(NbtError::DepthLimit(MAX_DEPTH));
        }
        let mut compound = CompoundTag::new();
        loop {
            let offset = self.reader.offset();
            let id = self.reader.get_byte()?;
            let tag_type = TagType::from_id(id).ok_or(NbtError::UnknownTagType { id, offset })?;
            if tag_type == TagType::End {
                return Ok(compound);
            }
            let name = self.read_string()?;
            let value = self.read_payload(tag_type, depth + 1)?;
            compound.insert(name, value);
        }
    }

    fn read_payload(&mut self, tag_type: TagType, depth: usize) -> Result<Tag, NbtError> {
        Ok(match tag_type {
            TagType::End => {
                return Err(NbtError::UnknownTagType {
                    id: 0,
                    offset: self.reader.offset(),
                });
            }
            TagType::Byte => Tag::Byte(self.reader.get_byte()? as i8),
            TagType::Short => Tag::Short(self.reader.get_lshort()?),
            TagType::Int => Tag::Int(self.read_int()?),
            TagType::Long => Tag::Long(self.read_long()?),
            TagType::Float => Tag::Float(self.reader.get_lfloat()?),
            TagType::Double => Tag::Double(self.reader.get_ldouble()?),
            TagType::ByteArray => {
                let len = self.read_len()?;
                Tag::ByteArray(self.reader.get_bytes(len)?.to_vec())
            }
            TagType::String => Tag::String(self.read_string()?),
            TagType::List => {
                if depth >= MAX_DEPTH {
                    return Err(NbtError::DepthLimit(MAX_DEPTH));
                }
                let offset = self.reader.offset();
                let id = self.reader.get_byte()?;
                let element_type =
                    TagType::from_id(id).ok_or(NbtError::UnknownTagType { id, offset })?;
                let len = self.read_len()?;
                let mut list = ListTag::of_type(element_type);
                if element_type != TagType::End {
                    for _ in 0..len {
                        list.push(self.read_payload(element_type, depth + 1)?)?;
                    }
                }
                Tag::List(list)
            }
            TagType::Compound => Tag::Compound(Arc::new(self.read_compound(depth)?)),
            TagType::IntArray => {
                let len = self.read_len()?;
                let mut values = Vec::with_capacity(len.min(self.reader.remaining()));
                for _ in 0..len {
                    values.push(self.read_int()?);
                }
                Tag::IntArray(values)
            }
            TagType::LongArray => {
                let len = self.read_len()?;
                let mut values = Vec::with_capacity(len.min(self.reader.remaining()));
                for _ in 0..len {
                    values.push(self.read_long()?);
                }
                Tag::LongArray(values)
            }
        })
    }
}

struct Encoder<'o> {
    out: &'o mut Vec<u8>,
    flavor: NbtFlavor,
}

impl Encoder<'_> {
    fn write_int(&mut self, v: i32) {
        match self.flavor {
            NbtFlavor::LittleEndian => self.out.put_lint(v),
            NbtFlavor::Network => self.out.put_varint(v),
        }
    }

    fn write_long(&mut self, v: i64) {
        match self.flavor {
            NbtFlavor::LittleEndian => self.out.put_llong(v),
            NbtFlavor::Network => self.out.put_varlong(v),
        }
    }

    fn write_len(&mut self, len: usize) -> Result<(), NbtError> {
        let len = i32::try_from(len).map_err(|_| NbtError::StringTooLong(len))?;
        self.write_int(len);
        Ok(())
    }

    fn write_string(&mut self, s: &str) -> Result<(), NbtError> {
        let len = s.len();
        match self.flavor {
            NbtFlavor::LittleEndian => {
                let len = u16::try_from(len).map_err(|_| NbtError::StringTooLong(len))?;
                self.out.put_lushort(len);
            }
            NbtFlavor::Network => {
                if len > MAX_NETWORK_STRING as usize {
                    return Err(NbtError::StringTooLong(len));
                }
                self.out.put_unsigned_varint(len as u32);
            }
        }
        self.out.put_bytes(s.as_bytes());
        Ok(())
    }

    fn write_compound(&mut self, compound: &CompoundTag) -> Result<(), NbtError> {
        for (name, value) in compound.iter() {
            self.out.put_byte(value.tag_type().id());
            self.write_string(name)?;
            self.write_payload(value)?;
        }
        self.out.put_byte(TagType::End.id());
        Ok(())
    }

    fn write_payload(&mut self, tag: &Tag) -> Result<(), NbtError> {
        match tag {
            Tag::Byte(v) => self.out.put_byte(*v as u8),
            Tag::Short(v) => self.out.put_lshort(*v),
            Tag::Int(v) => self.write_int(*v),
            Tag::Long(v) => self.write_long(*v),
            Tag::Float(v) => self.out.put_lfloat(*v),
            Tag::Double(v) => self.out.put_ldouble(*v),
            Tag::ByteArray(bytes) => {
                self.write_len(bytes.len())?;
                self.out.put_bytes(bytes);
            }
            Tag::String(s) => self.write_string(s)?,
            Tag::List(list) => {
                self.out.put_byte(list.element_type().id());
                self.write_len(list.len())?;
                for item in list.iter() {
                    self.write_payload(item)?;
                }
            }
            Tag::Compound(c) => self.write_compound(c)?,
            Tag::IntArray(values) => {
                self.write_len(values.len())?;
                for v in values {
                    self.write_int(*v);
                }
            }
            Tag::LongArray(values) => {
                self.write_len(values.len())?;
                for v in values {
                    self.write_long(*v);
                }
            }
        }
        Ok(())
    }
}

// ---- Tests ----
