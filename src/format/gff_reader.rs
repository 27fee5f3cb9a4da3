//! Decodes the binary GFF layout into a [`Gff`] tree.

use std::collections::HashSet;
use std::io::Cursor;

use binrw::binread;
use glam::{Quat, Vec3};

use super::gff::{Field, FieldType, FieldValue, Gff, GffError, LocString};
use crate::misc::binary_reader::{decode_string, BinaryReader};
use crate::{AuroraResource, AuroraResourceError};

/// Deepest struct nesting accepted. Real files stay in the single digits.
pub const MAX_DEPTH: usize = 64;

#[allow(dead_code)]
#[binread]
#[br(little)]
struct GffHeader {
    file_type: [u8; 4],
    version: [u8; 4],
    struct_offset: u32,
    struct_count: u32,
    field_offset: u32,
    field_count: u32,
    label_offset: u32,
    label_count: u32,
    field_data_offset: u32,
    field_data_size: u32,
    field_indices_offset: u32,
    field_indices_size: u32,
    list_indices_offset: u32,
    list_indices_size: u32,
}

pub struct GffReader<'a> {
    reader: BinaryReader<Cursor<&'a [u8]>>,
    header: GffHeader,
    /// Structs decoded by the current `read_root`. Each struct has at most one parent.
    visited: HashSet<u32>,
}

impl<'a> GffReader<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self, GffError> {
        let mut reader = BinaryReader::from_slice(data);
        let header = reader.read::<GffHeader>()?;
        if &header.version != b"V3.2" {
            return Err(GffError::InvalidSignature(format!(
                "{}{}",
                decode_string(&header.file_type),
                decode_string(&header.version)
            )));
        }
        Ok(Self {
            reader,
            header,
            visited: HashSet::new(),
        })
    }

    /// Decodes a whole file.
    pub fn read(data: &[u8]) -> Result<Gff, GffError> {
        GffReader::new(data)?.read_root()
    }

    /// The four character file type of the header, such as `UTC `.
    pub fn file_type(&self) -> [u8; 4] {
        self.header.file_type
    }

    pub fn read_root(&mut self) -> Result<Gff, GffError> {
        self.visited.clear();
        self.read_struct(0, 0)
    }

    fn read_struct(&mut self, index: u32, depth: usize) -> Result<Gff, GffError> {
        if depth > MAX_DEPTH {
            return Err(GffError::TooDeep(MAX_DEPTH));
        }
        check_index("struct", index, self.header.struct_count)?;
        if !self.visited.insert(index) {
            return Err(GffError::SharedStruct(index));
        }

        let offset = self.header.struct_offset as u64 + 12 * index as u64;
        let raw = self.reader.read_u32_array_at(offset, 3)?;
        let (struct_type, data, count) = (raw[0], raw[1], raw[2]);

        let indices = if count == 1 {
            vec![data]
        } else {
            let offset = self.header.field_indices_offset as u64 + data as u64;
            self.reader.read_u32_array_at(offset, count as usize)?
        };

        let mut fields = Vec::with_capacity(indices.len());
        for index in indices {
            fields.push(self.read_field(index, depth)?);
        }
        Ok(Gff::with_fields(struct_type, fields))
    }

    fn read_field(&mut self, index: u32, depth: usize) -> Result<Field, GffError> {
        check_index("field", index, self.header.field_count)?;

        let offset = self.header.field_offset as u64 + 12 * index as u64;
        let raw = self.reader.read_u32_array_at(offset, 3)?;
        let (field_type, label_index, data) = (FieldType::try_from(raw[0])?, raw[1], raw[2]);

        check_index("label", label_index, self.header.label_count)?;
        let label = self
            .reader
            .read_string_at(self.header.label_offset as u64 + 16 * label_index as u64, 16)?;

        let data_offset = self.header.field_data_offset as u64 + data as u64;
        let value = match field_type {
            FieldType::Byte => FieldValue::Byte(data as u8),
            FieldType::Char => FieldValue::Char(data as i8),
            FieldType::Word => FieldValue::Word(data as u16),
            FieldType::Short => FieldValue::Short(data as i16),
            FieldType::Dword => FieldValue::Dword(data),
            FieldType::Int => FieldValue::Int(data as i32),
            FieldType::Float => FieldValue::Float(f32::from_bits(data)),
            FieldType::Dword64 => {
                FieldValue::Dword64(self.reader.read_at(data_offset, |r| r.read_u64())?)
            }
            FieldType::Int64 => FieldValue::Int64(self.reader.read_at(data_offset, |r| r.read_i64())?),
            FieldType::Double => {
                FieldValue::Double(self.reader.read_at(data_offset, |r| r.read_f64())?)
            }
            FieldType::CExoString => FieldValue::CExoString(self.reader.read_at(data_offset, |r| {
                let length = r.read_u32()?;
                Ok(decode_string(&r.read_bytes(length as usize)?))
            })?),
            FieldType::ResRef => FieldValue::ResRef(self.reader.read_at(data_offset, |r| {
                let length = r.read_u8()?;
                Ok(decode_string(&r.read_bytes(length as usize)?))
            })?),
            FieldType::CExoLocString => {
                FieldValue::CExoLocString(self.reader.read_at(data_offset, |r| {
                    let _total_size = r.read_u32()?;
                    let mut loc = LocString::new(r.read_i32()?);
                    let count = r.read_u32()?;
                    for _ in 0..count {
                        let id = r.read_u32()?;
                        let length = r.read_u32()?;
                        let text = decode_string(&r.read_bytes(length as usize)?);
                        loc.substrings.push((id, text));
                    }
                    Ok(loc)
                })?)
            }
            FieldType::Void => FieldValue::Void(self.reader.read_at(data_offset, |r| {
                let length = r.read_u32()?;
                r.read_bytes(length as usize)
            })?),
            FieldType::Struct => FieldValue::Struct(Box::new(self.read_struct(data, depth + 1)?)),
            FieldType::List => {
                let offset = self.header.list_indices_offset as u64 + data as u64;
                let indices = self.reader.read_at(offset, |r| {
                    let count = r.read_u32()?;
                    r.read_u32_array(count as usize)
                })?;
                let mut children = Vec::with_capacity(indices.len());
                for index in indices {
                    children.push(self.read_struct(index, depth + 1)?);
                }
                FieldValue::List(children)
            }
            FieldType::Orientation => {
                let [w, x, y, z] = self.read_floats::<4>(data_offset)?;
                FieldValue::Orientation(Quat::from_xyzw(x, y, z, w))
            }
            FieldType::Vector => FieldValue::Vector(Vec3::from_array(self.read_floats::<3>(data_offset)?)),
            FieldType::StrRef => FieldValue::StrRef(self.reader.read_at(data_offset, |r| {
                let _size = r.read_u32()?;
                r.read_i32()
            })?),
        };

        Ok(Field { label, value })
    }

    fn read_floats<const N: usize>(&mut self, offset: u64) -> Result<[f32; N], GffError> {
        let mut values = [0.0; N];
        let floats = self.reader.read_at(offset, |r| r.read_f32_array(N))?;
        values.copy_from_slice(&floats);
        Ok(values)
    }
}

fn check_index(table: &'static str, index: u32, count: u32) -> Result<(), GffError> {
    if index < count {
        Ok(())
    } else {
        Err(GffError::InvalidIndex {
            table,
            index,
            count,
        })
    }
}

impl AuroraResource for Gff {
    type Output = Gff;

    fn process_data(data: &[u8]) -> Result<Self::Output, AuroraResourceError> {
        Ok(GffReader::read(data)?)
    }
}
