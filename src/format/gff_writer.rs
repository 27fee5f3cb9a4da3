//! Encodes a [`Gff`] tree into the binary GFF layout.
//!
//! Structs are numbered breadth first, starting with the root at index 0. Labels are stored once
//! and shared by every field that uses them.

use std::collections::VecDeque;
use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use super::gff::{FieldValue, Gff, GffError};
use crate::misc::resource_type::ResourceType;

const HEADER_SIZE: u32 = 0x38;

#[derive(Default)]
pub struct GffWriter {
    structs: Vec<[u32; 3]>,
    fields: Vec<[u32; 3]>,
    labels: Vec<String>,
    field_data: Vec<u8>,
    field_indices: Vec<u32>,
    list_indices: Vec<u32>,
}

impl GffWriter {
    /// Encodes `root` with the file type belonging to `kind`.
    pub fn write(root: &Gff, kind: ResourceType) -> Result<Vec<u8>, GffError> {
        let signature = kind
            .gff_signature()
            .ok_or(GffError::UnsupportedResourceType(kind))?;

        let mut writer = GffWriter::default();
        writer.process_tree(root)?;

        let mut out = Vec::new();
        writer.write_to(signature, &mut out)?;
        Ok(out)
    }

    fn process_tree(&mut self, root: &Gff) -> Result<(), GffError> {
        let mut queue = VecDeque::from([root]);
        let mut struct_count = 1;

        while let Some(current) = queue.pop_front() {
            let mut indices = Vec::with_capacity(current.fields.len());

            for field in &current.fields {
                indices.push(self.fields.len() as u32);
                let label = self.label_index(&field.label);

                let data = match &field.value {
                    FieldValue::Struct(child) => {
                        queue.push_back(child);
                        struct_count += 1;
                        struct_count - 1
                    }
                    FieldValue::List(children) => {
                        let offset = 4 * self.list_indices.len() as u32;
                        self.list_indices.push(children.len() as u32);
                        for child in children {
                            self.list_indices.push(struct_count);
                            queue.push_back(child);
                            struct_count += 1;
                        }
                        offset
                    }
                    value => match inline_value(value) {
                        Some(data) => data,
                        None => {
                            let offset = self.field_data.len() as u32;
                            write_field_data(value, &mut self.field_data)
                                .map_err(binrw::Error::Io)?;
                            offset
                        }
                    },
                };

                self.fields.push([field.field_type() as u32, label, data]);
            }

            let data = if indices.len() == 1 {
                indices[0]
            } else {
                let offset = 4 * self.field_indices.len() as u32;
                self.field_indices.extend(indices);
                offset
            };
            self.structs
                .push([current.struct_type, data, current.fields.len() as u32]);
        }
        Ok(())
    }

    fn label_index(&mut self, label: &str) -> u32 {
        match self.labels.iter().position(|l| l == label) {
            Some(index) => index as u32,
            None => {
                self.labels.push(label.to_string());
                self.labels.len() as u32 - 1
            }
        }
    }

    fn write_to<W: Write>(&self, signature: &[u8; 4], out: &mut W) -> Result<(), GffError> {
        let struct_count = self.structs.len() as u32;
        let field_count = self.fields.len() as u32;
        let label_count = self.labels.len() as u32;
        let field_data_size = self.field_data.len() as u32;
        let field_indices_size = 4 * self.field_indices.len() as u32;
        let list_indices_size = 4 * self.list_indices.len() as u32;

        let struct_offset = HEADER_SIZE;
        let field_offset = struct_offset + 12 * struct_count;
        let label_offset = field_offset + 12 * field_count;
        let field_data_offset = label_offset + 16 * label_count;
        let field_indices_offset = field_data_offset + field_data_size;
        let list_indices_offset = field_indices_offset + field_indices_size;

        out.write_all(signature).map_err(binrw::Error::Io)?;
        out.write_all(b"V3.2").map_err(binrw::Error::Io)?;
        for value in [
            struct_offset,
            struct_count,
            field_offset,
            field_count,
            label_offset,
            label_count,
            field_data_offset,
            field_data_size,
            field_indices_offset,
            field_indices_size,
            list_indices_offset,
            list_indices_size,
        ] {
            write_u32(out, value)?;
        }

        for record in self.structs.iter().chain(&self.fields) {
            for value in record {
                write_u32(out, *value)?;
            }
        }
        for label in &self.labels {
            let mut padded = [0u8; 16];
            let bytes = label.as_bytes();
            let length = bytes.len().min(16);
            padded[..length].copy_from_slice(&bytes[..length]);
            out.write_all(&padded).map_err(binrw::Error::Io)?;
        }
        out.write_all(&self.field_data).map_err(binrw::Error::Io)?;
        for value in self.field_indices.iter().chain(&self.list_indices) {
            write_u32(out, *value)?;
        }
        Ok(())
    }
}

fn write_u32<W: Write>(out: &mut W, value: u32) -> Result<(), GffError> {
    out.write_u32::<LittleEndian>(value)
        .map_err(|e| GffError::ParsingError(binrw::Error::Io(e)))
}

/// The value stored directly in the field record, for types that fit in four bytes.
fn inline_value(value: &FieldValue) -> Option<u32> {
    Some(match *value {
        FieldValue::Byte(v) => v as u32,
        FieldValue::Char(v) => v as i32 as u32,
        FieldValue::Word(v) => v as u32,
        FieldValue::Short(v) => v as i32 as u32,
        FieldValue::Dword(v) => v,
        FieldValue::Int(v) => v as u32,
        FieldValue::Float(v) => v.to_bits(),
        _ => return None,
    })
}

/// Appends the field data block of a value that does not fit into the field record.
fn write_field_data(value: &FieldValue, data: &mut Vec<u8>) -> std::io::Result<()> {
    match value {
        FieldValue::Dword64(v) => data.write_u64::<LittleEndian>(*v)?,
        FieldValue::Int64(v) => data.write_i64::<LittleEndian>(*v)?,
        FieldValue::Double(v) => data.write_f64::<LittleEndian>(*v)?,
        FieldValue::CExoString(text) => {
            let bytes = encode_string(text);
            data.write_u32::<LittleEndian>(bytes.len() as u32)?;
            data.extend(bytes);
        }
        FieldValue::ResRef(text) => {
            let bytes = encode_string(text);
            let length = bytes.len().min(u8::MAX as usize);
            data.write_u8(length as u8)?;
            data.extend_from_slice(&bytes[..length]);
        }
        FieldValue::CExoLocString(loc) => {
            let substrings: Vec<(u32, Vec<u8>)> = loc
                .substrings
                .iter()
                .map(|(id, text)| (*id, encode_string(text)))
                .collect();
            let total_size: usize = 8 + substrings.iter().map(|(_, b)| 8 + b.len()).sum::<usize>();
            data.write_u32::<LittleEndian>(total_size as u32)?;
            data.write_i32::<LittleEndian>(loc.str_ref)?;
            data.write_u32::<LittleEndian>(substrings.len() as u32)?;
            for (id, bytes) in substrings {
                data.write_u32::<LittleEndian>(id)?;
                data.write_u32::<LittleEndian>(bytes.len() as u32)?;
                data.extend(bytes);
            }
        }
        FieldValue::Void(bytes) => {
            data.write_u32::<LittleEndian>(bytes.len() as u32)?;
            data.extend_from_slice(bytes);
        }
        FieldValue::Orientation(q) => {
            for v in [q.w, q.x, q.y, q.z] {
                data.write_f32::<LittleEndian>(v)?;
            }
        }
        FieldValue::Vector(v) => {
            for c in v.to_array() {
                data.write_f32::<LittleEndian>(c)?;
            }
        }
        FieldValue::StrRef(v) => {
            data.write_u32::<LittleEndian>(4)?;
            data.write_i32::<LittleEndian>(*v)?;
        }
        _ => {}
    }
    Ok(())
}

/// Game strings are single-byte encoded. Characters outside that range become `?`.
fn encode_string(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
