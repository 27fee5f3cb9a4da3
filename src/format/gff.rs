//! The generic file format (GFF): a tree of typed, labelled fields.
//!
//! Creatures, items, dialogues, areas and most other game objects are stored as GFF. Each struct
//! carries an application defined type and an ordered list of fields; struct and list fields own
//! their children, so a decoded [`Gff`] is a plain tree with no sharing.

use glam::{Quat, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GffError {
    #[error("Parsing error: {0}")]
    ParsingError(#[from] binrw::Error),

    #[error("Invalid signature: {0:?}")]
    InvalidSignature(String),

    #[error("Unsupported field type: {0}")]
    UnsupportedFieldType(u32),

    #[error("{table} index {index} out of range, the table holds {count}")]
    InvalidIndex {
        table: &'static str,
        index: u32,
        count: u32,
    },

    #[error("Structs nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("Struct {0} is referenced more than once")]
    SharedStruct(u32),

    #[error("{0} is not a GFF resource type")]
    UnsupportedResourceType(crate::ResourceType),
}

/// Field type ids as stored in the field table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u32)]
pub enum FieldType {
    Byte = 0,
    Char = 1,
    Word = 2,
    Short = 3,
    Dword = 4,
    Int = 5,
    Dword64 = 6,
    Int64 = 7,
    Float = 8,
    Double = 9,
    CExoString = 10,
    ResRef = 11,
    CExoLocString = 12,
    Void = 13,
    Struct = 14,
    List = 15,
    Orientation = 16,
    Vector = 17,
    StrRef = 18,
}

impl TryFrom<u32> for FieldType {
    type Error = GffError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => FieldType::Byte,
            1 => FieldType::Char,
            2 => FieldType::Word,
            3 => FieldType::Short,
            4 => FieldType::Dword,
            5 => FieldType::Int,
            6 => FieldType::Dword64,
            7 => FieldType::Int64,
            8 => FieldType::Float,
            9 => FieldType::Double,
            10 => FieldType::CExoString,
            11 => FieldType::ResRef,
            12 => FieldType::CExoLocString,
            13 => FieldType::Void,
            14 => FieldType::Struct,
            15 => FieldType::List,
            16 => FieldType::Orientation,
            17 => FieldType::Vector,
            18 => FieldType::StrRef,
            _ => return Err(GffError::UnsupportedFieldType(value)),
        })
    }
}

/// A localized string: a talk table reference plus any number of inline substrings keyed by
/// language and gender id.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LocString {
    /// Talk table entry, `-1` when the string is only given inline.
    pub str_ref: i32,
    pub substrings: Vec<(u32, String)>,
}

impl LocString {
    pub fn new(str_ref: i32) -> Self {
        Self {
            str_ref,
            substrings: vec![],
        }
    }

    pub fn with_substring(mut self, id: u32, text: impl Into<String>) -> Self {
        self.substrings.push((id, text.into()));
        self
    }

    /// The first inline substring, or an empty string.
    pub fn first(&self) -> &str {
        self.substrings
            .first()
            .map(|(_, text)| text.as_str())
            .unwrap_or_default()
    }
}

/// The payload of a field. The variant is selected by the field type id of the record.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FieldValue {
    Byte(u8),
    Char(i8),
    Word(u16),
    Short(i16),
    Dword(u32),
    Int(i32),
    Dword64(u64),
    Int64(i64),
    Float(f32),
    Double(f64),
    CExoString(String),
    ResRef(String),
    CExoLocString(LocString),
    Void(Vec<u8>),
    Struct(Box<Gff>),
    List(Vec<Gff>),
    Orientation(Quat),
    Vector(Vec3),
    StrRef(i32),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Byte(_) => FieldType::Byte,
            FieldValue::Char(_) => FieldType::Char,
            FieldValue::Word(_) => FieldType::Word,
            FieldValue::Short(_) => FieldType::Short,
            FieldValue::Dword(_) => FieldType::Dword,
            FieldValue::Int(_) => FieldType::Int,
            FieldValue::Dword64(_) => FieldType::Dword64,
            FieldValue::Int64(_) => FieldType::Int64,
            FieldValue::Float(_) => FieldType::Float,
            FieldValue::Double(_) => FieldType::Double,
            FieldValue::CExoString(_) => FieldType::CExoString,
            FieldValue::ResRef(_) => FieldType::ResRef,
            FieldValue::CExoLocString(_) => FieldType::CExoLocString,
            FieldValue::Void(_) => FieldType::Void,
            FieldValue::Struct(_) => FieldType::Struct,
            FieldValue::List(_) => FieldType::List,
            FieldValue::Orientation(_) => FieldType::Orientation,
            FieldValue::Vector(_) => FieldType::Vector,
            FieldValue::StrRef(_) => FieldType::StrRef,
        }
    }

    /// Integer payloads widened to i64. String references count as integers.
    fn as_i64(&self) -> Option<i64> {
        Some(match *self {
            FieldValue::Byte(v) => v as i64,
            FieldValue::Char(v) => v as i64,
            FieldValue::Word(v) => v as i64,
            FieldValue::Short(v) => v as i64,
            FieldValue::Dword(v) => v as i64,
            FieldValue::Int(v) => v as i64,
            FieldValue::Dword64(v) => v as i64,
            FieldValue::Int64(v) => v,
            FieldValue::StrRef(v) => v as i64,
            FieldValue::CExoLocString(ref loc) => loc.str_ref as i64,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Field {
    pub label: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(label: impl Into<String>, value: FieldValue) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }

    pub fn field_type(&self) -> FieldType {
        self.value.field_type()
    }
}

/// One GFF struct. The root of a file is a struct of type `0xffffffff`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gff {
    pub struct_type: u32,
    pub fields: Vec<Field>,
}

impl Gff {
    pub const ROOT_STRUCT_TYPE: u32 = 0xffff_ffff;

    pub fn new(struct_type: u32) -> Self {
        Self {
            struct_type,
            fields: vec![],
        }
    }

    pub fn with_fields(struct_type: u32, fields: Vec<Field>) -> Self {
        Self {
            struct_type,
            fields,
        }
    }

    /// Appends a field, builder style.
    pub fn with(mut self, label: impl Into<String>, value: FieldValue) -> Self {
        self.fields.push(Field::new(label, value));
        self
    }

    pub fn push(&mut self, label: impl Into<String>, value: FieldValue) {
        self.fields.push(Field::new(label, value));
    }

    /// The first field labelled `label`.
    pub fn get(&self, label: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.label == label)
    }

    fn value(&self, label: &str) -> Option<&FieldValue> {
        self.get(label).map(|field| &field.value)
    }

    pub fn get_int(&self, label: &str, default: i32) -> i32 {
        self.value(label)
            .and_then(FieldValue::as_i64)
            .map_or(default, |v| v as i32)
    }

    pub fn get_uint(&self, label: &str, default: u32) -> u32 {
        self.value(label)
            .and_then(FieldValue::as_i64)
            .map_or(default, |v| v as u32)
    }

    pub fn get_int64(&self, label: &str, default: i64) -> i64 {
        self.value(label).and_then(FieldValue::as_i64).unwrap_or(default)
    }

    pub fn get_uint64(&self, label: &str, default: u64) -> u64 {
        match self.value(label) {
            Some(FieldValue::Dword64(v)) => *v,
            Some(value) => value.as_i64().map_or(default, |v| v as u64),
            None => default,
        }
    }

    pub fn get_bool(&self, label: &str, default: bool) -> bool {
        self.value(label)
            .and_then(FieldValue::as_i64)
            .map_or(default, |v| v != 0)
    }

    pub fn get_float(&self, label: &str, default: f32) -> f32 {
        match self.value(label) {
            Some(FieldValue::Float(v)) => *v,
            Some(FieldValue::Double(v)) => *v as f32,
            _ => default,
        }
    }

    pub fn get_double(&self, label: &str, default: f64) -> f64 {
        match self.value(label) {
            Some(FieldValue::Double(v)) => *v,
            Some(FieldValue::Float(v)) => *v as f64,
            _ => default,
        }
    }

    /// String and resref payloads, or the first substring of a localized string.
    pub fn get_string(&self, label: &str, default: &str) -> String {
        match self.value(label) {
            Some(FieldValue::CExoString(v) | FieldValue::ResRef(v)) => v.clone(),
            Some(FieldValue::CExoLocString(loc)) => loc.first().to_string(),
            _ => default.to_string(),
        }
    }

    pub fn get_loc_string(&self, label: &str) -> Option<&LocString> {
        match self.value(label) {
            Some(FieldValue::CExoLocString(loc)) => Some(loc),
            _ => None,
        }
    }

    /// An RGB color packed into the low three bytes of an integer field.
    pub fn get_color(&self, label: &str, default: Vec3) -> Vec3 {
        match self.value(label).and_then(FieldValue::as_i64) {
            Some(v) => {
                let v = v as u32;
                Vec3::new(
                    (v & 0xff) as f32,
                    ((v >> 8) & 0xff) as f32,
                    ((v >> 16) & 0xff) as f32,
                ) / 255.0
            }
            None => default,
        }
    }

    pub fn get_vector(&self, label: &str, default: Vec3) -> Vec3 {
        match self.value(label) {
            Some(FieldValue::Vector(v)) => *v,
            _ => default,
        }
    }

    pub fn get_orientation(&self, label: &str, default: Quat) -> Quat {
        match self.value(label) {
            Some(FieldValue::Orientation(v)) => *v,
            _ => default,
        }
    }

    pub fn get_struct(&self, label: &str) -> Option<&Gff> {
        match self.value(label) {
            Some(FieldValue::Struct(child)) => Some(child.as_ref()),
            _ => None,
        }
    }

    /// The elements of a list field, empty when the field is missing.
    pub fn get_list(&self, label: &str) -> &[Gff] {
        match self.value(label) {
            Some(FieldValue::List(children)) => children.as_slice(),
            _ => &[],
        }
    }

    pub fn get_data(&self, label: &str) -> &[u8] {
        match self.value(label) {
            Some(FieldValue::Void(data)) => data.as_slice(),
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creature() -> Gff {
        Gff::new(Gff::ROOT_STRUCT_TYPE)
            .with("Tag", FieldValue::CExoString("bandit".to_string()))
            .with("Appearance_Type", FieldValue::Word(12))
            .with("Interruptable", FieldValue::Byte(1))
            .with("ChallengeRating", FieldValue::Float(2.5))
            .with(
                "FirstName",
                FieldValue::CExoLocString(LocString::new(-1).with_substring(0, "Bandit")),
            )
            .with("Color", FieldValue::Dword(0x00ff8000))
            .with(
                "ItemList",
                FieldValue::List(vec![
                    Gff::new(0).with("InventoryRes", FieldValue::ResRef("g_w_blstrpstl001".into())),
                    Gff::new(1).with("InventoryRes", FieldValue::ResRef("g_a_clothes01".into())),
                ]),
            )
    }

    #[test]
    fn test_typed_accessors() {
        let gff = creature();
        assert_eq!(gff.get_string("Tag", ""), "bandit");
        assert_eq!(gff.get_int("Appearance_Type", 0), 12);
        assert_eq!(gff.get_uint("Appearance_Type", 0), 12);
        assert!(gff.get_bool("Interruptable", false));
        assert_eq!(gff.get_float("ChallengeRating", 0.0), 2.5);
        assert_eq!(gff.get_double("ChallengeRating", 0.0), 2.5);
        assert_eq!(gff.get_string("FirstName", ""), "Bandit");
        assert_eq!(gff.get_int("FirstName", 0), -1);
        assert_eq!(gff.get_color("Color", Vec3::ZERO), Vec3::new(0.0, 128.0 / 255.0, 1.0));

        let items = gff.get_list("ItemList");
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].struct_type, 1);
        assert_eq!(items[1].get_string("InventoryRes", ""), "g_a_clothes01");
    }

    #[test]
    fn test_defaults_on_missing_or_mismatched_fields() {
        let gff = creature();
        assert_eq!(gff.get_int("Missing", 7), 7);
        assert_eq!(gff.get_int("Tag", 7), 7);
        assert_eq!(gff.get_float("Tag", 1.5), 1.5);
        assert_eq!(gff.get_string("Appearance_Type", "none"), "none");
        assert_eq!(gff.get_vector("Tag", Vec3::ONE), Vec3::ONE);
        assert_eq!(gff.get_orientation("Tag", Quat::IDENTITY), Quat::IDENTITY);
        assert!(gff.get_struct("ItemList").is_none());
        assert!(gff.get_list("Tag").is_empty());
        assert!(gff.get_data("Missing").is_empty());
    }

    #[test]
    fn test_field_type_ids() {
        assert_eq!(FieldType::try_from(17).ok(), Some(FieldType::Vector));
        assert_eq!(FieldValue::StrRef(3).field_type() as u32, 18);
        assert!(matches!(
            FieldType::try_from(19),
            Err(GffError::UnsupportedFieldType(19))
        ));
    }
}
