//! Talk tables (TLK): the localized strings referenced by string reference numbers.

use std::io::SeekFrom;

use binrw::binread;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::misc::binary_reader::{decode_string, BinaryReader};
use crate::{AuroraResource, AuroraResourceError};

const TEXT_PRESENT: u32 = 0x1;

#[derive(Debug, Error)]
pub enum TalkTableError {
    #[error("Parsing error: {0}")]
    ParsingError(#[from] binrw::Error),

    #[error("Invalid signature: {0:?}")]
    InvalidSignature(String),
}

#[allow(dead_code)]
#[binread]
#[br(little)]
struct TlkHeader {
    signature: [u8; 8],
    language_id: u32,
    string_count: u32,
    offset_to_strings: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TalkTableString {
    pub text: String,
    /// Voice-over played with the string, empty when there is none.
    pub sound_resref: String,
    pub sound_length: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TalkTable {
    pub language_id: u32,
    strings: Vec<TalkTableString>,
}

impl TalkTable {
    pub fn new(language_id: u32, strings: Vec<TalkTableString>) -> Self {
        Self {
            language_id,
            strings,
        }
    }

    /// The entry for `str_ref`, or `None` for `-1` and references past the end of the table.
    pub fn get(&self, str_ref: i32) -> Option<&TalkTableString> {
        usize::try_from(str_ref)
            .ok()
            .and_then(|index| self.strings.get(index))
    }

    pub fn get_text(&self, str_ref: i32) -> &str {
        self.get(str_ref).map_or("", |s| s.text.as_str())
    }

    pub fn strings(&self) -> &[TalkTableString] {
        &self.strings
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

pub struct TalkTableReader;

impl TalkTableReader {
    pub fn read(data: &[u8]) -> Result<TalkTable, TalkTableError> {
        let mut reader = BinaryReader::from_slice(data);
        let header = reader.read::<TlkHeader>()?;
        if &header.signature != b"TLK V3.0" {
            return Err(TalkTableError::InvalidSignature(decode_string(
                &header.signature,
            )));
        }

        let mut strings = Vec::with_capacity((header.string_count as usize).min(4096));
        reader.seek(SeekFrom::Start(20))?;
        for _ in 0..header.string_count {
            let flags = reader.read_u32()?;
            let sound_resref = reader.read_string(16)?;
            let _volume_variance = reader.read_u32()?;
            let _pitch_variance = reader.read_u32()?;
            let offset = reader.read_u32()?;
            let size = reader.read_u32()?;
            let sound_length = reader.read_f32()?;

            let text = if flags & TEXT_PRESENT != 0 {
                let at = header.offset_to_strings as u64 + offset as u64;
                decode_string(&reader.read_bytes_at(at, size as usize)?)
            } else {
                String::new()
            };
            strings.push(TalkTableString {
                text,
                sound_resref,
                sound_length,
            });
        }

        Ok(TalkTable::new(header.language_id, strings))
    }
}

impl AuroraResource for TalkTable {
    type Output = TalkTable;

    fn process_data(data: &[u8]) -> Result<Self::Output, AuroraResourceError> {
        Ok(TalkTableReader::read(data)?)
    }
}
