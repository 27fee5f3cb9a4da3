//! Name generator letter tables (LTR).
//!
//! For every letter context (no previous letter, one previous letter, two previous letters) the
//! table holds cumulative probabilities of each letter starting, continuing or ending a name.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::misc::binary_reader::{decode_string, BinaryReader};
use crate::{AuroraResource, AuroraResourceError};

/// Letters of a 28 letter table in index order. 26 letter tables stop after `z`.
pub const ALPHABET: &[u8; 28] = b"abcdefghijklmnopqrstuvwxyz'-";

#[derive(Debug, Error)]
pub enum LetterTableError {
    #[error("Parsing error: {0}")]
    ParsingError(#[from] binrw::Error),

    #[error("Invalid signature: {0:?}")]
    InvalidSignature(String),

    #[error("Unsupported letter count: {0}")]
    UnsupportedLetterCount(u8),
}

/// Probabilities for one letter context, one value per letter.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LetterSet {
    pub start: Vec<f32>,
    pub middle: Vec<f32>,
    pub end: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LetterTable {
    letter_count: usize,
    singles: LetterSet,
    doubles: Vec<LetterSet>,
    triples: Vec<LetterSet>,
}

impl LetterTable {
    pub fn letter_count(&self) -> usize {
        self.letter_count
    }

    /// Index of `letter` in this table, ignoring ASCII case.
    pub fn letter_index(&self, letter: char) -> Option<usize> {
        let letter = u8::try_from(letter.to_ascii_lowercase()).ok()?;
        ALPHABET[..self.letter_count]
            .iter()
            .position(|l| *l == letter)
    }

    /// Probabilities following `context`, the last zero, one or two letters of a name.
    pub fn probabilities(&self, context: &str) -> Option<&LetterSet> {
        let indices = context
            .chars()
            .map(|c| self.letter_index(c))
            .collect::<Option<Vec<_>>>()?;
        match indices[..] {
            [] => Some(&self.singles),
            [a] => self.doubles.get(a),
            [a, b] => self.triples.get(a * self.letter_count + b),
            _ => None,
        }
    }
}

pub struct LetterTableReader;

impl LetterTableReader {
    pub fn read(data: &[u8]) -> Result<LetterTable, LetterTableError> {
        let mut reader = BinaryReader::from_slice(data);
        let signature = reader.read::<[u8; 8]>()?;
        if &signature != b"LTR V1.0" {
            return Err(LetterTableError::InvalidSignature(decode_string(&signature)));
        }

        let count = reader.read_u8()?;
        if count != 26 && count != 28 {
            return Err(LetterTableError::UnsupportedLetterCount(count));
        }
        let letter_count = count as usize;

        let mut read_set = || -> Result<LetterSet, LetterTableError> {
            Ok(LetterSet {
                start: reader.read_f32_array(letter_count)?,
                middle: reader.read_f32_array(letter_count)?,
                end: reader.read_f32_array(letter_count)?,
            })
        };
        let singles = read_set()?;
        let doubles = (0..letter_count)
            .map(|_| read_set())
            .collect::<Result<Vec<_>, _>>()?;
        let triples = (0..letter_count * letter_count)
            .map(|_| read_set())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LetterTable {
            letter_count,
            singles,
            doubles,
            triples,
        })
    }
}

impl AuroraResource for LetterTable {
    type Output = LetterTable;

    fn process_data(data: &[u8]) -> Result<Self::Output, AuroraResourceError> {
        Ok(LetterTableReader::read(data)?)
    }
}
