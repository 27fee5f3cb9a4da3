//! Two-dimensional arrays (2DA): named columns, one string cell per column in every row.
//!
//! Binary `2DA V2.b` layout: tab-terminated column names closed by a NUL, the row count, one
//! tab-terminated label per row, a `u16` offset per cell and finally a blob of NUL-terminated
//! cell strings the offsets point into.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::misc::binary_reader::{decode_string, BinaryReader};
use crate::{AuroraResource, AuroraResourceError};

/// Cell value meaning "no value". Decoded as an empty string.
const EMPTY_CELL: &str = "****";

#[derive(Debug, Error)]
pub enum TwoDaError {
    #[error("Parsing error: {0}")]
    ParsingError(#[from] binrw::Error),

    #[error("Invalid signature: {0:?}")]
    InvalidSignature(String),

    #[error("row {row} has {found} cells, the table has {expected} columns")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TwoDa {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TwoDa {
    /// Builds a table, rejecting any row whose cell count differs from the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, TwoDaError> {
        if let Some((row, cells)) = rows
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != columns.len())
        {
            return Err(TwoDaError::RowLength {
                row,
                expected: columns.len(),
                found: cells.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Position of the column named exactly `column`.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// The cell at `row` and `column`.
    ///
    /// # Panics
    ///
    /// Panics when either index is out of range.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        assert!(
            row < self.rows.len(),
            "2DA row {row} out of range, the table has {} rows",
            self.rows.len()
        );
        assert!(
            column < self.columns.len(),
            "2DA column {column} out of range, the table has {} columns",
            self.columns.len()
        );
        &self.rows[row][column]
    }

    /// The non-empty cell at `row` in the named column, or `None` when the column does not exist
    /// or the cell is empty.
    ///
    /// # Panics
    ///
    /// Panics when `row` is out of range.
    fn value(&self, row: usize, column: &str) -> Option<&str> {
        assert!(
            row < self.rows.len(),
            "2DA row {row} out of range, the table has {} rows",
            self.rows.len()
        );
        let index = self.column_index(column)?;
        let value = self.rows[row][index].as_str();
        (!value.is_empty()).then_some(value)
    }

    pub fn get_string<'a>(&'a self, row: usize, column: &str, default: &'a str) -> &'a str {
        self.value(row, column).unwrap_or(default)
    }

    pub fn get_int(&self, row: usize, column: &str, default: i32) -> i32 {
        self.parse(row, column, default, parse_leading_int)
    }

    pub fn get_float(&self, row: usize, column: &str, default: f32) -> f32 {
        self.parse(row, column, default, |v| v.parse().ok())
    }

    pub fn get_bool(&self, row: usize, column: &str, default: bool) -> bool {
        self.parse(row, column, default, |v| parse_leading_int(v).map(|v| v != 0))
    }

    /// Reads a hexadecimal cell, with or without a `0x` prefix.
    pub fn get_hex_uint(&self, row: usize, column: &str, default: u32) -> u32 {
        self.parse(row, column, default, |v| {
            let digits = v
                .strip_prefix("0x")
                .or_else(|| v.strip_prefix("0X"))
                .unwrap_or(v);
            u32::from_str_radix(digits, 16).ok()
        })
    }

    fn parse<T: Copy>(
        &self,
        row: usize,
        column: &str,
        default: T,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> T {
        let Some(value) = self.value(row, column) else {
            return default;
        };
        parse(value).unwrap_or_else(|| {
            warn!(row, column, value, "Malformed 2DA cell");
            default
        })
    }

    /// The first row whose cell in `column` equals `value`.
    pub fn find_row_by_column_value(&self, column: &str, value: &str) -> Option<usize> {
        let index = self.column_index(column)?;
        self.rows.iter().position(|row| row[index] == value)
    }
}

pub struct TwoDaReader;

impl TwoDaReader {
    pub fn read(data: &[u8]) -> Result<TwoDa, TwoDaError> {
        let mut reader = BinaryReader::from_slice(data);
        let signature = reader.read::<[u8; 8]>()?;
        if &signature != b"2DA V2.b" {
            return Err(TwoDaError::InvalidSignature(decode_string(&signature)));
        }
        reader.skip(1)?;

        let mut columns = vec![];
        while let Some(token) = read_token(&mut reader)? {
            columns.push(token);
        }

        let row_count = reader.read_u32()? as usize;
        for _ in 0..row_count {
            read_token(&mut reader)?;
        }

        let offsets = reader.read_u16_array(row_count * columns.len())?;
        let _data_size = reader.read_u16()?;
        let data_start = reader.position()?;

        let mut rows = Vec::with_capacity(row_count.min(4096));
        for cells in offsets.chunks(columns.len().max(1)).take(row_count) {
            let mut row = Vec::with_capacity(columns.len());
            for offset in cells.iter().take(columns.len()) {
                let value = reader.read_cstring_at(data_start + *offset as u64)?;
                row.push(if value == EMPTY_CELL { String::new() } else { value });
            }
            rows.push(row);
        }
        // a table without columns still has its rows
        rows.resize(row_count, vec![]);

        TwoDa::new(columns, rows)
    }
}

/// Reads a tab-terminated token, or `None` at the NUL closing the column list.
/// Parses the integer at the start of `value`, ignoring leading whitespace and any trailing
/// text, so `"1.5"` reads as 1.
fn parse_leading_int(value: &str) -> Option<i32> {
    let value = value.trim_start();
    let sign = usize::from(value.starts_with(['+', '-']));
    let end = value[sign..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(value.len(), |i| sign + i);
    value[..end].parse().ok()
}

fn read_token(
    reader: &mut BinaryReader<std::io::Cursor<&[u8]>>,
) -> Result<Option<String>, TwoDaError> {
    let mut bytes = vec![];
    loop {
        match reader.read_u8()? {
            b'\t' => return Ok(Some(decode_string(&bytes))),
            0 => return Ok(None),
            byte => bytes.push(byte),
        }
    }
}

impl AuroraResource for TwoDa {
    type Output = TwoDa;

    fn process_data(data: &[u8]) -> Result<Self::Output, AuroraResourceError> {
        Ok(TwoDaReader::read(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a binary table, interning repeated cell strings the way the game files do.
    fn build_2da(columns: &[&str], rows: &[&[&str]]) -> Vec<u8> {
        let mut data = b"2DA V2.b\n".to_vec();
        for column in columns {
            data.extend_from_slice(column.as_bytes());
            data.push(b'\t');
        }
        data.push(0);
        data.extend_from_slice(&(rows.len() as u32).to_le_bytes());
        for i in 0..rows.len() {
            data.extend_from_slice(i.to_string().as_bytes());
            data.push(b'\t');
        }

        let mut blob: Vec<u8> = vec![];
        let mut interned: Vec<(&str, u16)> = vec![];
        let mut offsets = vec![];
        for cell in rows.iter().flat_map(|row| row.iter()) {
            let offset = match interned.iter().find(|(s, _)| s == cell) {
                Some((_, offset)) => *offset,
                None => {
                    let offset = blob.len() as u16;
                    blob.extend_from_slice(cell.as_bytes());
                    blob.push(0);
                    interned.push((*cell, offset));
                    offset
                }
            };
            offsets.push(offset);
        }
        for offset in offsets {
            data.extend_from_slice(&offset.to_le_bytes());
        }
        data.extend_from_slice(&(blob.len() as u16).to_le_bytes());
        data.extend_from_slice(&blob);
        data
    }

    fn appearance() -> TwoDa {
        TwoDa::new(
            vec!["label".into(), "race".into(), "walkdist".into(), "color".into()],
            vec![
                vec!["Bastila".into(), "P_BastilaBB".into(), "1.75".into(), "0x00ff00".into()],
                vec!["Carth".into(), "".into(), "x".into(), "ff".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_decode() -> Result<(), TwoDaError> {
        let data = build_2da(
            &["label", "race", "walkdist"],
            &[&["Bastila", "P_BastilaBB", "1"], &["Carth", "****", "1"]],
        );
        let table = TwoDaReader::read(&data)?;

        assert_eq!(table.columns(), ["label", "race", "walkdist"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(1, 0), "Carth");
        assert_eq!(table.cell(1, 1), "");
        assert_eq!(table.get_int(1, "walkdist", 0), 1);
        assert_eq!(table.find_row_by_column_value("label", "Carth"), Some(1));
        Ok(())
    }

    #[test]
    fn test_typed_accessors() {
        let table = appearance();
        assert_eq!(table.get_string(0, "race", "none"), "P_BastilaBB");
        assert_eq!(table.get_string(1, "race", "none"), "none");
        assert_eq!(table.get_string(0, "missing", "none"), "none");
        assert_eq!(table.get_float(0, "walkdist", 0.0), 1.75);
        assert_eq!(table.get_float(1, "walkdist", 2.0), 2.0);
        assert_eq!(table.get_hex_uint(0, "color", 0), 0xff00);
        assert_eq!(table.get_hex_uint(1, "color", 0), 0xff);
        assert!(!table.get_bool(1, "race", false));
        assert_eq!(table.get_int(0, "Label", -1), -1);
        assert_eq!(table.get_int(0, "walkdist", 0), 1);
        assert_eq!(table.get_int(1, "walkdist", -1), -1);
        assert!(table.get_bool(0, "walkdist", false));
    }

    #[test]
    fn test_integer_prefix() -> Result<(), TwoDaError> {
        let table = TwoDa::new(
            vec!["value".into()],
            vec![
                vec!["12 ".into()],
                vec![" -3rd".into()],
                vec!["+7".into()],
                vec!["-".into()],
                vec!["0.9".into()],
            ],
        )?;
        assert_eq!(table.get_int(0, "value", 0), 12);
        assert_eq!(table.get_int(1, "value", 0), -3);
        assert_eq!(table.get_int(2, "value", 0), 7);
        assert_eq!(table.get_int(3, "value", 5), 5);
        assert!(!table.get_bool(4, "value", true));
        Ok(())
    }

    #[test]
    fn test_row_length_mismatch() {
        let result = TwoDa::new(
            vec!["a".into(), "b".into()],
            vec![vec!["1".into(), "2".into()], vec!["3".into()]],
        );
        assert!(matches!(
            result,
            Err(TwoDaError::RowLength { row: 1, expected: 2, found: 1 })
        ));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_row_out_of_range() {
        appearance().get_string(2, "label", "");
    }

    #[test]
    fn test_bad_signature() {
        let mut data = build_2da(&["a"], &[&["1"]]);
        data[7] = b'a';
        assert!(matches!(
            TwoDaReader::read(&data),
            Err(TwoDaError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_truncated_cells() {
        let mut data = build_2da(&["a", "b"], &[&["1", "2"], &["3", "4"]]);
        data.truncate(data.len() - 3);
        assert!(TwoDaReader::read(&data).is_err());
    }
}
