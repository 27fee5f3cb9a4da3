//! Endianness-aware cursor over a seekable byte source. Every format decoder in this crate reads
//! through a [`BinaryReader`].
//!
//! Reading past the end of the stream fails with a [`binrw::Error`] for which
//! [`binrw::Error::is_eof`] holds; decoders treat that as a fatal format error.

use std::io::{self, Cursor, Read, Seek, SeekFrom};

use binrw::{BinRead, BinResult, Endian};

pub struct BinaryReader<R> {
    inner: R,
    endian: Endian,
}

impl<'a> BinaryReader<Cursor<&'a [u8]>> {
    /// A little-endian reader over an in-memory buffer.
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self::new(Cursor::new(data), Endian::Little)
    }
}

impl<R: Read + Seek> BinaryReader<R> {
    pub fn new(inner: R, endian: Endian) -> Self {
        Self { inner, endian }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn position(&mut self) -> BinResult<u64> {
        Ok(self.inner.stream_position()?)
    }

    pub fn seek(&mut self, pos: SeekFrom) -> BinResult<u64> {
        Ok(self.inner.seek(pos)?)
    }

    pub fn skip(&mut self, count: i64) -> BinResult<u64> {
        self.seek(SeekFrom::Current(count))
    }

    /// Reads any value that needs no arguments, such as a header declared with `#[binread]`.
    pub fn read<T>(&mut self) -> BinResult<T>
    where
        T: for<'b> BinRead<Args<'b> = ()>,
    {
        T::read_options(&mut self.inner, self.endian, ())
    }

    pub fn read_u8(&mut self) -> BinResult<u8> {
        self.read()
    }

    pub fn read_u16(&mut self) -> BinResult<u16> {
        self.read()
    }

    pub fn read_u32(&mut self) -> BinResult<u32> {
        self.read()
    }

    pub fn read_u64(&mut self) -> BinResult<u64> {
        self.read()
    }

    pub fn read_i8(&mut self) -> BinResult<i8> {
        self.read()
    }

    pub fn read_i16(&mut self) -> BinResult<i16> {
        self.read()
    }

    pub fn read_i32(&mut self) -> BinResult<i32> {
        self.read()
    }

    pub fn read_i64(&mut self) -> BinResult<i64> {
        self.read()
    }

    pub fn read_f32(&mut self) -> BinResult<f32> {
        self.read()
    }

    pub fn read_f64(&mut self) -> BinResult<f64> {
        self.read()
    }

    /// Reads exactly `count` bytes.
    pub fn read_bytes(&mut self, count: usize) -> BinResult<Vec<u8>> {
        // `take` keeps a bogus count from allocating more than the stream actually holds
        let mut buffer = Vec::new();
        (&mut self.inner)
            .take(count as u64)
            .read_to_end(&mut buffer)?;
        if buffer.len() != count {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        Ok(buffer)
    }

    /// Reads a fixed-length string field. The value ends at the first NUL, if any.
    pub fn read_string(&mut self, length: usize) -> BinResult<String> {
        let bytes = self.read_bytes(length)?;
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        Ok(decode_string(&bytes[..end]))
    }

    /// Reads a NUL-terminated string, consuming the terminator.
    pub fn read_cstring(&mut self) -> BinResult<String> {
        let mut bytes = vec![];
        loop {
            match self.read_u8()? {
                0 => break,
                byte => bytes.push(byte),
            }
        }
        Ok(decode_string(&bytes))
    }

    pub fn read_u16_array(&mut self, count: usize) -> BinResult<Vec<u16>> {
        self.read_array(count)
    }

    pub fn read_u32_array(&mut self, count: usize) -> BinResult<Vec<u32>> {
        self.read_array(count)
    }

    pub fn read_f32_array(&mut self, count: usize) -> BinResult<Vec<f32>> {
        self.read_array(count)
    }

    pub fn read_array<T>(&mut self, count: usize) -> BinResult<Vec<T>>
    where
        T: for<'b> BinRead<Args<'b> = ()>,
    {
        let mut values = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            values.push(self.read()?);
        }
        Ok(values)
    }

    /// Seeks to `offset`, runs `f`, and restores the previous position whether `f` succeeded or not.
    pub fn read_at<T, F>(&mut self, offset: u64, f: F) -> BinResult<T>
    where
        F: FnOnce(&mut Self) -> BinResult<T>,
    {
        let position = self.position()?;
        self.seek(SeekFrom::Start(offset))?;
        let result = f(self);
        self.seek(SeekFrom::Start(position))?;
        result
    }

    pub fn read_bytes_at(&mut self, offset: u64, count: usize) -> BinResult<Vec<u8>> {
        self.read_at(offset, |reader| reader.read_bytes(count))
    }

    pub fn read_string_at(&mut self, offset: u64, length: usize) -> BinResult<String> {
        self.read_at(offset, |reader| reader.read_string(length))
    }

    pub fn read_cstring_at(&mut self, offset: u64) -> BinResult<String> {
        self.read_at(offset, |reader| reader.read_cstring())
    }

    pub fn read_u32_array_at(&mut self, offset: u64, count: usize) -> BinResult<Vec<u32>> {
        self.read_at(offset, |reader| reader.read_u32_array(count))
    }
}

/// Game strings are single-byte encoded; every byte maps to the code point of the same value.
pub(crate) fn decode_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| *b as char).collect()
}
