//! Bounds-checked big-endian input cursor used by the compact decoders.

use std::io::Cursor;

use bytes::Buf;

use crate::error::{CompactError, Result};

/// Trait for reading primitive values in big-endian byte order.
pub trait DataInput {
    /// Reads a single signed byte.
    fn read_byte(&mut self) -> Result<i8>;
    /// Reads a boolean from a single byte.
    fn read_bool(&mut self) -> Result<bool>;
    /// Reads a 16-bit signed integer.
    fn read_short(&mut self) -> Result<i16>;
    /// Reads a 32-bit signed integer.
    fn read_int(&mut self) -> Result<i32>;
    /// Reads a 64-bit signed integer.
    fn read_long(&mut self) -> Result<i64>;
    /// Reads a 64-bit unsigned integer.
    fn read_u64(&mut self) -> Result<u64>;
    /// Reads a 32-bit float.
    fn read_float(&mut self) -> Result<f32>;
    /// Reads a 64-bit float.
    fn read_double(&mut self) -> Result<f64>;
    /// Reads exactly `len` raw bytes.
    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>>;
    /// Reads a length-prefixed UTF-8 string.
    fn read_string(&mut self) -> Result<String>;
}

/// A cursor over a byte slice that implements [`DataInput`].
#[derive(Debug)]
pub struct ObjectDataInput<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ObjectDataInput<'a> {
    /// Creates a new input cursor over the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    /// Returns the current read position.
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    /// Moves the read position to `position`.
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.cursor.get_ref().len() {
            return Err(CompactError::Serialization(format!(
                "position {} exceeds input length {}",
                position,
                self.cursor.get_ref().len()
            )));
        }
        self.cursor.set_position(position as u64);
        Ok(())
    }

    /// Advances the read position by `count` bytes.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.ensure_remaining(count)?;
        let position = self.cursor.position() + count as u64;
        self.cursor.set_position(position);
        Ok(())
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    fn ensure_remaining(&self, needed: usize) -> Result<()> {
        if self.cursor.remaining() < needed {
            return Err(CompactError::Serialization(format!(
                "unexpected end of input: needed {} bytes, {} remaining",
                needed,
                self.cursor.remaining()
            )));
        }
        Ok(())
    }
}

impl DataInput for ObjectDataInput<'_> {
    fn read_byte(&mut self) -> Result<i8> {
        self.ensure_remaining(1)?;
        Ok(self.cursor.get_i8())
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.ensure_remaining(1)?;
        Ok(self.cursor.get_u8() != 0)
    }

    fn read_short(&mut self) -> Result<i16> {
        self.ensure_remaining(2)?;
        Ok(self.cursor.get_i16())
    }

    fn read_int(&mut self) -> Result<i32> {
        self.ensure_remaining(4)?;
        Ok(self.cursor.get_i32())
    }

    fn read_long(&mut self) -> Result<i64> {
        self.ensure_remaining(8)?;
        Ok(self.cursor.get_i64())
    }

    fn read_u64(&mut self) -> Result<u64> {
        self.ensure_remaining(8)?;
        Ok(self.cursor.get_u64())
    }

    fn read_float(&mut self) -> Result<f32> {
        self.ensure_remaining(4)?;
        Ok(self.cursor.get_f32())
    }

    fn read_double(&mut self) -> Result<f64> {
        self.ensure_remaining(8)?;
        Ok(self.cursor.get_f64())
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.ensure_remaining(len)?;
        let mut bytes = vec![0u8; len];
        self.cursor.copy_to_slice(&mut bytes);
        Ok(bytes)
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self.read_int()?;
        if len < 0 {
            return Err(CompactError::Serialization(format!(
                "negative string length: {len}"
            )));
        }
        let bytes = self.read_bytes(len as usize)?;
        String::from_utf8(bytes)
            .map_err(|e| CompactError::Serialization(format!("invalid UTF-8 string: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_int() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut input = ObjectDataInput::new(&data);
        assert_eq!(input.read_int().unwrap(), 0x0102_0304);
    }

    #[test]
    fn reads_length_prefixed_string() {
        let data = [0, 0, 0, 2, b'h', b'i'];
        let mut input = ObjectDataInput::new(&data);
        assert_eq!(input.read_string().unwrap(), "hi");
    }

    #[test]
    fn read_past_end_fails() {
        let data = [0x01];
        let mut input = ObjectDataInput::new(&data);
        assert!(input.read_int().is_err());
    }

    #[test]
    fn negative_string_length_fails() {
        let data = [0xff, 0xff, 0xff, 0xff];
        let mut input = ObjectDataInput::new(&data);
        assert!(input.read_string().is_err());
    }

    #[test]
    fn set_position_and_skip() {
        let data = [1, 2, 3, 4, 5];
        let mut input = ObjectDataInput::new(&data);
        input.set_position(3).unwrap();
        assert_eq!(input.read_byte().unwrap(), 4);
        input.set_position(0).unwrap();
        input.skip(4).unwrap();
        assert_eq!(input.read_byte().unwrap(), 5);
        assert!(input.skip(1).is_err());
        assert!(input.set_position(6).is_err());
    }

    #[test]
    fn invalid_utf8_fails() {
        let data = [0, 0, 0, 2, 0xff, 0xfe];
        let mut input = ObjectDataInput::new(&data);
        assert!(input.read_string().is_err());
    }
}
