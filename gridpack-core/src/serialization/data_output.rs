//! Growable big-endian output buffer used by the compact encoders.

use bytes::{BufMut, BytesMut};

use crate::error::{CompactError, Result};

/// Trait for writing primitive values in big-endian byte order.
pub trait DataOutput {
    /// Writes a single signed byte.
    fn write_byte(&mut self, value: i8) -> Result<()>;
    /// Writes a boolean as a single byte (1 for true, 0 for false).
    fn write_bool(&mut self, value: bool) -> Result<()>;
    /// Writes a 16-bit signed integer.
    fn write_short(&mut self, value: i16) -> Result<()>;
    /// Writes a 32-bit signed integer.
    fn write_int(&mut self, value: i32) -> Result<()>;
    /// Writes a 64-bit signed integer.
    fn write_long(&mut self, value: i64) -> Result<()>;
    /// Writes a 64-bit unsigned integer.
    fn write_u64(&mut self, value: u64) -> Result<()>;
    /// Writes a 32-bit float.
    fn write_float(&mut self, value: f32) -> Result<()>;
    /// Writes a 64-bit float.
    fn write_double(&mut self, value: f64) -> Result<()>;
    /// Writes raw bytes without a length prefix.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;
    /// Writes a length-prefixed UTF-8 string.
    fn write_string(&mut self, value: &str) -> Result<()>;
}

/// A growable buffer that implements [`DataOutput`].
#[derive(Debug, Default)]
pub struct ObjectDataOutput {
    buffer: BytesMut,
}

impl ObjectDataOutput {
    /// Creates a new empty output buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Creates a new output buffer with the given initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Returns the number of bytes written so far.
    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns the written bytes as a slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the output and returns the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.to_vec()
    }

    /// Appends `count` zero bytes.
    pub fn write_zeros(&mut self, count: usize) -> Result<()> {
        self.buffer.resize(self.buffer.len() + count, 0);
        Ok(())
    }

    /// Overwrites already-written bytes starting at `position`.
    pub fn patch_bytes(&mut self, position: usize, bytes: &[u8]) -> Result<()> {
        let end = position + bytes.len();
        if end > self.buffer.len() {
            return Err(CompactError::Serialization(format!(
                "patch of {} bytes at position {} exceeds buffer length {}",
                bytes.len(),
                position,
                self.buffer.len()
            )));
        }
        self.buffer[position..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Overwrites a previously written 32-bit integer at `position`.
    pub fn patch_int(&mut self, position: usize, value: i32) -> Result<()> {
        self.patch_bytes(position, &value.to_be_bytes())
    }

    /// Sets or clears a single bit within an already-written byte.
    pub fn set_bit(&mut self, position: usize, bit: u8, value: bool) -> Result<()> {
        if position >= self.buffer.len() {
            return Err(CompactError::Serialization(format!(
                "bit patch at position {} exceeds buffer length {}",
                position,
                self.buffer.len()
            )));
        }
        if value {
            self.buffer[position] |= 1 << bit;
        } else {
            self.buffer[position] &= !(1 << bit);
        }
        Ok(())
    }
}

impl DataOutput for ObjectDataOutput {
    fn write_byte(&mut self, value: i8) -> Result<()> {
        self.buffer.put_i8(value);
        Ok(())
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.buffer.put_u8(u8::from(value));
        Ok(())
    }

    fn write_short(&mut self, value: i16) -> Result<()> {
        self.buffer.put_i16(value);
        Ok(())
    }

    fn write_int(&mut self, value: i32) -> Result<()> {
        self.buffer.put_i32(value);
        Ok(())
    }

    fn write_long(&mut self, value: i64) -> Result<()> {
        self.buffer.put_i64(value);
        Ok(())
    }

    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.buffer.put_u64(value);
        Ok(())
    }

    fn write_float(&mut self, value: f32) -> Result<()> {
        self.buffer.put_f32(value);
        Ok(())
    }

    fn write_double(&mut self, value: f64) -> Result<()> {
        self.buffer.put_f64(value);
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.buffer.put_slice(bytes);
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        self.buffer.put_i32(bytes.len() as i32);
        self.buffer.put_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_big_endian_int() {
        let mut out = ObjectDataOutput::new();
        out.write_int(0x0102_0304).unwrap();
        assert_eq!(out.as_bytes(), &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn writes_length_prefixed_string() {
        let mut out = ObjectDataOutput::new();
        out.write_string("hi").unwrap();
        assert_eq!(out.as_bytes(), &[0, 0, 0, 2, b'h', b'i']);
    }

    #[test]
    fn patch_int_overwrites_in_place() {
        let mut out = ObjectDataOutput::new();
        out.write_int(0).unwrap();
        out.write_byte(7).unwrap();
        out.patch_int(0, -1).unwrap();
        assert_eq!(out.as_bytes(), &[0xff, 0xff, 0xff, 0xff, 7]);
    }

    #[test]
    fn patch_past_end_fails() {
        let mut out = ObjectDataOutput::new();
        out.write_byte(0).unwrap();
        assert!(out.patch_int(0, 1).is_err());
    }

    #[test]
    fn set_bit_packs_into_one_byte() {
        let mut out = ObjectDataOutput::new();
        out.write_zeros(1).unwrap();
        out.set_bit(0, 0, true).unwrap();
        out.set_bit(0, 3, true).unwrap();
        assert_eq!(out.as_bytes(), &[0b0000_1001]);
        out.set_bit(0, 0, false).unwrap();
        assert_eq!(out.as_bytes(), &[0b0000_1000]);
    }

    #[test]
    fn write_zeros_extends_buffer() {
        let mut out = ObjectDataOutput::new();
        out.write_zeros(3).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out.as_bytes(), &[0, 0, 0]);
    }
}
