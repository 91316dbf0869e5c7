use byteorder::{ByteOrder, LittleEndian};

use crate::error::SourceQueryError;

/// Sequential little-endian reader over a received datagram.
///
/// Every read is bounds checked; running off the end of the buffer yields
/// [SourceQueryError::UnexpectedEof] instead of a zero value.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        PacketReader { data, offset: 0 }
    }

    /// Current cursor offset into the buffer.
    pub fn pos(&self) -> usize {
        self.offset
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Take `len` raw bytes, advancing the cursor past them.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], SourceQueryError> {
        if self.remaining() < len {
            return Err(SourceQueryError::UnexpectedEof {
                offset: self.offset,
                needed: len,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, SourceQueryError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, SourceQueryError> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, SourceQueryError> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32, SourceQueryError> {
        Ok(LittleEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64, SourceQueryError> {
        Ok(LittleEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn read_f32(&mut self) -> Result<f32, SourceQueryError> {
        Ok(LittleEndian::read_f32(self.read_bytes(4)?))
    }

    /// Get the value of a null-terminated string starting at the cursor.
    ///
    /// Moves the cursor to the byte after the terminator. A string with no
    /// terminator before the end of the buffer is an error. Invalid UTF-8 is
    /// replaced rather than rejected, servers are free to send any bytes here.
    pub fn read_string(&mut self) -> Result<String, SourceQueryError> {
        let rest = &self.data[self.offset..];
        let len = rest
            .iter()
            .position(|&c| c == 0)
            .ok_or(SourceQueryError::UnexpectedEof {
                offset: self.offset,
                needed: rest.len() + 1,
                remaining: rest.len(),
            })?;
        let value = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.offset += len + 1;
        Ok(value)
    }
}
