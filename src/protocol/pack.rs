//! Fixed-width payload packing.
//!
//! The protocol embeds a handful of packed value shapes inside frame
//! payloads: 32-bit pairs for paging, a big-endian 16-bit scale, the
//! 20-byte document header and 6-byte facet micro-records. Everything
//! here is sequential and fixed-width.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// Pack two 32-bit values little-endian, e.g. `(offset, limit)`.
pub fn pack_u32_pair(a: u32, b: u32) -> [u8; 8] {
    let mut out = [0u8; 8];
    LittleEndian::write_u32(&mut out[..4], a);
    LittleEndian::write_u32(&mut out[4..], b);
    out
}

/// Pack a 16-bit value big-endian (percent scales on the wire).
pub fn pack_u16_be(v: u16) -> [u8; 2] {
    let mut out = [0u8; 2];
    BigEndian::write_u16(&mut out, v);
    out
}

/// Sequential reader over a packed payload.
pub struct Unpacker<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Unpacker<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Unpacker { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.data.len() - self.pos < n {
            return Err(Error::TruncatedFrame {
                need: self.pos + n,
                have: self.data.len(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16_be(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn u32_le(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn i32_le(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn f32_le(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

/// Read a single little-endian u32 payload (counts and totals).
pub fn unpack_u32(data: &[u8]) -> Result<u32> {
    Unpacker::new(data).u32_le()
}
