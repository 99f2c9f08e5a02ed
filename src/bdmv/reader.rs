use crate::bdmv::error::{BdmvError, BdmvResult};
use byteorder::{BigEndian, ByteOrder};

/// Big-endian cursor over an immutable byte slice.
///
/// Every successful read advances the cursor; a failed guard leaves it
/// untouched and reports the offending offset and requested length.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current read position.
    pub fn tell(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes from the current position.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Set the read position to an absolute offset.
    pub fn seek(&mut self, offset: usize) -> BdmvResult<()> {
        if offset > self.data.len() {
            return Err(BdmvError::BoundsError {
                offset,
                want: 0,
                remaining: 0,
            });
        }
        self.pos = offset;
        Ok(())
    }

    /// Advance the read position by `n` bytes.
    pub fn skip(&mut self, n: usize) -> BdmvResult<()> {
        self.require(n)?;
        self.pos += n;
        Ok(())
    }

    /// Fail with a bounds error if fewer than `n` bytes remain.
    pub fn require(&self, n: usize) -> BdmvResult<()> {
        if self.remaining() < n {
            return Err(BdmvError::BoundsError {
                offset: self.pos,
                want: n,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    /// A new reader over `[offset, offset + length)` without copying.
    ///
    /// The parent cursor is unaffected.
    pub fn slice(&self, offset: usize, length: usize) -> BdmvResult<BinaryReader<'a>> {
        if offset.checked_add(length).map_or(true, |end| end > self.data.len()) {
            return Err(BdmvError::BoundsError {
                offset,
                want: length,
                remaining: self.data.len().saturating_sub(offset),
            });
        }
        Ok(BinaryReader::new(&self.data[offset..offset + length]))
    }

    /// Read `n` raw bytes and advance the cursor.
    pub fn read_bytes(&mut self, n: usize) -> BdmvResult<&'a [u8]> {
        self.require(n)?;
        let result = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(result)
    }

    pub fn u8(&mut self) -> BdmvResult<u8> {
        self.require(1)?;
        let value = self.data[self.pos];
        self.pos += 1;
        Ok(value)
    }

    pub fn u16(&mut self) -> BdmvResult<u16> {
        self.require(2)?;
        let value = BigEndian::read_u16(&self.data[self.pos..]);
        self.pos += 2;
        Ok(value)
    }

    pub fn u32(&mut self) -> BdmvResult<u32> {
        self.require(4)?;
        let value = BigEndian::read_u32(&self.data[self.pos..]);
        self.pos += 4;
        Ok(value)
    }

    pub fn u64(&mut self) -> BdmvResult<u64> {
        self.require(8)?;
        let value = BigEndian::read_u64(&self.data[self.pos..]);
        self.pos += 8;
        Ok(value)
    }

    /// Read `n` bytes and decode as ASCII, dropping NUL padding.
    pub fn read_string(&mut self, n: usize) -> BdmvResult<String> {
        let bytes = self.read_bytes(n)?;
        Ok(bytes
            .iter()
            .filter(|&&b| b != 0)
            .map(|&b| b as char)
            .collect())
    }
}
