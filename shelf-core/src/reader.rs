//! Bounds-checked, endian-aware extraction of fixed-width integers.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::header::ident::Class;
use crate::{Error, Result};

/// Byte order of every multi-byte field in an object, fixed by `EI_DATA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Little,
    Big,
}

/// Borrows `width` bytes at `offset`, or reports how far the read overshot.
fn field(data: &[u8], offset: u64, width: usize) -> Result<&[u8]> {
    usize::try_from(offset)
        .ok()
        .and_then(|start| Some(start..start.checked_add(width)?))
        .and_then(|range| data.get(range))
        .ok_or(Error::OutOfBounds {
            offset,
            width,
            len: data.len(),
        })
}

/// Whether `size` bytes starting at `offset` lie within a `len`-byte image.
pub(crate) fn span_fits(len: usize, offset: u64, size: u64) -> bool {
    offset
        .checked_add(size)
        .is_some_and(|end| end <= len as u64)
}

impl Endian {
    pub fn read_u8(self, data: &[u8], offset: u64) -> Result<u8> {
        Ok(field(data, offset, 1)?[0])
    }

    pub fn read_u16(self, data: &[u8], offset: u64) -> Result<u16> {
        let bytes = field(data, offset, 2)?;
        Ok(match self {
            Endian::Little => LittleEndian::read_u16(bytes),
            Endian::Big => BigEndian::read_u16(bytes),
        })
    }

    pub fn read_u32(self, data: &[u8], offset: u64) -> Result<u32> {
        let bytes = field(data, offset, 4)?;
        Ok(match self {
            Endian::Little => LittleEndian::read_u32(bytes),
            Endian::Big => BigEndian::read_u32(bytes),
        })
    }

    pub fn read_u64(self, data: &[u8], offset: u64) -> Result<u64> {
        let bytes = field(data, offset, 8)?;
        Ok(match self {
            Endian::Little => LittleEndian::read_u64(bytes),
            Endian::Big => BigEndian::read_u64(bytes),
        })
    }
}

/// Sequential reader over one on-disk record.
///
/// Every record in an ELF file is a run of packed fields, so decoders walk a
/// cursor forward instead of computing each field offset by hand. Fields whose
/// width depends on the class (`Elf32_Addr` vs `Elf64_Addr`) are read with
/// [`FieldReader::word`] and widened to 64 bits.
#[derive(Debug, Clone)]
pub(crate) struct FieldReader<'a> {
    data: &'a [u8],
    pos: u64,
    endian: Endian,
    class: Class,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(data: &'a [u8], pos: u64, endian: Endian, class: Class) -> Self {
        Self {
            data,
            pos,
            endian,
            class,
        }
    }

    pub(crate) fn class(&self) -> Class {
        self.class
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        let value = self.endian.read_u8(self.data, self.pos)?;
        self.pos += 1;
        Ok(value)
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        let value = self.endian.read_u16(self.data, self.pos)?;
        self.pos += 2;
        Ok(value)
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        let value = self.endian.read_u32(self.data, self.pos)?;
        self.pos += 4;
        Ok(value)
    }

    pub(crate) fn u64(&mut self) -> Result<u64> {
        let value = self.endian.read_u64(self.data, self.pos)?;
        self.pos += 8;
        Ok(value)
    }

    /// Address, offset or size field: 32 bits on ELF32, 64 bits on ELF64.
    pub(crate) fn word(&mut self) -> Result<u64> {
        match self.class {
            Class::Elf32 => self.u32().map(u64::from),
            Class::Elf64 => self.u64(),
        }
    }
}
