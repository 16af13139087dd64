use goblin::elf::program_header::{PF_R, PF_W, PF_X, PT_LOAD};

use crate::header::ident::{Class, Identification};
use crate::reader::{span_fits, FieldReader};
use crate::{Error, Result};

/// One program header (segment), widened to 64-bit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramHeader {
    pub p_type: u32,
    pub p_flags: u32,
    pub p_offset: u64,
    pub p_vaddr: u64,
    pub p_paddr: u64,
    pub p_filesz: u64,
    pub p_memsz: u64,
    pub p_align: u64,
}

impl ProgramHeader {
    fn decode(cur: &mut FieldReader<'_>) -> Result<Self> {
        // ELF64 moves p_flags up next to p_type to keep the 64-bit fields aligned.
        match cur.class() {
            Class::Elf32 => {
                let p_type = cur.u32()?;
                let p_offset = cur.word()?;
                let p_vaddr = cur.word()?;
                let p_paddr = cur.word()?;
                let p_filesz = cur.word()?;
                let p_memsz = cur.word()?;
                let p_flags = cur.u32()?;
                let p_align = cur.word()?;
                Ok(Self {
                    p_type,
                    p_flags,
                    p_offset,
                    p_vaddr,
                    p_paddr,
                    p_filesz,
                    p_memsz,
                    p_align,
                })
            }
            Class::Elf64 => Ok(Self {
                p_type: cur.u32()?,
                p_flags: cur.u32()?,
                p_offset: cur.word()?,
                p_vaddr: cur.word()?,
                p_paddr: cur.word()?,
                p_filesz: cur.word()?,
                p_memsz: cur.word()?,
                p_align: cur.word()?,
            }),
        }
    }

    pub fn is_load(&self) -> bool {
        self.p_type == PT_LOAD
    }

    pub fn is_readable(&self) -> bool {
        self.p_flags & PF_R != 0
    }

    pub fn is_writable(&self) -> bool {
        self.p_flags & PF_W != 0
    }

    pub fn is_executable(&self) -> bool {
        self.p_flags & PF_X != 0
    }

    /// Whether `addr` falls in `[p_vaddr, p_vaddr + p_memsz)`.
    pub fn contains_address(&self, addr: u64) -> bool {
        addr >= self.p_vaddr && addr - self.p_vaddr < self.p_memsz
    }
}

/// Decodes `count` program headers of `entsize` bytes starting at `offset`.
pub(crate) fn decode_table(
    data: &[u8],
    ident: &Identification,
    offset: u64,
    count: u64,
    entsize: u16,
) -> Result<Vec<ProgramHeader>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    if entsize == 0 {
        return Err(Error::InvalidEntrySize {
            table: "program header",
            expected: ident.class().program_header_size(),
            found: 0,
        });
    }

    let fits = count
        .checked_mul(u64::from(entsize))
        .is_some_and(|size| span_fits(data.len(), offset, size));
    if !fits {
        return Err(Error::TruncatedProgramHeaders {
            offset,
            count,
            entsize,
            len: data.len(),
        });
    }

    let mut table = Vec::with_capacity(count as usize);
    for i in 0..count {
        let at = offset + i * u64::from(entsize);
        let mut cur = FieldReader::new(data, at, ident.endian(), ident.class());
        let phdr = ProgramHeader::decode(&mut cur)?;

        if phdr.is_load()
            && phdr.p_filesz != 0
            && !span_fits(data.len(), phdr.p_offset, phdr.p_filesz)
        {
            return Err(Error::SegmentOutOfBounds { index: i as usize });
        }
        table.push(phdr);
    }

    log::debug!("Decoded {} program headers at {:#x}", table.len(), offset);
    Ok(table)
}
