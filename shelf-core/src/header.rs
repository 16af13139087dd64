pub mod ident;

use goblin::elf::header::{ET_EXEC, SIZEOF_IDENT};

use crate::reader::FieldReader;
use crate::{Error, Result};
use ident::Identification;

/// The ELF file header, widened to 64-bit fields whatever the source class.
///
/// This is `Elf32_Ehdr` or `Elf64_Ehdr` from the ELF specification with every
/// address and offset stored as `u64`, so nothing downstream has to care which
/// class it came from except where record layouts differ.
///
/// Reference: [ELF Specification v1.2](https://refspecs.linuxfoundation.org/elf/elf.pdf)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// ELF identification bytes, copied verbatim.
    ///
    /// The first 4 bytes are `0x7F`, `'E'`, `'L'`, `'F'`.
    /// The rest encode class (32/64-bit), endianness, version and OS/ABI.
    pub e_ident: [u8; SIZEOF_IDENT],

    /// Object file type (e.g. relocatable, executable, shared, core).
    ///
    /// Common values:
    /// - `ET_NONE` (0): No file type
    /// - `ET_REL` (1): Relocatable file
    /// - `ET_EXEC` (2): Executable file
    /// - `ET_DYN` (3): Shared object
    /// - `ET_CORE` (4): Core dump
    pub e_type: u16,

    /// Target architecture, e.g. `EM_X86_64` (62) or `EM_AARCH64` (183).
    pub e_machine: u16,

    /// ELF version (usually `EV_CURRENT` = 1).
    pub e_version: u32,

    /// Virtual address where execution starts.
    pub e_entry: u64,

    /// File offset of the program header table.
    pub e_phoff: u64,

    /// File offset of the section header table.
    pub e_shoff: u64,

    /// Processor-specific flags.
    pub e_flags: u32,

    /// Size of this header (52 for ELF32, 64 for ELF64).
    pub e_ehsize: u16,

    /// Size of one entry in the program header table.
    pub e_phentsize: u16,

    /// Number of program headers, or `PN_XNUM` when escaped into section 0.
    pub e_phnum: u16,

    /// Size of one entry in the section header table.
    pub e_shentsize: u16,

    /// Number of section headers, or 0 when escaped into section 0.
    pub e_shnum: u16,

    /// Index of the section name string table, or `SHN_XINDEX` when escaped.
    pub e_shstrndx: u16,
}

impl FileHeader {
    /// Decodes the header that follows `ident` at the start of `data`.
    pub fn decode(data: &[u8], ident: &Identification) -> Result<Self> {
        let class = ident.class();
        let needed = class.header_size();
        if data.len() < needed {
            return Err(Error::TruncatedHeader {
                needed,
                len: data.len(),
            });
        }

        let mut cur = FieldReader::new(data, SIZEOF_IDENT as u64, ident.endian(), class);
        let header = FileHeader {
            e_ident: *ident.bytes(),
            e_type: cur.u16()?,
            e_machine: cur.u16()?,
            e_version: cur.u32()?,
            e_entry: cur.word()?,
            e_phoff: cur.word()?,
            e_shoff: cur.word()?,
            e_flags: cur.u32()?,
            e_ehsize: cur.u16()?,
            e_phentsize: cur.u16()?,
            e_phnum: cur.u16()?,
            e_shentsize: cur.u16()?,
            e_shnum: cur.u16()?,
            e_shstrndx: cur.u16()?,
        };

        check_entry_size("program header", header.e_phentsize, class.program_header_size())?;
        check_entry_size("section header", header.e_shentsize, class.section_header_size())?;

        Ok(header)
    }

    pub fn is_executable(&self) -> bool {
        self.e_type == ET_EXEC
    }
}

fn check_entry_size(table: &'static str, found: u16, expected: u16) -> Result<()> {
    if found != 0 && found != expected {
        return Err(Error::InvalidEntrySize {
            table,
            expected,
            found,
        });
    }
    Ok(())
}
