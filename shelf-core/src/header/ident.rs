use goblin::elf::header::{
    EI_ABIVERSION, EI_CLASS, EI_DATA, EI_OSABI, EI_VERSION, ELFCLASS32, ELFCLASS64, ELFDATA2LSB,
    ELFDATA2MSB, ELFMAG, SELFMAG, SIZEOF_IDENT,
};

use crate::reader::Endian;
use crate::{Error, Result};

/// Address width of an object, from `EI_CLASS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    Elf32,
    Elf64,
}

impl Class {
    /// The on-disk `EI_CLASS` byte.
    pub fn raw(self) -> u8 {
        match self {
            Class::Elf32 => ELFCLASS32,
            Class::Elf64 => ELFCLASS64,
        }
    }

    pub fn is_64(self) -> bool {
        self == Class::Elf64
    }

    /// Size of `ElfN_Ehdr`.
    pub fn header_size(self) -> usize {
        match self {
            Class::Elf32 => 52,
            Class::Elf64 => 64,
        }
    }

    /// Size of `ElfN_Phdr`.
    pub fn program_header_size(self) -> u16 {
        match self {
            Class::Elf32 => 32,
            Class::Elf64 => 56,
        }
    }

    /// Size of `ElfN_Shdr`.
    pub fn section_header_size(self) -> u16 {
        match self {
            Class::Elf32 => 40,
            Class::Elf64 => 64,
        }
    }

    /// Size of `ElfN_Sym`.
    pub fn symbol_size(self) -> u64 {
        match self {
            Class::Elf32 => 16,
            Class::Elf64 => 24,
        }
    }
}

/// The 16-byte `e_ident` prefix.
///
/// Parsing it settles the class and byte order that every later read depends
/// on, so it is the only place either is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identification {
    bytes: [u8; SIZEOF_IDENT],
    class: Class,
    endian: Endian,
}

impl Identification {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let magic = data.get(..SELFMAG).ok_or(Error::TruncatedHeader {
            needed: SIZEOF_IDENT,
            len: data.len(),
        })?;
        if magic != ELFMAG {
            let mut found = [0u8; SELFMAG];
            found.copy_from_slice(magic);
            return Err(Error::InvalidMagic { found });
        }

        let mut bytes = [0u8; SIZEOF_IDENT];
        bytes.copy_from_slice(data.get(..SIZEOF_IDENT).ok_or(Error::TruncatedHeader {
            needed: SIZEOF_IDENT,
            len: data.len(),
        })?);

        let class = match bytes[EI_CLASS] {
            ELFCLASS32 => Class::Elf32,
            ELFCLASS64 => Class::Elf64,
            other => return Err(Error::UnsupportedClass(other)),
        };
        let endian = match bytes[EI_DATA] {
            ELFDATA2LSB => Endian::Little,
            ELFDATA2MSB => Endian::Big,
            other => return Err(Error::UnsupportedEncoding(other)),
        };

        Ok(Self {
            bytes,
            class,
            endian,
        })
    }

    pub fn class(&self) -> Class {
        self.class
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Raw `EI_DATA` byte.
    pub fn data_encoding(&self) -> u8 {
        self.bytes[EI_DATA]
    }

    /// Raw `EI_VERSION` byte.
    pub fn version(&self) -> u8 {
        self.bytes[EI_VERSION]
    }

    pub fn osabi(&self) -> u8 {
        self.bytes[EI_OSABI]
    }

    pub fn abi_version(&self) -> u8 {
        self.bytes[EI_ABIVERSION]
    }

    pub fn bytes(&self) -> &[u8; SIZEOF_IDENT] {
        &self.bytes
    }
}
