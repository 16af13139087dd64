//! Human-readable names for the numeric fields of an ELF object.
//!
//! Unknown values are rendered as `<unknown: 0x..>` into a fresh string per
//! call, so results never alias each other.

use std::borrow::Cow;

use goblin::elf::header::{
    ELFCLASS32, ELFCLASS64, ELFCLASSNONE, ELFDATA2LSB, ELFDATA2MSB, ELFDATANONE, ET_CORE, ET_DYN,
    ET_EXEC, ET_NONE, ET_REL,
};
use goblin::elf::program_header::{
    PF_R, PF_W, PF_X, PT_DYNAMIC, PT_GNU_EH_FRAME, PT_GNU_RELRO, PT_GNU_STACK, PT_INTERP,
    PT_LOAD, PT_NOTE, PT_NULL, PT_PHDR, PT_SHLIB, PT_TLS,
};
use goblin::elf::section_header::{
    SHF_ALLOC, SHF_COMPRESSED, SHF_EXCLUDE, SHF_EXECINSTR, SHF_GROUP, SHF_INFO_LINK,
    SHF_LINK_ORDER, SHF_MERGE, SHF_OS_NONCONFORMING, SHF_STRINGS, SHF_TLS, SHF_WRITE,
    SHT_DYNAMIC, SHT_DYNSYM, SHT_FINI_ARRAY, SHT_GROUP, SHT_HASH, SHT_INIT_ARRAY, SHT_NOBITS,
    SHT_NOTE, SHT_NULL, SHT_PREINIT_ARRAY, SHT_PROGBITS, SHT_REL, SHT_RELA, SHT_SHLIB,
    SHT_STRTAB, SHT_SYMTAB, SHT_SYMTAB_SHNDX,
};
use goblin::elf::sym::{
    STB_GLOBAL, STB_LOCAL, STB_WEAK, STT_COMMON, STT_FILE, STT_FUNC, STT_NOTYPE, STT_OBJECT,
    STT_SECTION, STT_TLS, STV_DEFAULT, STV_HIDDEN, STV_INTERNAL, STV_PROTECTED,
};

// GNU and Sun extensions.
const PT_GNU_PROPERTY: u32 = 0x6474_e553;
const SHT_GNU_ATTRIBUTES: u32 = 0x6fff_fff5;
const SHT_GNU_HASH: u32 = 0x6fff_fff6;
const SHT_GNU_LIBLIST: u32 = 0x6fff_fff7;
const SHT_CHECKSUM: u32 = 0x6fff_fff8;
const SHT_SUNW_MOVE: u32 = 0x6fff_fffa;
const SHT_SUNW_COMDAT: u32 = 0x6fff_fffb;
const SHT_SUNW_SYMINFO: u32 = 0x6fff_fffc;
const SHT_GNU_VERDEF: u32 = 0x6fff_fffd;
const SHT_GNU_VERNEED: u32 = 0x6fff_fffe;
const SHT_GNU_VERSYM: u32 = 0x6fff_ffff;
const STB_GNU_UNIQUE: u8 = 10;
const STT_GNU_IFUNC: u8 = 10;

fn unknown(value: impl Into<u64>) -> Cow<'static, str> {
    Cow::Owned(format!("<unknown: 0x{:02x}>", value.into()))
}

/// `EI_CLASS`.
pub fn class_str(class: u8) -> Cow<'static, str> {
    match class {
        ELFCLASSNONE => "none".into(),
        ELFCLASS32 => "ELF32".into(),
        ELFCLASS64 => "ELF64".into(),
        other => unknown(other),
    }
}

/// `EI_DATA`.
pub fn data_encoding_str(encoding: u8) -> Cow<'static, str> {
    match encoding {
        ELFDATANONE => "none".into(),
        ELFDATA2LSB => "2's complement, little endian".into(),
        ELFDATA2MSB => "2's complement, big endian".into(),
        other => unknown(other),
    }
}

/// `EI_VERSION` or `e_version`.
pub fn elf_version_str(version: u32) -> Cow<'static, str> {
    match version {
        0 => "0 (none)".into(),
        1 => "1 (current)".into(),
        other => unknown(other),
    }
}

/// `EI_OSABI`.
pub fn osabi_str(osabi: u8) -> Cow<'static, str> {
    let name = match osabi {
        0 => "UNIX - System V",
        1 => "HP-UX",
        2 => "NetBSD",
        3 => "Linux",
        4 => "GNU/Hurd",
        6 => "Sun Solaris",
        7 => "AIX",
        8 => "IRIX",
        9 => "FreeBSD",
        10 => "Compaq TRU64 UNIX",
        11 => "Novell Modesto",
        12 => "OpenBSD",
        13 => "OpenVMS",
        14 => "HP Non-Stop Kernel",
        15 => "AROS",
        16 => "FenixOS",
        17 => "Nuxi CloudABI",
        97 => "ARM",
        255 => "Standalone App",
        other => return unknown(other),
    };
    name.into()
}

/// `e_type`.
pub fn file_type_str(e_type: u16) -> Cow<'static, str> {
    match e_type {
        ET_NONE => "NONE (None)".into(),
        ET_REL => "REL (Relocatable file)".into(),
        ET_EXEC => "EXEC (Executable file)".into(),
        ET_DYN => "DYN (Shared object file)".into(),
        ET_CORE => "CORE (Core file)".into(),
        other => unknown(other),
    }
}

/// `e_machine`.
pub fn machine_str(machine: u16) -> Cow<'static, str> {
    let name = match machine {
        0 => "No machine",
        1 => "AT&T WE 32100",
        2 => "SPARC",
        3 => "Intel 80386",
        4 => "Motorola 68000",
        5 => "Motorola 88000",
        7 => "Intel 80860",
        8 => "MIPS I Architecture",
        9 => "IBM System/370 Processor",
        10 => "MIPS RS3000 Little-endian",
        15 => "Hewlett-Packard PA-RISC",
        17 => "Fujitsu VPP500",
        18 => "Enhanced instruction set SPARC",
        19 => "Intel 80960",
        20 => "PowerPC",
        21 => "64-bit PowerPC",
        22 => "IBM System/390 Processor",
        36 => "NEC V800",
        37 => "Fujitsu FR20",
        38 => "TRW RH-32",
        39 => "Motorola RCE",
        40 => "ARM",
        41 => "Digital Alpha",
        42 => "Hitachi SH",
        43 => "SPARC Version 9",
        44 => "Siemens TriCore embedded processor",
        45 => "Argonaut RISC Core",
        46 => "Hitachi H8/300",
        47 => "Hitachi H8/300H",
        48 => "Hitachi H8S",
        49 => "Hitachi H8/500",
        50 => "Intel IA-64 processor architecture",
        51 => "Stanford MIPS-X",
        52 => "Motorola ColdFire",
        53 => "Motorola M68HC12",
        54 => "Fujitsu MMA Multimedia Accelerator",
        55 => "Siemens PCP",
        56 => "Sony nCPU embedded RISC processor",
        57 => "Denso NDR1 microprocessor",
        58 => "Motorola Star*Core processor",
        59 => "Toyota ME16 processor",
        60 => "STMicroelectronics ST100 processor",
        61 => "Advanced Logic Corp. TinyJ embedded processor family",
        62 => "Advanced Micro Devices X86-64",
        63 => "Sony DSP Processor",
        64 => "Digital Equipment Corp. PDP-10",
        65 => "Digital Equipment Corp. PDP-11",
        66 => "Siemens FX66 microcontroller",
        67 => "STMicroelectronics ST9+ 8/16 bit microcontroller",
        68 => "STMicroelectronics ST7 8-bit microcontroller",
        69 => "Motorola MC68HC16 Microcontroller",
        70 => "Motorola MC68HC11 Microcontroller",
        71 => "Motorola MC68HC08 Microcontroller",
        72 => "Motorola MC68HC05 Microcontroller",
        73 => "Silicon Graphics SVx",
        74 => "STMicroelectronics ST19 8-bit microcontroller",
        75 => "Digital VAX",
        76 => "Axis Communications 32-bit embedded processor",
        77 => "Infineon Technologies 32-bit embedded processor",
        78 => "Element 14 64-bit DSP Processor",
        79 => "LSI Logic 16-bit DSP Processor",
        80 => "Donald Knuth's educational 64-bit processor",
        81 => "Harvard University machine-independent object files",
        82 => "SiTera Prism",
        83 => "Atmel AVR 8-bit microcontroller",
        84 => "Fujitsu FR30",
        85 => "Mitsubishi D10V",
        86 => "Mitsubishi D30V",
        87 => "NEC v850",
        88 => "Mitsubishi M32R",
        89 => "Matsushita MN10300",
        90 => "Matsushita MN10200",
        91 => "picoJava",
        92 => "OpenRISC 32-bit embedded processor",
        93 => "ARC Cores Tangent-A5",
        94 => "Tensilica Xtensa Architecture",
        95 => "Alphamosaic VideoCore processor",
        96 => "Thompson Multimedia General Purpose Processor",
        97 => "National Semiconductor 32000 series",
        98 => "Tenor Network TPC processor",
        99 => "Trebia SNP 1000 processor",
        100 => "STMicroelectronics ST200 microcontroller",
        183 => "AArch64",
        243 => "RISC-V",
        247 => "Linux BPF",
        258 => "LoongArch",
        other => return unknown(other),
    };
    name.into()
}

/// `p_type`.
pub fn phdr_type_str(p_type: u32) -> Cow<'static, str> {
    let name = match p_type {
        PT_NULL => "NULL",
        PT_LOAD => "LOAD",
        PT_DYNAMIC => "DYNAMIC",
        PT_INTERP => "INTERP",
        PT_NOTE => "NOTE",
        PT_SHLIB => "SHLIB",
        PT_PHDR => "PHDR",
        PT_TLS => "TLS",
        PT_GNU_EH_FRAME => "GNU_EH_FRAME",
        PT_GNU_STACK => "GNU_STACK",
        PT_GNU_RELRO => "GNU_RELRO",
        PT_GNU_PROPERTY => "GNU_PROPERTY",
        0x6000_0000..=0x6fff_ffff => return format!("LOOS+{:#x}", p_type - 0x6000_0000).into(),
        0x7000_0000..=0x7fff_ffff => return format!("LOPROC+{:#x}", p_type - 0x7000_0000).into(),
        other => return unknown(other),
    };
    name.into()
}

/// `p_flags` as an `RWX` triplet, `-` for each clear bit.
pub fn phdr_flags_str(p_flags: u32) -> String {
    [(PF_R, 'R'), (PF_W, 'W'), (PF_X, 'X')]
        .iter()
        .map(|&(bit, c)| if p_flags & bit != 0 { c } else { '-' })
        .collect()
}

/// `sh_type`.
pub fn shdr_type_str(sh_type: u32) -> Cow<'static, str> {
    let name = match sh_type {
        SHT_NULL => "NULL",
        SHT_PROGBITS => "PROGBITS",
        SHT_SYMTAB => "SYMTAB",
        SHT_STRTAB => "STRTAB",
        SHT_RELA => "RELA",
        SHT_HASH => "HASH",
        SHT_DYNAMIC => "DYNAMIC",
        SHT_NOTE => "NOTE",
        SHT_NOBITS => "NOBITS",
        SHT_REL => "REL",
        SHT_SHLIB => "SHLIB",
        SHT_DYNSYM => "DYNSYM",
        SHT_INIT_ARRAY => "INIT_ARRAY",
        SHT_FINI_ARRAY => "FINI_ARRAY",
        SHT_PREINIT_ARRAY => "PREINIT_ARRAY",
        SHT_GROUP => "GROUP",
        SHT_SYMTAB_SHNDX => "SYMTAB_SHNDX",
        SHT_GNU_ATTRIBUTES => "GNU_ATTRIBUTES",
        SHT_GNU_HASH => "GNU_HASH",
        SHT_GNU_LIBLIST => "GNU_LIBLIST",
        SHT_CHECKSUM => "CHECKSUM",
        SHT_SUNW_MOVE => "SUNW_move",
        SHT_SUNW_COMDAT => "SUNW_COMDAT",
        SHT_SUNW_SYMINFO => "SUNW_syminfo",
        SHT_GNU_VERDEF => "VERDEF",
        SHT_GNU_VERNEED => "VERNEED",
        SHT_GNU_VERSYM => "VERSYM",
        0x6000_0000..=0x6fff_ffff => return format!("LOOS+{:#x}", sh_type - 0x6000_0000).into(),
        0x7000_0000..=0x7fff_ffff => return format!("LOPROC+{:#x}", sh_type - 0x7000_0000).into(),
        0x8000_0000..=0xffff_ffff => return format!("LOUSER+{:#x}", sh_type - 0x8000_0000).into(),
        other => return unknown(other),
    };
    name.into()
}

const SECTION_FLAG_LETTERS: [(u32, char); 12] = [
    (SHF_WRITE, 'W'),
    (SHF_ALLOC, 'A'),
    (SHF_EXECINSTR, 'X'),
    (SHF_MERGE, 'M'),
    (SHF_STRINGS, 'S'),
    (SHF_INFO_LINK, 'I'),
    (SHF_LINK_ORDER, 'L'),
    (SHF_OS_NONCONFORMING, 'O'),
    (SHF_GROUP, 'G'),
    (SHF_TLS, 'T'),
    (SHF_COMPRESSED, 'C'),
    (SHF_EXCLUDE, 'E'),
];

/// `sh_flags` as `readelf`'s letter code, one letter per set bit in bit order.
pub fn shdr_flags_str(sh_flags: u64) -> String {
    SECTION_FLAG_LETTERS
        .iter()
        .filter(|&&(bit, _)| sh_flags & u64::from(bit) != 0)
        .map(|&(_, c)| c)
        .collect()
}

/// `STB_*` binding.
pub fn symbol_bind_str(bind: u8) -> Cow<'static, str> {
    match bind {
        STB_LOCAL => "LOCAL".into(),
        STB_GLOBAL => "GLOBAL".into(),
        STB_WEAK => "WEAK".into(),
        STB_GNU_UNIQUE => "UNIQUE".into(),
        other => unknown(other),
    }
}

/// `STT_*` type.
pub fn symbol_type_str(kind: u8) -> Cow<'static, str> {
    match kind {
        STT_NOTYPE => "NOTYPE".into(),
        STT_OBJECT => "OBJECT".into(),
        STT_FUNC => "FUNC".into(),
        STT_SECTION => "SECTION".into(),
        STT_FILE => "FILE".into(),
        STT_COMMON => "COMMON".into(),
        STT_TLS => "TLS".into(),
        STT_GNU_IFUNC => "IFUNC".into(),
        other => unknown(other),
    }
}

/// `STV_*` visibility.
pub fn symbol_visibility_str(visibility: u8) -> Cow<'static, str> {
    match visibility {
        STV_DEFAULT => "DEFAULT".into(),
        STV_INTERNAL => "INTERNAL".into(),
        STV_HIDDEN => "HIDDEN".into(),
        STV_PROTECTED => "PROTECTED".into(),
        other => unknown(other),
    }
}
