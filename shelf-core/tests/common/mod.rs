//! Hand-assembled ELF images for integration tests.
//!
//! Each image is a small executable: one PT_LOAD segment over `.text`, plus
//! `.data`, `.bss`, optionally `.symtab`/`.strtab`, and `.shstrtab`.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

pub const ENTRY: u64 = 0x1000;
pub const TEXT_ADDR: u64 = 0x1000;
pub const TEXT_SIZE: u64 = 0x20;
pub const DATA_ADDR: u64 = 0x2000;
pub const DATA_SIZE: u64 = 0x10;
pub const BSS_ADDR: u64 = 0x2010;
pub const BSS_SIZE: u64 = 0x100;

pub const HELPER_ADDR: u64 = 0x1010;
pub const COUNTER_ADDR: u64 = 0x2000;

const SHT_PROGBITS: u32 = 1;
const SHT_SYMTAB: u32 = 2;
const SHT_STRTAB: u32 = 3;
const SHT_NOBITS: u32 = 8;

#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub class64: bool,
    pub big_endian: bool,
    pub with_symbols: bool,
    /// Store the section count and name table index in section header 0.
    pub escaped: bool,
}

impl Options {
    pub fn new(class64: bool, big_endian: bool) -> Self {
        Self {
            class64,
            big_endian,
            with_symbols: true,
            escaped: false,
        }
    }

    pub fn stripped(mut self) -> Self {
        self.with_symbols = false;
        self
    }

    pub fn escaped(mut self) -> Self {
        self.escaped = true;
        self
    }

    pub fn ehsize(&self) -> u64 {
        if self.class64 { 64 } else { 52 }
    }

    pub fn phentsize(&self) -> u64 {
        if self.class64 { 56 } else { 32 }
    }

    pub fn shentsize(&self) -> u64 {
        if self.class64 { 64 } else { 40 }
    }

    pub fn symsize(&self) -> u64 {
        if self.class64 { 24 } else { 16 }
    }

    /// `e_machine` for the combination: x86-64, PPC64, i386 or MIPS.
    pub fn machine(&self) -> u16 {
        match (self.class64, self.big_endian) {
            (true, false) => 62,
            (true, true) => 21,
            (false, false) => 3,
            (false, true) => 8,
        }
    }
}

/// Every class/endianness combination.
pub fn all_layouts() -> Vec<Options> {
    vec![
        Options::new(true, false),
        Options::new(true, true),
        Options::new(false, false),
        Options::new(false, true),
    ]
}

#[derive(Debug, Clone)]
pub struct Fixture {
    pub opts: Options,
    pub bytes: Vec<u8>,
    pub text_off: u64,
    pub data_off: u64,
    pub symtab_off: u64,
    pub shoff: u64,
    pub section_names: Vec<&'static str>,
}

impl Fixture {
    pub fn shnum(&self) -> usize {
        self.section_names.len()
    }

    pub fn section_index(&self, name: &str) -> usize {
        self.section_names
            .iter()
            .position(|&n| n == name)
            .expect("fixture section")
    }

    /// Offset of field `e_shnum` in the file header.
    pub fn e_shnum_offset(&self) -> usize {
        if self.opts.class64 { 60 } else { 48 }
    }

    pub fn e_phnum_offset(&self) -> usize {
        if self.opts.class64 { 56 } else { 44 }
    }

    pub fn e_shstrndx_offset(&self) -> usize {
        if self.opts.class64 { 62 } else { 50 }
    }

    pub fn set_u16(&mut self, offset: usize, value: u16) {
        let bytes = if self.opts.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        self.bytes[offset..offset + 2].copy_from_slice(&bytes);
    }

    fn section_field(&self, index: usize, field: usize) -> usize {
        (self.shoff + index as u64 * self.opts.shentsize()) as usize + field
    }

    fn patch(&mut self, at: usize, w: Writer) {
        let len = w.buf.len();
        self.bytes[at..at + len].copy_from_slice(&w.buf);
    }

    /// Overwrites `sh_type` of section `index`.
    pub fn set_section_type(&mut self, index: usize, sh_type: u32) {
        let at = self.section_field(index, 4);
        let mut w = Writer::new(self.opts);
        w.u32(sh_type);
        self.patch(at, w);
    }

    /// Overwrites `sh_offset` of section `index`, truncated to 32 bits on ELF32.
    pub fn set_section_offset(&mut self, index: usize, offset: u64) {
        let at = self.section_field(index, if self.opts.class64 { 24 } else { 16 });
        let mut w = Writer::new(self.opts);
        w.word(offset);
        self.patch(at, w);
    }

    /// Overwrites `sh_size` of section `index`, truncated to 32 bits on ELF32.
    pub fn set_section_size(&mut self, index: usize, size: u64) {
        let at = self.section_field(index, if self.opts.class64 { 32 } else { 20 });
        let mut w = Writer::new(self.opts);
        w.word(size);
        self.patch(at, w);
    }
}

struct Writer {
    buf: Vec<u8>,
    opts: Options,
}

impl Writer {
    fn new(opts: Options) -> Self {
        Self {
            buf: Vec::new(),
            opts,
        }
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u16(&mut self, v: u16) {
        if self.opts.big_endian {
            self.buf.write_u16::<BigEndian>(v).unwrap();
        } else {
            self.buf.write_u16::<LittleEndian>(v).unwrap();
        }
    }

    fn u32(&mut self, v: u32) {
        if self.opts.big_endian {
            self.buf.write_u32::<BigEndian>(v).unwrap();
        } else {
            self.buf.write_u32::<LittleEndian>(v).unwrap();
        }
    }

    fn u64(&mut self, v: u64) {
        if self.opts.big_endian {
            self.buf.write_u64::<BigEndian>(v).unwrap();
        } else {
            self.buf.write_u64::<LittleEndian>(v).unwrap();
        }
    }

    fn word(&mut self, v: u64) {
        if self.opts.class64 {
            self.u64(v);
        } else {
            self.u32(v as u32);
        }
    }

    fn pad_to(&mut self, offset: u64) {
        assert!(self.buf.len() as u64 <= offset, "fixture layout overlap");
        self.buf.resize(offset as usize, 0);
    }

    fn pos(&self) -> u64 {
        self.buf.len() as u64
    }

    #[allow(clippy::too_many_arguments)]
    fn section(
        &mut self,
        name: u32,
        sh_type: u32,
        flags: u64,
        addr: u64,
        offset: u64,
        size: u64,
        link: u32,
        info: u32,
        align: u64,
        entsize: u64,
    ) {
        self.u32(name);
        self.u32(sh_type);
        self.word(flags);
        self.word(addr);
        self.word(offset);
        self.word(size);
        self.u32(link);
        self.u32(info);
        self.word(align);
        self.word(entsize);
    }

    fn symbol(&mut self, name: u32, info: u8, other: u8, shndx: u16, value: u64, size: u64) {
        self.u32(name);
        if self.opts.class64 {
            self.u8(info);
            self.u8(other);
            self.u16(shndx);
            self.u64(value);
            self.u64(size);
        } else {
            self.u32(value as u32);
            self.u32(size as u32);
            self.u8(info);
            self.u8(other);
            self.u16(shndx);
        }
    }
}

/// Builds a string table, returning it with the offset of each name.
fn string_table(names: &[&str]) -> (Vec<u8>, Vec<u32>) {
    let mut table = vec![0u8];
    let mut offsets = Vec::with_capacity(names.len());
    for name in names {
        offsets.push(table.len() as u32);
        table.extend_from_slice(name.as_bytes());
        table.push(0);
    }
    (table, offsets)
}

fn align(value: u64, to: u64) -> u64 {
    value.div_ceil(to) * to
}

pub fn build(opts: Options) -> Fixture {
    let mut section_names = vec!["", ".text", ".data", ".bss"];
    if opts.with_symbols {
        section_names.extend([".symtab", ".strtab"]);
    }
    section_names.push(".shstrtab");
    let shnum = section_names.len();
    let shstrndx = shnum - 1;

    let (shstrtab, name_offsets) = string_table(&section_names[1..]);
    let (strtab, sym_names) = string_table(&["_start", "helper", "counter"]);

    let phoff = opts.ehsize();
    let text_off = align(phoff + opts.phentsize(), 16);
    let data_off = text_off + TEXT_SIZE;
    let symtab_off = align(data_off + DATA_SIZE, 8);
    let symtab_size = if opts.with_symbols { 5 * opts.symsize() } else { 0 };
    let strtab_off = symtab_off + symtab_size;
    let strtab_size = if opts.with_symbols { strtab.len() as u64 } else { 0 };
    let shstrtab_off = strtab_off + strtab_size;
    let shoff = align(shstrtab_off + shstrtab.len() as u64, 8);

    let mut w = Writer::new(opts);

    // e_ident
    w.buf.extend_from_slice(b"\x7fELF");
    w.u8(if opts.class64 { 2 } else { 1 });
    w.u8(if opts.big_endian { 2 } else { 1 });
    w.u8(1);
    w.u8(0);
    w.pad_to(16);

    let (e_shnum, e_shstrndx) = if opts.escaped {
        (0, 0xffff)
    } else {
        (shnum as u16, shstrndx as u16)
    };
    w.u16(2); // ET_EXEC
    w.u16(opts.machine());
    w.u32(1);
    w.word(ENTRY);
    w.word(phoff);
    w.word(shoff);
    w.u32(0);
    w.u16(opts.ehsize() as u16);
    w.u16(opts.phentsize() as u16);
    w.u16(1);
    w.u16(opts.shentsize() as u16);
    w.u16(e_shnum);
    w.u16(e_shstrndx);
    assert_eq!(w.pos(), phoff);

    // PT_LOAD, R+X, over .text
    if opts.class64 {
        w.u32(1);
        w.u32(5);
        for v in [text_off, TEXT_ADDR, TEXT_ADDR, TEXT_SIZE, TEXT_SIZE, 0x1000] {
            w.u64(v);
        }
    } else {
        for v in [1, text_off, TEXT_ADDR, TEXT_ADDR, TEXT_SIZE, TEXT_SIZE, 5, 0x1000] {
            w.u32(v as u32);
        }
    }

    w.pad_to(text_off);
    w.buf.extend(std::iter::repeat(0x90).take(TEXT_SIZE as usize));
    w.buf.extend(std::iter::repeat(0xaa).take(DATA_SIZE as usize));

    if opts.with_symbols {
        w.pad_to(symtab_off);
        w.symbol(0, 0, 0, 0, 0, 0);
        // STB_LOCAL STT_SECTION for .text
        w.symbol(0, 0x03, 0, 1, TEXT_ADDR, 0);
        // STB_LOCAL STT_FUNC
        w.symbol(sym_names[1], 0x02, 0, 1, HELPER_ADDR, 0x10);
        // STB_GLOBAL STT_FUNC
        w.symbol(sym_names[0], 0x12, 0, 1, ENTRY, 0x10);
        // STB_GLOBAL STT_OBJECT, STV_HIDDEN
        w.symbol(sym_names[2], 0x11, 2, 2, COUNTER_ADDR, 4);
        assert_eq!(w.pos(), strtab_off);
        w.buf.extend_from_slice(&strtab);
    }

    w.pad_to(shstrtab_off);
    w.buf.extend_from_slice(&shstrtab);
    w.pad_to(shoff);

    // [0] null, carrying the escaped count and name table index if asked
    if opts.escaped {
        w.section(0, 0, 0, 0, 0, shnum as u64, shstrndx as u32, 0, 0, 0);
    } else {
        w.section(0, 0, 0, 0, 0, 0, 0, 0, 0, 0);
    }
    let name = |section: &str| name_offsets[section_names[1..].iter().position(|&n| n == section).unwrap()];
    w.section(name(".text"), SHT_PROGBITS, 0x6, TEXT_ADDR, text_off, TEXT_SIZE, 0, 0, 16, 0);
    w.section(name(".data"), SHT_PROGBITS, 0x3, DATA_ADDR, data_off, DATA_SIZE, 0, 0, 8, 0);
    w.section(name(".bss"), SHT_NOBITS, 0x3, BSS_ADDR, data_off + DATA_SIZE, BSS_SIZE, 0, 0, 16, 0);
    if opts.with_symbols {
        let strtab_index = section_names.iter().position(|&n| n == ".strtab").unwrap() as u32;
        w.section(
            name(".symtab"),
            SHT_SYMTAB,
            0,
            0,
            symtab_off,
            symtab_size,
            strtab_index,
            3,
            8,
            opts.symsize(),
        );
        w.section(name(".strtab"), SHT_STRTAB, 0, 0, strtab_off, strtab_size, 0, 0, 1, 0);
    }
    w.section(name(".shstrtab"), SHT_STRTAB, 0, 0, shstrtab_off, shstrtab.len() as u64, 0, 0, 1, 0);

    assert_eq!(w.pos(), shoff + shnum as u64 * opts.shentsize());

    Fixture {
        opts,
        bytes: w.buf,
        text_off,
        data_off,
        symtab_off,
        shoff,
        section_names,
    }
}

/// A file under the system temp directory, removed on drop.
pub struct TempFile(PathBuf);

impl TempFile {
    pub fn new(name: &str, bytes: &[u8]) -> Self {
        let path = std::env::temp_dir().join(format!("shelf-{}-{}", std::process::id(), name));
        fs::write(&path, bytes).unwrap();
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}
