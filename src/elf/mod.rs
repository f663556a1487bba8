//! The ELF engine: a typed, class-parametric view over a single owned byte
//! image, plus every mutating operation built on top of it.
//!
//! The image is the only owner of file content. The view caches nothing but
//! the header and a handful of well-known section indices; every structured
//! access resolves byte offsets on demand and reads or writes through the
//! image with the endianness the file declares. Mutating operations
//! re-derive the cached indices before returning, so a caller never
//! observes a stale view.
//!
//! ```no_run
//! use hobgoblin::elf::Elf;
//!
//! let mut elf = Elf::open("target", false)?;
//! elf.set_runpath("$ORIGIN/../lib")?;
//! elf.save()?;
//! # Ok::<(), hobgoblin::error::Error>(())
//! ```

pub mod dynamic;
pub mod expand;
pub mod forensic;
pub mod gnu_hash;
pub mod header;
pub mod infect;
pub mod layout;
pub mod patch;
pub mod program_header;
pub mod raw;
pub mod reloc;
pub mod section_header;
pub mod strings;
pub mod sym;
pub mod symbols;

use std::path::Path;

use scroll::ctx::SizeWith;
use scroll::{Pread, Pwrite};

use crate::container::{self, Ctx};
use crate::error::{Error, Result};
use crate::image::Image;
use crate::strtab;

use dynamic::Dyn;
use header::Header;
use program_header::ProgramHeader;
use section_header::SectionHeader;
use sym::Sym;

pub use crate::container::Class;

/// Location of the dynamic array inside the image, from `PT_DYNAMIC`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DynamicTable {
    pub offset: u64,
    pub count: usize,
}

/// One opened ELF: the byte image plus the derived typed view.
#[derive(Debug)]
pub struct Elf {
    image: Image,
    ctx: Ctx,
    kind: u16,
    head: Header,
    shstrtab: Option<usize>,
    dynstr: Option<usize>,
    strtab: Option<usize>,
    dynsym: Option<usize>,
    symtab: Option<usize>,
    pub(crate) dynamic: Option<DynamicTable>,
}

impl Elf {
    /// Open `path` with read-only or read-write intent and derive the view.
    pub fn open<P: AsRef<Path>>(path: P, readonly: bool) -> Result<Elf> {
        Elf::from_image(Image::open(path, readonly)?)
    }

    /// Parse an in-memory image with no backing file.
    pub fn parse(bytes: Vec<u8>) -> Result<Elf> {
        Elf::from_image(Image::from_vec(bytes))
    }

    fn from_image(image: Image) -> Result<Elf> {
        let ctx = container::peek(image.bytes())?;
        let mut elf = Elf {
            image,
            ctx,
            kind: header::ET_NONE,
            head: Header::default(),
            shstrtab: None,
            dynstr: None,
            strtab: None,
            dynsym: None,
            symtab: None,
            dynamic: None,
        };
        elf.rederive()?;
        Ok(elf)
    }

    /// Flush the image back to its backing file.
    pub fn save(&mut self) -> Result<()> {
        self.image.save()
    }

    /// Consume the engine and return the raw image bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.image.into_vec()
    }

    /// The decoding context (class and endianness).
    #[inline]
    pub fn ctx(&self) -> Ctx {
        self.ctx
    }

    /// The ELF class.
    #[inline]
    pub fn class(&self) -> Class {
        self.ctx.class
    }

    /// Current image length.
    #[inline]
    pub fn len(&self) -> u64 {
        self.image.len()
    }

    /// Whether the image is empty.
    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }

    /// Read access to the raw image.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        self.image.bytes()
    }

    /// Raw mutable access for the in-place editors.
    #[inline]
    pub(crate) fn image_bytes_mut(&mut self) -> &mut [u8] {
        self.image.bytes_mut()
    }

    /// The file type the layout policy follows: `ET_DYN` with a non-zero
    /// entry point behaves like an executable.
    #[inline]
    pub fn file_kind(&self) -> u16 {
        self.kind
    }

    /// The cached ELF header.
    #[inline]
    pub fn header(&self) -> Header {
        self.head
    }

    /// Write the header back to the image and refresh the cache.
    pub fn set_header(&mut self, head: Header) -> Result<()> {
        self.image.bytes_mut().pwrite_with(head, 0, self.ctx)?;
        self.head = head;
        self.kind = resolve_kind(&head);
        Ok(())
    }

    /* ---------------- derived view ---------------- */

    /// Recompute every cached index from the raw image. Called after every
    /// resize and every move.
    pub(crate) fn rederive(&mut self) -> Result<()> {
        let head: Header = self.image.bytes().pread_with(0, self.ctx)?;

        let phsize = ProgramHeader::size_with(&self.ctx) as u64;
        let shsize = SectionHeader::size_with(&self.ctx) as u64;
        if head.e_phnum > 0 {
            if head.e_phentsize as u64 != phsize {
                return Err(Error::Malformed(format!(
                    "e_phentsize {} for class {:?}",
                    head.e_phentsize, self.ctx.class
                )));
            }
            self.span(head.e_phoff, head.e_phnum as u64 * phsize)?;
        }
        if head.e_shnum > 0 {
            if head.e_shentsize as u64 != shsize {
                return Err(Error::Malformed(format!(
                    "e_shentsize {} for class {:?}",
                    head.e_shentsize, self.ctx.class
                )));
            }
            self.span(head.e_shoff, head.e_shnum as u64 * shsize)?;
        }
        self.head = head;
        self.kind = resolve_kind(&head);

        self.shstrtab = None;
        self.dynstr = None;
        self.strtab = None;
        self.dynsym = None;
        self.symtab = None;
        self.dynamic = None;

        if head.e_shnum > 0 && head.e_shstrndx != 0 && head.e_shstrndx < head.e_shnum {
            self.shstrtab = Some(head.e_shstrndx as usize);
            for i in 0..head.e_shnum as usize {
                let name = match self.section_name(i) {
                    Ok(name) => name,
                    Err(_) => continue,
                };
                match name.as_str() {
                    ".dynstr" => self.dynstr = Some(i),
                    ".strtab" => self.strtab = Some(i),
                    ".dynsym" => self.dynsym = Some(i),
                    ".symtab" => self.symtab = Some(i),
                    _ => {}
                }
            }
        }

        for i in 0..self.phnum() {
            let phdr = self.phdr(i)?;
            if phdr.p_type == program_header::PT_DYNAMIC {
                self.span(phdr.p_offset, phdr.p_filesz)?;
                self.dynamic = Some(DynamicTable {
                    offset: phdr.p_offset,
                    count: (phdr.p_filesz / Dyn::size_with(&self.ctx) as u64) as usize,
                });
            }
        }
        Ok(())
    }

    /* ---------------- program headers ---------------- */

    /// Number of program headers.
    #[inline]
    pub fn phnum(&self) -> usize {
        self.head.e_phnum as usize
    }

    fn phdr_offset(&self, index: usize) -> Result<u64> {
        if index >= self.phnum() {
            return Err(Error::OutOfBounds(index as u64));
        }
        Ok(self.head.e_phoff + (index * ProgramHeader::size_with(&self.ctx)) as u64)
    }

    /// Read program header `index`.
    pub fn phdr(&self, index: usize) -> Result<ProgramHeader> {
        let offset = self.phdr_offset(index)?;
        Ok(self.image.bytes().pread_with(offset as usize, self.ctx)?)
    }

    /// Write program header `index` back to the image.
    pub fn set_phdr(&mut self, index: usize, phdr: ProgramHeader) -> Result<()> {
        let offset = self.phdr_offset(index)? as usize;
        self.image.bytes_mut().pwrite_with(phdr, offset, self.ctx)?;
        Ok(())
    }

    /// First segment of the given type.
    pub fn segment_index_by_type(&self, p_type: u32) -> Result<usize> {
        for i in 0..self.phnum() {
            if self.phdr(i)?.p_type == p_type {
                return Ok(i);
            }
        }
        Err(Error::SegmentNotFound(p_type))
    }

    /// The lowest and highest virtual address mapped by any segment of the
    /// given type.
    pub fn segment_address_range(&self, p_type: u32) -> Result<(u64, u64)> {
        let mut low = u64::MAX;
        let mut high = 0;
        for i in 0..self.phnum() {
            let phdr = self.phdr(i)?;
            if phdr.p_type == p_type {
                low = low.min(phdr.p_vaddr);
                high = high.max(phdr.mem_end());
            }
        }
        if high == 0 {
            return Err(Error::SegmentNotFound(p_type));
        }
        Ok((low, high))
    }

    /* ---------------- section headers ---------------- */

    /// Number of section headers.
    #[inline]
    pub fn shnum(&self) -> usize {
        self.head.e_shnum as usize
    }

    fn shdr_offset(&self, index: usize) -> Result<u64> {
        if index >= self.shnum() {
            return Err(Error::OutOfBounds(index as u64));
        }
        Ok(self.head.e_shoff + (index * SectionHeader::size_with(&self.ctx)) as u64)
    }

    /// Read section header `index`.
    pub fn shdr(&self, index: usize) -> Result<SectionHeader> {
        let offset = self.shdr_offset(index)?;
        Ok(self.image.bytes().pread_with(offset as usize, self.ctx)?)
    }

    /// Write section header `index` back to the image.
    pub fn set_shdr(&mut self, index: usize, shdr: SectionHeader) -> Result<()> {
        let offset = self.shdr_offset(index)? as usize;
        self.image.bytes_mut().pwrite_with(shdr, offset, self.ctx)?;
        Ok(())
    }

    /// The name of section `index`, resolved through `.shstrtab`.
    pub fn section_name(&self, index: usize) -> Result<String> {
        let table = self
            .shstrtab
            .ok_or_else(|| Error::Malformed("no section name table".into()))?;
        let names = self.shdr(table)?;
        let shdr = self.shdr(index)?;
        let at = names.sh_offset + shdr.sh_name as u64;
        self.span(at, 1)?;
        Ok(strtab::get_str(self.image.bytes(), at as usize)?.to_string())
    }

    /// Index of the section named `name`.
    pub fn section_index_by_name(&self, name: &str) -> Result<usize> {
        for i in 0..self.shnum() {
            if let Ok(section) = self.section_name(i) {
                if section == name {
                    return Ok(i);
                }
            }
        }
        Err(Error::SectionNotFound(name.to_string()))
    }

    /// Index and header of the section named `name`.
    pub fn section_by_name(&self, name: &str) -> Result<(usize, SectionHeader)> {
        let index = self.section_index_by_name(name)?;
        Ok((index, self.shdr(index)?))
    }

    /// The cached `.shstrtab` / `.dynstr` / `.strtab` / `.dynsym` /
    /// `.symtab` indices, when the file has them.
    pub fn shstrtab_index(&self) -> Option<usize> {
        self.shstrtab
    }
    /// See [`Elf::shstrtab_index`].
    pub fn dynstr_index(&self) -> Option<usize> {
        self.dynstr
    }
    /// See [`Elf::shstrtab_index`].
    pub fn strtab_index(&self) -> Option<usize> {
        self.strtab
    }
    /// See [`Elf::shstrtab_index`].
    pub fn dynsym_index(&self) -> Option<usize> {
        self.dynsym
    }
    /// See [`Elf::shstrtab_index`].
    pub fn symtab_index(&self) -> Option<usize> {
        self.symtab
    }

    /* ---------------- dynamic array ---------------- */

    /// Number of dynamic entries, zero when there is no `PT_DYNAMIC`.
    pub fn dyn_count(&self) -> usize {
        self.dynamic.map(|d| d.count).unwrap_or(0)
    }

    fn dyn_offset(&self, index: usize) -> Result<u64> {
        let table = self
            .dynamic
            .ok_or(Error::SegmentNotFound(program_header::PT_DYNAMIC))?;
        if index >= table.count {
            return Err(Error::OutOfBounds(index as u64));
        }
        Ok(table.offset + (index * Dyn::size_with(&self.ctx)) as u64)
    }

    /// Read dynamic entry `index`.
    pub fn dyn_at(&self, index: usize) -> Result<Dyn> {
        let offset = self.dyn_offset(index)?;
        Ok(self.image.bytes().pread_with(offset as usize, self.ctx)?)
    }

    /// Write dynamic entry `index`.
    pub fn set_dyn(&mut self, index: usize, entry: Dyn) -> Result<()> {
        let offset = self.dyn_offset(index)? as usize;
        self.image.bytes_mut().pwrite_with(entry, offset, self.ctx)?;
        Ok(())
    }

    /// Index of the first dynamic entry with `tag`.
    pub fn dynamic_index_by_tag(&self, tag: u64) -> Result<usize> {
        for i in 0..self.dyn_count() {
            if self.dyn_at(i)?.d_tag == tag {
                return Ok(i);
            }
        }
        Err(Error::DynamicNotFound(tag))
    }

    /// Value of the first dynamic entry with `tag`.
    pub fn dynamic_value_by_tag(&self, tag: u64) -> Result<u64> {
        let index = self.dynamic_index_by_tag(tag)?;
        Ok(self.dyn_at(index)?.d_val)
    }

    /// Set the value of the first dynamic entry with `tag`.
    pub fn set_dynamic_value_by_tag(&mut self, tag: u64, value: u64) -> Result<()> {
        let index = self.dynamic_index_by_tag(tag)?;
        let mut entry = self.dyn_at(index)?;
        entry.d_val = value;
        self.set_dyn(index, entry)
    }

    /// Rewrite the tag of the first dynamic entry with `tag`.
    pub fn set_dynamic_tag_by_tag(&mut self, tag: u64, new_tag: u64) -> Result<()> {
        let index = self.dynamic_index_by_tag(tag)?;
        let mut entry = self.dyn_at(index)?;
        entry.d_tag = new_tag;
        self.set_dyn(index, entry)
    }

    /* ---------------- symbol tables ---------------- */

    fn sym_table(&self, section: Option<usize>) -> Result<(SectionHeader, usize)> {
        let index = section.ok_or_else(|| Error::SectionNotFound(".dynsym/.symtab".into()))?;
        let shdr = self.shdr(index)?;
        let count = (shdr.sh_size / Sym::size_with(&self.ctx) as u64) as usize;
        Ok((shdr, count))
    }

    /// Number of dynamic symbols.
    pub fn dynsym_count(&self) -> usize {
        self.sym_table(self.dynsym).map(|(_, n)| n).unwrap_or(0)
    }

    /// Number of static symbols.
    pub fn symtab_count(&self) -> usize {
        self.sym_table(self.symtab).map(|(_, n)| n).unwrap_or(0)
    }

    fn sym_at(&self, section: Option<usize>, index: usize) -> Result<Sym> {
        let (shdr, count) = self.sym_table(section)?;
        if index >= count {
            return Err(Error::OutOfBounds(index as u64));
        }
        let offset = shdr.sh_offset + (index * Sym::size_with(&self.ctx)) as u64;
        Ok(self.image.bytes().pread_with(offset as usize, self.ctx)?)
    }

    fn set_sym_at(&mut self, section: Option<usize>, index: usize, sym: Sym) -> Result<()> {
        let (shdr, count) = self.sym_table(section)?;
        if index >= count {
            return Err(Error::OutOfBounds(index as u64));
        }
        let offset = (shdr.sh_offset + (index * Sym::size_with(&self.ctx)) as u64) as usize;
        self.image.bytes_mut().pwrite_with(sym, offset, self.ctx)?;
        Ok(())
    }

    /// Read dynamic symbol `index`.
    pub fn dynsym_at(&self, index: usize) -> Result<Sym> {
        self.sym_at(self.dynsym, index)
    }

    /// Write dynamic symbol `index`.
    pub fn set_dynsym(&mut self, index: usize, sym: Sym) -> Result<()> {
        self.set_sym_at(self.dynsym, index, sym)
    }

    /// Read static symbol `index`.
    pub fn symtab_at(&self, index: usize) -> Result<Sym> {
        self.sym_at(self.symtab, index)
    }

    /// Write static symbol `index`.
    pub fn set_symtab(&mut self, index: usize, sym: Sym) -> Result<()> {
        self.set_sym_at(self.symtab, index, sym)
    }

    fn sym_name_in(&self, strtab: Option<usize>, sym: &Sym) -> Result<String> {
        let table = strtab.ok_or_else(|| Error::SectionNotFound(".dynstr/.strtab".into()))?;
        let names = self.shdr(table)?;
        let at = names.sh_offset + sym.st_name as u64;
        self.span(at, 1)?;
        Ok(strtab::get_str(self.image.bytes(), at as usize)?.to_string())
    }

    /// Name of dynamic symbol `index`, through `.dynstr`.
    pub fn dynsym_name(&self, index: usize) -> Result<String> {
        let sym = self.dynsym_at(index)?;
        self.sym_name_in(self.dynstr, &sym)
    }

    /// Name of static symbol `index`, through `.strtab`.
    pub fn symtab_name(&self, index: usize) -> Result<String> {
        let sym = self.symtab_at(index)?;
        self.sym_name_in(self.strtab, &sym)
    }

    /// All dynamic symbol names, index aligned.
    pub fn dynsym_names(&self) -> Result<Vec<String>> {
        (0..self.dynsym_count()).map(|i| self.dynsym_name(i)).collect()
    }

    /// Index of the dynamic symbol named `name`.
    pub fn dynsym_index_by_name(&self, name: &str) -> Result<usize> {
        for i in 0..self.dynsym_count() {
            if self.dynsym_name(i)? == name {
                return Ok(i);
            }
        }
        Err(Error::NotFound(name.to_string()))
    }

    /// Index of the static symbol named `name`.
    pub fn symtab_index_by_name(&self, name: &str) -> Result<usize> {
        for i in 0..self.symtab_count() {
            if self.symtab_name(i)? == name {
                return Ok(i);
            }
        }
        Err(Error::NotFound(name.to_string()))
    }

    /* ---------------- byte services ---------------- */

    /// Bounds-check `offset..offset+len` against the image.
    pub(crate) fn span(&self, offset: u64, len: u64) -> Result<core::ops::Range<usize>> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= self.image.len())
            .ok_or(Error::OutOfBounds(offset))?;
        Ok(offset as usize..end as usize)
    }

    /// Borrow `len` bytes at `offset`.
    pub fn read_bytes(&self, offset: u64, len: u64) -> Result<&[u8]> {
        let range = self.span(offset, len)?;
        Ok(&self.image.bytes()[range])
    }

    /// Overwrite bytes at `offset`.
    pub fn write_bytes(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let range = self.span(offset, data.len() as u64).map_err(|_| Error::Copy)?;
        self.image.bytes_mut()[range].copy_from_slice(data);
        Ok(())
    }

    /// Move `len` bytes from `src` to `dst` inside the image; overlap safe.
    pub(crate) fn copy_within(&mut self, src: u64, len: u64, dst: u64) -> Result<()> {
        let from = self.span(src, len).map_err(|_| Error::Move)?;
        self.span(dst, len).map_err(|_| Error::Move)?;
        self.image.bytes_mut().copy_within(from, dst as usize);
        Ok(())
    }

    /// Zero-fill `len` bytes at `offset`.
    pub(crate) fn zero(&mut self, offset: u64, len: u64) -> Result<()> {
        let range = self.span(offset, len)?;
        self.image.bytes_mut()[range].fill(0);
        Ok(())
    }

    /// Grow or shrink the image and its backing file.
    pub(crate) fn resize(&mut self, new_len: u64) -> Result<()> {
        self.image.resize(new_len)
    }

    /// Read a class-width word (pointer) at `offset`.
    pub fn read_word(&self, offset: u64) -> Result<u64> {
        self.span(offset, self.ctx.class.word_size() as u64)?;
        let word = if self.ctx.is_64() {
            self.image.bytes().pread_with::<u64>(offset as usize, self.ctx.le)?
        } else {
            self.image.bytes().pread_with::<u32>(offset as usize, self.ctx.le)? as u64
        };
        Ok(word)
    }

    /// Write a class-width word (pointer) at `offset`.
    pub fn write_word(&mut self, offset: u64, value: u64) -> Result<()> {
        self.span(offset, self.ctx.class.word_size() as u64)?;
        if self.ctx.is_64() {
            self.image
                .bytes_mut()
                .pwrite_with::<u64>(value, offset as usize, self.ctx.le)?;
        } else {
            self.image
                .bytes_mut()
                .pwrite_with::<u32>(container::narrow(value)?, offset as usize, self.ctx.le)?;
        }
        Ok(())
    }

    /// Write a string plus NUL terminator at `offset`.
    pub(crate) fn put_str(&mut self, offset: u64, s: &str) -> Result<()> {
        self.span(offset, s.len() as u64 + 1)?;
        strtab::put_str(self.image.bytes_mut(), offset as usize, s)
    }
}

fn resolve_kind(head: &Header) -> u16 {
    match head.e_type {
        header::ET_DYN if head.e_entry != 0 => header::ET_EXEC,
        other => other,
    }
}
