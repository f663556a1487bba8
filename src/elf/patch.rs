//! The patchers: interpreter and rpath rewrites, section deletion and
//! stripping, raw hex and pointer edits, section injection, and the
//! relocation-table-driven GOT hook.

use log::{debug, info, warn};

use scroll::ctx::SizeWith;
use scroll::Pread;

use super::dynamic::{DT_RPATH, DT_RUNPATH};
use super::program_header::{PF_R, PF_W, PF_X, PT_INTERP, PT_LOAD};
use super::reloc::{r_sym, Rela};
use super::section_header::{SectionHeader, SHT_NULL, SHT_PROGBITS, SHT_RELA};
use super::Elf;
use crate::container::Class;
use crate::error::{Error, Result};

impl Elf {
    /// Point the program interpreter at `interp`, in place when the new
    /// path fits and via a fresh segment when it does not.
    pub fn set_interpreter(&mut self, interp: &str) -> Result<()> {
        let (section, shdr) = self.section_by_name(".interp")?;
        if interp.len() as u64 + 1 <= shdr.sh_size {
            debug!("set interpreter: overwriting in place");
            return self.put_str(shdr.sh_offset, interp);
        }
        info!("set interpreter: path outgrows .interp, allocating a segment");
        let seg = self
            .add_segment(interp.len() as u64 + 1)
            .map_err(|_| Error::AddSegment)?;
        let home = self.phdr(seg)?;
        self.put_str(home.p_offset, interp)?;

        let interp_seg = self.segment_index_by_type(PT_INTERP)?;
        let mut phdr = self.phdr(interp_seg)?;
        phdr.p_offset = home.p_offset;
        phdr.p_vaddr = home.p_vaddr;
        phdr.p_paddr = home.p_paddr;
        phdr.p_filesz = home.p_filesz;
        phdr.p_memsz = home.p_memsz;
        self.set_phdr(interp_seg, phdr)?;

        let mut fresh = self.shdr(section)?;
        fresh.sh_offset = home.p_offset;
        fresh.sh_addr = home.p_vaddr;
        fresh.sh_size = home.p_filesz;
        self.set_shdr(section, fresh)?;
        self.rederive()
    }

    /// Store `path` in `.dynstr` and add a `DT_RPATH` entry for it.
    pub fn set_rpath(&mut self, path: &str) -> Result<()> {
        let offset = self.add_dynstr_name(path)?;
        self.add_dynamic(DT_RPATH, offset)
    }

    /// Store `path` in `.dynstr` and add a `DT_RUNPATH` entry for it.
    pub fn set_runpath(&mut self, path: &str) -> Result<()> {
        let offset = self.add_dynstr_name(path)?;
        self.add_dynamic(DT_RUNPATH, offset)
    }

    /// Whether section `index` is loaded by no segment.
    pub fn is_isolated_section(&self, index: usize) -> Result<bool> {
        let shdr = self.shdr(index)?;
        if shdr.sh_addr != 0 || shdr.sh_offset == 0 {
            return Ok(false);
        }
        for i in 0..self.phnum() {
            let phdr = self.phdr(i)?;
            if phdr.p_type == PT_LOAD && phdr.covers_offset(shdr.sh_offset) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Delete section `index`: cut its bytes, pull every later section and
    /// the section header table back, and drop its header row.
    pub fn delete_section_at(&mut self, index: usize) -> Result<()> {
        let shdr = self.shdr(index)?;
        let offset = shdr.sh_offset;
        // NOBITS occupies no file bytes, only the row goes
        let size = if shdr.has_file_data() { shdr.sh_size } else { 0 };
        debug!("delete section {index}: {size:#x} bytes at {offset:#x}");

        for i in index + 1..self.shnum() {
            let mut later = self.shdr(i)?;
            later.sh_offset = later.sh_offset.saturating_sub(size);
            self.set_shdr(i, later)?;
        }

        let mut head = self.header();
        head.e_shoff = head
            .e_shoff
            .checked_sub(size)
            .ok_or_else(|| Error::Malformed("section header table below deleted bytes".into()))?;
        self.set_header(head)?;
        self.delete_bytes(offset, size)?;

        let mut head = self.header();
        head.e_shnum -= 1;
        if (index as u16) < head.e_shstrndx {
            head.e_shstrndx -= 1;
        }
        self.set_header(head)?;

        let row = head.e_shoff + (index * SectionHeader::size_with(&self.ctx())) as u64;
        self.delete_bytes(row, SectionHeader::size_with(&self.ctx()) as u64)?;
        self.rederive()
    }

    /// Delete the section named `name`.
    pub fn delete_section(&mut self, name: &str) -> Result<()> {
        let index = self.section_index_by_name(name)?;
        self.delete_section_at(index)
    }

    /// Delete every isolated, non-null section except `.shstrtab`.
    pub fn strip(&mut self) -> Result<()> {
        for index in (0..self.shnum()).rev() {
            let shdr = self.shdr(index)?;
            if shdr.sh_type == SHT_NULL {
                continue;
            }
            if !self.is_isolated_section(index)? {
                continue;
            }
            match self.section_name(index) {
                Ok(name) if name == ".shstrtab" => continue,
                Ok(name) => info!("strip: deleting {index} {name}"),
                Err(_) => continue,
            }
            self.delete_section_at(index)?;
        }
        Ok(())
    }

    /// Remove the whole section view: `.shstrtab`, the section header
    /// table, and the header fields describing them.
    pub fn delete_all_shdr(&mut self) -> Result<()> {
        self.delete_section(".shstrtab")?;
        let mut head = self.header();
        head.e_shstrndx = 0;
        self.set_header(head)?;

        let head = self.header();
        let table_len = head.e_shnum as u64 * head.e_shentsize as u64;
        self.delete_bytes(head.e_shoff, table_len)?;
        let mut head = self.header();
        head.e_shoff = 0;
        head.e_shnum = 0;
        self.set_header(head)?;
        self.rederive()
    }

    /// Overwrite `data.len()` bytes at `offset`.
    pub fn edit_hex(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let fits = offset
            .checked_add(data.len() as u64)
            .map_or(false, |end| end <= self.len());
        if !fits {
            return Err(Error::Args(format!(
                "write of {} bytes at {offset:#x} past image end",
                data.len()
            )));
        }
        self.write_bytes(offset, data)
    }

    /// Write a class-width pointer at `offset`: 4 bytes on CLASS32, 8 on
    /// CLASS64.
    pub fn edit_pointer(&mut self, offset: u64, value: u64) -> Result<()> {
        let width = self.class().word_size() as u64;
        let fits = offset
            .checked_add(width)
            .map_or(false, |end| end <= self.len());
        if !fits {
            return Err(Error::Args(format!(
                "pointer write at {offset:#x} past image end"
            )));
        }
        self.write_word(offset, value)
    }

    /// Grow the section header table by one zeroed row; returns its index.
    /// The table must sit at the end of the image.
    fn add_section_entry(&mut self) -> Result<usize> {
        let head = self.header();
        let row = SectionHeader::size_with(&self.ctx()) as u64;
        let table_end = head.e_shoff + head.e_shnum as u64 * row;
        if table_end != self.len() {
            return Err(Error::Malformed(
                "section header table is not at the end of the image".into(),
            ));
        }
        self.resize(table_end + row)?;
        let mut head = self.header();
        head.e_shnum += 1;
        self.set_header(head)?;
        self.rederive()?;
        Ok(head.e_shnum as usize - 1)
    }

    /// Add a named `PROGBITS` section backed by a fresh LOAD of `size`
    /// bytes; returns the new section index.
    pub fn add_section(&mut self, size: u64, name: &str) -> Result<usize> {
        let seg = self.add_segment(size).map_err(|_| Error::AddSegment)?;
        let index = self.add_section_entry()?;
        let name_offset = self.add_shstr_name(name)?;
        let home = self.phdr(seg)?;
        let shdr = SectionHeader {
            sh_name: u32::try_from(name_offset)
                .map_err(|_| Error::Malformed("shstrtab offset overflows sh_name".into()))?,
            sh_type: SHT_PROGBITS,
            sh_flags: 0,
            sh_addr: home.p_vaddr,
            sh_offset: home.p_offset,
            sh_size: home.p_filesz,
            sh_link: 0,
            sh_info: 0,
            sh_addralign: 1,
            sh_entsize: 0,
        };
        self.set_shdr(index, shdr)?;
        self.rederive()?;
        Ok(index)
    }

    /// Hook the external function `symbol` through its GOT slot: load the
    /// replacement code from `path` into a fresh executable segment and
    /// re-point the slot the `.rela.plt` entry for `symbol` targets.
    ///
    /// 32-bit objects resolve PLT calls lazily through the slot this would
    /// rewrite, so the technique only holds for CLASS64.
    pub fn hook_extern<P: AsRef<std::path::Path>>(
        &mut self,
        symbol: &str,
        path: P,
        hook_offset: u64,
    ) -> Result<()> {
        if self.class() == Class::Class32 {
            return Err(Error::Malformed(
                "GOT hooking is defeated by 32-bit lazy binding".into(),
            ));
        }
        let seg = self.add_segment_with_file(path)?;
        let mut home = self.phdr(seg)?;
        home.p_flags = PF_R | PF_W | PF_X;
        self.set_phdr(seg, home)?;

        let (_, got) = self.section_by_name(".got.plt")?;
        let (_, rela) = self.section_by_name(".rela.plt")?;
        if rela.sh_type != SHT_RELA {
            return Err(Error::Malformed(format!(
                ".rela.plt has section type {:#x}",
                rela.sh_type
            )));
        }
        let entry_size = Rela::size_with(&self.ctx()) as u64;
        let count = rela.sh_size / entry_size;
        for i in 0..count {
            let offset = (rela.sh_offset + i * entry_size) as usize;
            let reloc: Rela = self.bytes().pread_with(offset, self.ctx())?;
            let sym = r_sym(reloc.r_info, self.class()) as usize;
            if self.dynsym_name(sym)? != symbol {
                continue;
            }
            let diff = got
                .sh_addr
                .checked_sub(got.sh_offset)
                .ok_or_else(|| Error::Malformed(".got.plt offset above its address".into()))?;
            let slot = reloc
                .r_offset
                .checked_sub(diff)
                .ok_or_else(|| Error::Malformed("GOT slot below the file start".into()))?;
            let value = home.p_vaddr + hook_offset;
            info!("hook {symbol}: GOT slot at {slot:#x} now {value:#x}");
            return self.write_word(slot, value);
        }
        warn!("hook {symbol}: no .rela.plt entry references it");
        Err(Error::NotFound(symbol.to_string()))
    }
}
