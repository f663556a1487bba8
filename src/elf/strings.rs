//! The string-table editor: renames and appends across `.shstrtab`,
//! `.dynstr`, and `.strtab`, keeping every referent and the dynamic
//! string-table tags pointed at the right bytes.
//!
//! A shorter name is overwritten in place. A longer one is appended to the
//! table through the allocator ladder, and the referring section header or
//! symbol is re-pointed at the new offset.

use log::debug;

use super::dynamic::{DT_STRSZ, DT_STRTAB};
use super::program_header::PT_LOAD;
use super::Elf;
use crate::error::{Error, Result};
use crate::strtab;

impl Elf {
    /// First LOAD whose file range starts exactly at `offset`, the marker of
    /// an isolated table.
    fn isolated_load_at(&self, offset: u64) -> Result<Option<usize>> {
        for i in 0..self.phnum() {
            let phdr = self.phdr(i)?;
            if phdr.p_type == PT_LOAD && phdr.p_offset == offset {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Append `name` to the string table at section `index`, growing or
    /// moving the table as needed. Returns the new name's table offset.
    fn append_to_table(&mut self, index: usize, name: &str, track_addr: bool) -> Result<u64> {
        let shdr = self.shdr(index)?;
        let old_size = shdr.sh_size;
        let needed = name.len() as u64 + 1;

        if let Some(seg) = self.isolated_load_at(shdr.sh_offset)? {
            let phdr = self.phdr(seg)?;
            if phdr.p_filesz.saturating_sub(shdr.sh_size) >= needed {
                debug!("append name: slack in isolated load {seg}");
                self.put_str(shdr.sh_offset + shdr.sh_size, name)?;
                let mut grown = shdr;
                grown.sh_size += needed;
                self.set_shdr(index, grown)?;
                return Ok(old_size);
            }
            debug!("append name: growing isolated load {seg}");
            self.expand_segment_load(seg, needed)
                .map_err(|_| Error::ExpandSegment)?;
            let fresh = self.shdr(index)?;
            self.put_str(fresh.sh_offset + old_size, name)?;
            return Ok(old_size);
        }

        debug!("append name: table not isolated, allocating a segment");
        let seg = self
            .add_segment(old_size + needed)
            .map_err(|_| Error::AddSegment)?;
        let phdr = self.phdr(seg)?;
        // the table may itself have been shifted by the allocation
        let mut fresh = self.shdr(index)?;
        self.copy_within(fresh.sh_offset, old_size, phdr.p_offset)?;
        self.put_str(phdr.p_offset + old_size, name)?;
        fresh.sh_offset = phdr.p_offset;
        if track_addr {
            fresh.sh_addr = phdr.p_vaddr;
        }
        fresh.sh_size = old_size + needed;
        self.set_shdr(index, fresh)?;
        self.rederive()?;
        Ok(old_size)
    }

    /// Append `name` to `.shstrtab`; returns its offset there.
    pub fn add_shstr_name(&mut self, name: &str) -> Result<u64> {
        let index = self
            .shstrtab_index()
            .ok_or_else(|| Error::SectionNotFound(".shstrtab".into()))?;
        self.append_to_table(index, name, false)
    }

    /// Append `name` to `.strtab`; returns its offset there.
    pub fn add_strtab_name(&mut self, name: &str) -> Result<u64> {
        let index = self
            .strtab_index()
            .ok_or_else(|| Error::SectionNotFound(".strtab".into()))?;
        self.append_to_table(index, name, false)
    }

    /// Append `name` to `.dynstr` and refresh `DT_STRTAB`/`DT_STRSZ`;
    /// returns the name's offset in the table.
    pub fn add_dynstr_name(&mut self, name: &str) -> Result<u64> {
        let index = self
            .dynstr_index()
            .ok_or_else(|| Error::SectionNotFound(".dynstr".into()))?;
        let shdr = self.shdr(index)?;
        let old_size = shdr.sh_size;
        let mut content = name.as_bytes().to_vec();
        content.push(0);
        self.expand_content(shdr.sh_offset, shdr.sh_size, &content)?;

        let fresh = self.shdr(index)?;
        if self.dynamic_index_by_tag(DT_STRTAB).is_ok() {
            self.set_dynamic_value_by_tag(DT_STRTAB, fresh.sh_addr)?;
        }
        if self.dynamic_index_by_tag(DT_STRSZ).is_ok() {
            self.set_dynamic_value_by_tag(DT_STRSZ, fresh.sh_size)?;
        }
        Ok(old_size)
    }

    fn name_offset(value: u64) -> Result<u32> {
        u32::try_from(value)
            .map_err(|_| Error::Malformed(format!("string table offset {value:#x} overflows")))
    }

    /// Rename section `old` to `new`.
    pub fn rename_section(&mut self, old: &str, new: &str) -> Result<()> {
        let index = self.section_index_by_name(old)?;
        if new.len() <= old.len() {
            let table = self
                .shstrtab_index()
                .ok_or_else(|| Error::SectionNotFound(".shstrtab".into()))?;
            let names = self.shdr(table)?;
            let at = names.sh_offset + self.shdr(index)?.sh_name as u64;
            let range = self.span(at, 1)?;
            return strtab::overwrite_str(self.bytes_mut_at(range.start), 0, new);
        }
        let offset = self.add_shstr_name(new)?;
        let mut shdr = self.shdr(index)?;
        shdr.sh_name = Self::name_offset(offset)?;
        self.set_shdr(index, shdr)
    }

    /// Rename dynamic symbol `old` to `new`.
    pub fn rename_dynsym(&mut self, old: &str, new: &str) -> Result<()> {
        let sym_index = self.dynsym_index_by_name(old)?;
        if new.len() <= old.len() {
            let table = self
                .dynstr_index()
                .ok_or_else(|| Error::SectionNotFound(".dynstr".into()))?;
            let names = self.shdr(table)?;
            let at = names.sh_offset + self.dynsym_at(sym_index)?.st_name as u64;
            let range = self.span(at, 1)?;
            return strtab::overwrite_str(self.bytes_mut_at(range.start), 0, new);
        }
        let offset = self.add_dynstr_name(new)?;
        let mut sym = self.dynsym_at(sym_index)?;
        sym.st_name = Self::name_offset(offset)?;
        self.set_dynsym(sym_index, sym)
    }

    /// Rename static symbol `old` to `new`.
    pub fn rename_symbol(&mut self, old: &str, new: &str) -> Result<()> {
        let sym_index = self.symtab_index_by_name(old)?;
        if new.len() <= old.len() {
            let table = self
                .strtab_index()
                .ok_or_else(|| Error::SectionNotFound(".strtab".into()))?;
            let names = self.shdr(table)?;
            let at = names.sh_offset + self.symtab_at(sym_index)?.st_name as u64;
            let range = self.span(at, 1)?;
            return strtab::overwrite_str(self.bytes_mut_at(range.start), 0, new);
        }
        let offset = self.add_strtab_name(new)?;
        let mut sym = self.symtab_at(sym_index)?;
        sym.st_name = Self::name_offset(offset)?;
        self.set_symtab(sym_index, sym)
    }

    /// Rewrite the string a name-valued dynamic entry (`DT_NEEDED`,
    /// `DT_SONAME`, ...) points at.
    pub fn set_dynamic_str(&mut self, index: usize, name: &str) -> Result<()> {
        let entry = self.dyn_at(index)?;
        let table = self
            .dynstr_index()
            .ok_or_else(|| Error::SectionNotFound(".dynstr".into()))?;
        let names = self.shdr(table)?;
        let at = names.sh_offset + entry.d_val;
        let old_len = strtab::str_len(self.bytes(), self.span(at, 1)?.start)?;
        if name.len() <= old_len {
            let range = self.span(at, 1)?;
            return strtab::overwrite_str(self.bytes_mut_at(range.start), 0, name);
        }
        let offset = self.add_dynstr_name(name)?;
        let mut entry = self.dyn_at(index)?;
        entry.d_val = offset;
        self.set_dyn(index, entry)
    }

    // Scoped mutable access used by the in-place rename paths.
    fn bytes_mut_at(&mut self, at: usize) -> &mut [u8] {
        &mut self.image_bytes_mut()[at..]
    }
}
