//! The symbol and dynamic editor: appending `.dynsym` entries, growing the
//! dynamic array, and rebuilding the GNU hash table.

use log::{debug, info};

use scroll::ctx::SizeWith;
use scroll::{Pread, Pwrite};

use super::dynamic::{Dyn, DF_1_NOW, DT_FLAGS_1, DT_GNU_HASH, DT_NULL, DT_SYMTAB};
use super::gnu_hash::{self, GnuHashHeader, SIZEOF_GNU_HASH_HEADER};
use super::program_header::PT_DYNAMIC;
use super::section_header::SHN_ABS;
use super::sym::{st_info, Sym, STB_GLOBAL, STT_FUNC, STV_DEFAULT};
use super::Elf;
use crate::error::{Error, Result};

impl Elf {
    /// Add a dynamic entry, preferring a free `DT_NULL` slot and growing the
    /// array into fresh space otherwise.
    pub fn add_dynamic(&mut self, tag: u64, value: u64) -> Result<()> {
        if let Ok(index) = self.dynamic_index_by_tag(DT_NULL) {
            debug!("add dynamic: reusing DT_NULL slot {index}");
            return self.set_dyn(index, Dyn { d_tag: tag, d_val: value });
        }
        self.grow_dynamic(tag, value)
    }

    /// Move `.dynamic` into a new segment with room for one more entry.
    fn grow_dynamic(&mut self, tag: u64, value: u64) -> Result<()> {
        let entry_size = Dyn::size_with(&self.ctx()) as u64;
        let count = self.dyn_count() as u64;
        let old = self
            .dynamic
            .ok_or(Error::SegmentNotFound(PT_DYNAMIC))?;
        let new_size = (count + 1) * entry_size;
        let section = self.section_index_by_name(".dynamic")?;
        let segment = self.segment_index_by_type(PT_DYNAMIC)?;

        info!("add dynamic: moving .dynamic for a {new_size:#x} byte array");
        let added = self.add_segment(new_size).map_err(|_| Error::AddSegment)?;
        let home = self.phdr(added)?;
        self.copy_within(old.offset, count * entry_size, home.p_offset)?;
        let slot = (home.p_offset + count * entry_size) as usize;
        let ctx = self.ctx();
        self.image_bytes_mut()
            .pwrite_with(Dyn { d_tag: tag, d_val: value }, slot, ctx)?;

        let mut shdr = self.shdr(section)?;
        shdr.sh_offset = home.p_offset;
        shdr.sh_addr = home.p_vaddr;
        shdr.sh_size = new_size;
        self.set_shdr(section, shdr)?;

        let mut phdr = self.phdr(segment)?;
        phdr.p_offset = home.p_offset;
        phdr.p_vaddr = home.p_vaddr;
        phdr.p_paddr = home.p_vaddr;
        phdr.p_filesz = new_size;
        phdr.p_memsz = new_size;
        self.set_phdr(segment, phdr)?;

        self.rederive()
    }

    /// Export `name` at `value` by appending a global function symbol to
    /// `.dynsym`, rebuilding the GNU hash, and forcing eager binding —
    /// the exe-to-shared-object conversion.
    pub fn add_dynsym(&mut self, name: &str, value: u64, code_size: u64) -> Result<()> {
        info!("add dynsym: exporting {name} at {value:#x}");
        let name_offset = self.add_dynstr_name(name)?;

        let dynsym = self
            .dynsym_index()
            .ok_or_else(|| Error::SectionNotFound(".dynsym".into()))?;
        let table = self.shdr(dynsym)?;
        let sym = Sym {
            st_name: u32::try_from(name_offset)
                .map_err(|_| Error::Malformed("dynstr offset overflows st_name".into()))?,
            st_info: st_info(STB_GLOBAL, STT_FUNC),
            st_other: STV_DEFAULT,
            st_shndx: SHN_ABS,
            st_value: value,
            st_size: code_size,
        };
        let ctx = self.ctx();
        let mut entry = vec![0u8; Sym::size_with(&ctx)];
        entry.pwrite_with(sym, 0, ctx)?;
        self.expand_content(table.sh_offset, table.sh_size, &entry)?;

        let fresh = self.shdr(dynsym)?;
        if self.dynamic_index_by_tag(DT_SYMTAB).is_ok() {
            self.set_dynamic_value_by_tag(DT_SYMTAB, fresh.sh_addr)?;
        }

        self.refresh_gnu_hash()?;

        match self.dynamic_index_by_tag(DT_FLAGS_1) {
            Ok(index) => {
                let mut flags = self.dyn_at(index)?;
                flags.d_val |= DF_1_NOW;
                self.set_dyn(index, flags)?;
            }
            Err(_) => self.add_dynamic(DT_FLAGS_1, DF_1_NOW)?,
        }
        Ok(())
    }

    /// Rebuild the GNU hash table over the current `.dynsym`, in place when
    /// it fits and in a fresh segment otherwise.
    pub fn refresh_gnu_hash(&mut self) -> Result<()> {
        let (section, shdr) = self.section_by_name(".gnu.hash")?;
        if shdr.sh_size < SIZEOF_GNU_HASH_HEADER as u64 {
            return Err(Error::OutOfBounds(shdr.sh_size));
        }
        let ctx = self.ctx();
        let header: GnuHashHeader = self
            .read_bytes(shdr.sh_offset, SIZEOF_GNU_HASH_HEADER as u64)?
            .pread_with(0, ctx.le)?;
        let names = self.dynsym_names()?;
        let table = gnu_hash::build(&header, &names, ctx)?;

        if table.len() as u64 > shdr.sh_size {
            info!(
                "refresh hash: {} bytes outgrow the section, allocating a segment",
                table.len()
            );
            let seg = self.add_segment(table.len() as u64).map_err(|_| Error::AddSegment)?;
            let home = self.phdr(seg)?;
            self.write_bytes(home.p_offset, &table)?;
            let mut fresh = self.shdr(section)?;
            fresh.sh_offset = home.p_offset;
            fresh.sh_addr = home.p_vaddr;
            fresh.sh_size = table.len() as u64;
            self.set_shdr(section, fresh)?;
            if self.dynamic_index_by_tag(DT_GNU_HASH).is_ok() {
                self.set_dynamic_value_by_tag(DT_GNU_HASH, home.p_vaddr)?;
            }
            self.rederive()?;
        } else {
            debug!("refresh hash: rebuilt in place ({} bytes)", table.len());
            self.write_bytes(shdr.sh_offset, &table)?;
        }
        Ok(())
    }

    /// `dl_new_hash`-style lookup of `name` through the file's GNU hash
    /// table; returns the matching `.dynsym` index.
    pub fn gnu_hash_lookup(&self, name: &str) -> Result<Option<usize>> {
        let (_, shdr) = self.section_by_name(".gnu.hash")?;
        let table = self.read_bytes(shdr.sh_offset, shdr.sh_size)?.to_vec();
        gnu_hash::lookup(&table, self.ctx(), self.dynsym_count(), name, |index| {
            self.dynsym_name(index)
        })
    }
}
