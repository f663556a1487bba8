//! Section headers, the linker's view of the file.

use scroll::ctx::{self, SizeWith};
use scroll::{Pread, Pwrite};

use crate::container::{narrow, Ctx};
use crate::error;

/// Undefined section.
pub const SHN_UNDEF: u16 = 0;
/// Associated symbol is absolute.
pub const SHN_ABS: u16 = 0xfff1;
/// Associated symbol is common.
pub const SHN_COMMON: u16 = 0xfff2;

/// Section header table entry unused.
pub const SHT_NULL: u32 = 0;
/// Program data.
pub const SHT_PROGBITS: u32 = 1;
/// Symbol table.
pub const SHT_SYMTAB: u32 = 2;
/// String table.
pub const SHT_STRTAB: u32 = 3;
/// Relocation entries with addends.
pub const SHT_RELA: u32 = 4;
/// Symbol hash table.
pub const SHT_HASH: u32 = 5;
/// Dynamic linking information.
pub const SHT_DYNAMIC: u32 = 6;
/// Notes.
pub const SHT_NOTE: u32 = 7;
/// Program space with no data (bss).
pub const SHT_NOBITS: u32 = 8;
/// Relocation entries, no addends.
pub const SHT_REL: u32 = 9;
/// Dynamic linker symbol table.
pub const SHT_DYNSYM: u32 = 11;
/// Array of constructors.
pub const SHT_INIT_ARRAY: u32 = 14;
/// Array of destructors.
pub const SHT_FINI_ARRAY: u32 = 15;
/// GNU-style hash table.
pub const SHT_GNU_HASH: u32 = 0x6ffffff6;
/// Version definition section.
pub const SHT_GNU_VERDEF: u32 = 0x6ffffffd;
/// Version needs section.
pub const SHT_GNU_VERNEED: u32 = 0x6ffffffe;
/// Version symbol table.
pub const SHT_GNU_VERSYM: u32 = 0x6fffffff;

/// Writable.
pub const SHF_WRITE: u64 = 1 << 0;
/// Occupies memory during execution.
pub const SHF_ALLOC: u64 = 1 << 1;
/// Executable.
pub const SHF_EXECINSTR: u64 = 1 << 2;

/// Size of a 32-bit section header.
pub const SIZEOF_SHDR32: usize = 40;
/// Size of a 64-bit section header.
pub const SIZEOF_SHDR64: usize = 64;

/// Convert an SHT value to its associated string.
pub fn sht_to_str(sht: u32) -> &'static str {
    match sht {
        SHT_NULL => "SHT_NULL",
        SHT_PROGBITS => "SHT_PROGBITS",
        SHT_SYMTAB => "SHT_SYMTAB",
        SHT_STRTAB => "SHT_STRTAB",
        SHT_RELA => "SHT_RELA",
        SHT_HASH => "SHT_HASH",
        SHT_DYNAMIC => "SHT_DYNAMIC",
        SHT_NOTE => "SHT_NOTE",
        SHT_NOBITS => "SHT_NOBITS",
        SHT_REL => "SHT_REL",
        SHT_DYNSYM => "SHT_DYNSYM",
        SHT_INIT_ARRAY => "SHT_INIT_ARRAY",
        SHT_FINI_ARRAY => "SHT_FINI_ARRAY",
        SHT_GNU_HASH => "SHT_GNU_HASH",
        SHT_GNU_VERDEF => "SHT_GNU_VERDEF",
        SHT_GNU_VERNEED => "SHT_GNU_VERNEED",
        SHT_GNU_VERSYM => "SHT_GNU_VERSYM",
        _ => "UNKNOWN_SHT",
    }
}

/// A unified section header.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionHeader {
    /// Section name (string tbl index)
    pub sh_name: u32,
    /// Section type
    pub sh_type: u32,
    /// Section flags
    pub sh_flags: u64,
    /// Section virtual addr at execution
    pub sh_addr: u64,
    /// Section file offset
    pub sh_offset: u64,
    /// Section size in bytes
    pub sh_size: u64,
    /// Link to another section
    pub sh_link: u32,
    /// Additional section information
    pub sh_info: u32,
    /// Section alignment
    pub sh_addralign: u64,
    /// Entry size if section holds table
    pub sh_entsize: u64,
}

impl SectionHeader {
    /// File range end, `sh_offset + sh_size`
    #[inline]
    pub fn file_end(&self) -> u64 {
        self.sh_offset + self.sh_size
    }
    /// Whether the section occupies file bytes
    #[inline]
    pub fn has_file_data(&self) -> bool {
        self.sh_type != SHT_NOBITS && self.sh_type != SHT_NULL
    }
}

impl SizeWith<Ctx> for SectionHeader {
    fn size_with(ctx: &Ctx) -> usize {
        if ctx.is_64() {
            SIZEOF_SHDR64
        } else {
            SIZEOF_SHDR32
        }
    }
}

impl ctx::TryFromCtx<'_, Ctx> for SectionHeader {
    type Error = error::Error;
    fn try_from_ctx(src: &[u8], ctx: Ctx) -> Result<(Self, usize), Self::Error> {
        let le = ctx.le;
        let offset = &mut 0;
        let mut shdr = SectionHeader::default();
        shdr.sh_name = src.gread_with(offset, le)?;
        shdr.sh_type = src.gread_with(offset, le)?;
        if ctx.is_64() {
            shdr.sh_flags = src.gread_with::<u64>(offset, le)?;
            shdr.sh_addr = src.gread_with::<u64>(offset, le)?;
            shdr.sh_offset = src.gread_with::<u64>(offset, le)?;
            shdr.sh_size = src.gread_with::<u64>(offset, le)?;
            shdr.sh_link = src.gread_with(offset, le)?;
            shdr.sh_info = src.gread_with(offset, le)?;
            shdr.sh_addralign = src.gread_with::<u64>(offset, le)?;
            shdr.sh_entsize = src.gread_with::<u64>(offset, le)?;
        } else {
            shdr.sh_flags = src.gread_with::<u32>(offset, le)? as u64;
            shdr.sh_addr = src.gread_with::<u32>(offset, le)? as u64;
            shdr.sh_offset = src.gread_with::<u32>(offset, le)? as u64;
            shdr.sh_size = src.gread_with::<u32>(offset, le)? as u64;
            shdr.sh_link = src.gread_with(offset, le)?;
            shdr.sh_info = src.gread_with(offset, le)?;
            shdr.sh_addralign = src.gread_with::<u32>(offset, le)? as u64;
            shdr.sh_entsize = src.gread_with::<u32>(offset, le)? as u64;
        }
        Ok((shdr, *offset))
    }
}

impl ctx::TryIntoCtx<Ctx> for SectionHeader {
    type Error = error::Error;
    fn try_into_ctx(self, dst: &mut [u8], ctx: Ctx) -> Result<usize, Self::Error> {
        let le = ctx.le;
        let offset = &mut 0;
        dst.gwrite_with(self.sh_name, offset, le)?;
        dst.gwrite_with(self.sh_type, offset, le)?;
        if ctx.is_64() {
            dst.gwrite_with(self.sh_flags, offset, le)?;
            dst.gwrite_with(self.sh_addr, offset, le)?;
            dst.gwrite_with(self.sh_offset, offset, le)?;
            dst.gwrite_with(self.sh_size, offset, le)?;
            dst.gwrite_with(self.sh_link, offset, le)?;
            dst.gwrite_with(self.sh_info, offset, le)?;
            dst.gwrite_with(self.sh_addralign, offset, le)?;
            dst.gwrite_with(self.sh_entsize, offset, le)?;
        } else {
            dst.gwrite_with(narrow(self.sh_flags)?, offset, le)?;
            dst.gwrite_with(narrow(self.sh_addr)?, offset, le)?;
            dst.gwrite_with(narrow(self.sh_offset)?, offset, le)?;
            dst.gwrite_with(narrow(self.sh_size)?, offset, le)?;
            dst.gwrite_with(self.sh_link, offset, le)?;
            dst.gwrite_with(self.sh_info, offset, le)?;
            dst.gwrite_with(narrow(self.sh_addralign)?, offset, le)?;
            dst.gwrite_with(narrow(self.sh_entsize)?, offset, le)?;
        }
        Ok(*offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Class;
    use scroll::Endian;

    #[test]
    fn shdr_roundtrip_both_classes() {
        let shdr = SectionHeader {
            sh_name: 27,
            sh_type: SHT_PROGBITS,
            sh_flags: SHF_ALLOC | SHF_EXECINSTR,
            sh_addr: 0x4011a0,
            sh_offset: 0x11a0,
            sh_size: 0x321,
            sh_link: 0,
            sh_info: 0,
            sh_addralign: 16,
            sh_entsize: 0,
        };
        for ctx in [
            Ctx::new(Class::Class64, Endian::Little),
            Ctx::new(Class::Class32, Endian::Little),
        ] {
            let mut buf = [0u8; SIZEOF_SHDR64];
            let size = buf.pwrite_with(shdr, 0, ctx).unwrap();
            assert_eq!(size, SectionHeader::size_with(&ctx));
            let back: SectionHeader = buf.pread_with(0, ctx).unwrap();
            assert_eq!(back, shdr);
        }
    }
}
