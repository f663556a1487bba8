//! Program headers, the loader's view of the file.

use scroll::ctx::{self, SizeWith};
use scroll::{Pread, Pwrite};

use crate::container::{narrow, Ctx};
use crate::error;

/// Program header table entry unused.
pub const PT_NULL: u32 = 0;
/// Loadable program segment.
pub const PT_LOAD: u32 = 1;
/// Dynamic linking information.
pub const PT_DYNAMIC: u32 = 2;
/// Program interpreter.
pub const PT_INTERP: u32 = 3;
/// Auxiliary information.
pub const PT_NOTE: u32 = 4;
/// Reserved.
pub const PT_SHLIB: u32 = 5;
/// Entry for header table itself.
pub const PT_PHDR: u32 = 6;
/// Thread-local storage segment.
pub const PT_TLS: u32 = 7;
/// GCC .eh_frame_hdr segment.
pub const PT_GNU_EH_FRAME: u32 = 0x6474e550;
/// Indicates stack executability.
pub const PT_GNU_STACK: u32 = 0x6474e551;
/// Read-only after relocation.
pub const PT_GNU_RELRO: u32 = 0x6474e552;
/// GNU property notes.
pub const PT_GNU_PROPERTY: u32 = 0x6474e553;

/// Segment is executable.
pub const PF_X: u32 = 1 << 0;
/// Segment is writable.
pub const PF_W: u32 = 1 << 1;
/// Segment is readable.
pub const PF_R: u32 = 1 << 2;

/// Size of a 32-bit program header.
pub const SIZEOF_PHDR32: usize = 32;
/// Size of a 64-bit program header.
pub const SIZEOF_PHDR64: usize = 56;

/// Convert a PT value to its associated string.
pub fn pt_to_str(pt: u32) -> &'static str {
    match pt {
        PT_NULL => "PT_NULL",
        PT_LOAD => "PT_LOAD",
        PT_DYNAMIC => "PT_DYNAMIC",
        PT_INTERP => "PT_INTERP",
        PT_NOTE => "PT_NOTE",
        PT_SHLIB => "PT_SHLIB",
        PT_PHDR => "PT_PHDR",
        PT_TLS => "PT_TLS",
        PT_GNU_EH_FRAME => "PT_GNU_EH_FRAME",
        PT_GNU_STACK => "PT_GNU_STACK",
        PT_GNU_RELRO => "PT_GNU_RELRO",
        PT_GNU_PROPERTY => "PT_GNU_PROPERTY",
        _ => "UNKNOWN_PT",
    }
}

/// A unified program header.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgramHeader {
    /// Segment type
    pub p_type: u32,
    /// Segment flags
    pub p_flags: u32,
    /// Segment file offset
    pub p_offset: u64,
    /// Segment virtual address
    pub p_vaddr: u64,
    /// Segment physical address
    pub p_paddr: u64,
    /// Segment size in file
    pub p_filesz: u64,
    /// Segment size in memory
    pub p_memsz: u64,
    /// Segment alignment
    pub p_align: u64,
}

impl ProgramHeader {
    /// Whether the segment is mapped executable
    #[inline]
    pub fn is_executable(&self) -> bool {
        self.p_flags & PF_X != 0
    }
    /// File range end, `p_offset + p_filesz`
    #[inline]
    pub fn file_end(&self) -> u64 {
        self.p_offset + self.p_filesz
    }
    /// Memory range end, `p_vaddr + p_memsz`
    #[inline]
    pub fn mem_end(&self) -> u64 {
        self.p_vaddr + self.p_memsz
    }
    /// Whether `offset` falls inside the segment's file range
    #[inline]
    pub fn covers_offset(&self, offset: u64) -> bool {
        offset >= self.p_offset && offset < self.file_end()
    }
    /// Whether `addr` falls inside the segment's memory range
    #[inline]
    pub fn covers_addr(&self, addr: u64) -> bool {
        addr >= self.p_vaddr && addr < self.mem_end()
    }
}

impl SizeWith<Ctx> for ProgramHeader {
    fn size_with(ctx: &Ctx) -> usize {
        if ctx.is_64() {
            SIZEOF_PHDR64
        } else {
            SIZEOF_PHDR32
        }
    }
}

impl ctx::TryFromCtx<'_, Ctx> for ProgramHeader {
    type Error = error::Error;
    fn try_from_ctx(src: &[u8], ctx: Ctx) -> Result<(Self, usize), Self::Error> {
        let le = ctx.le;
        let offset = &mut 0;
        let mut phdr = ProgramHeader::default();
        phdr.p_type = src.gread_with(offset, le)?;
        if ctx.is_64() {
            // p_flags sits after p_type on 64-bit
            phdr.p_flags = src.gread_with(offset, le)?;
            phdr.p_offset = src.gread_with::<u64>(offset, le)?;
            phdr.p_vaddr = src.gread_with::<u64>(offset, le)?;
            phdr.p_paddr = src.gread_with::<u64>(offset, le)?;
            phdr.p_filesz = src.gread_with::<u64>(offset, le)?;
            phdr.p_memsz = src.gread_with::<u64>(offset, le)?;
            phdr.p_align = src.gread_with::<u64>(offset, le)?;
        } else {
            // p_flags sits after p_memsz on 32-bit
            phdr.p_offset = src.gread_with::<u32>(offset, le)? as u64;
            phdr.p_vaddr = src.gread_with::<u32>(offset, le)? as u64;
            phdr.p_paddr = src.gread_with::<u32>(offset, le)? as u64;
            phdr.p_filesz = src.gread_with::<u32>(offset, le)? as u64;
            phdr.p_memsz = src.gread_with::<u32>(offset, le)? as u64;
            phdr.p_flags = src.gread_with(offset, le)?;
            phdr.p_align = src.gread_with::<u32>(offset, le)? as u64;
        }
        Ok((phdr, *offset))
    }
}

impl ctx::TryIntoCtx<Ctx> for ProgramHeader {
    type Error = error::Error;
    fn try_into_ctx(self, dst: &mut [u8], ctx: Ctx) -> Result<usize, Self::Error> {
        let le = ctx.le;
        let offset = &mut 0;
        dst.gwrite_with(self.p_type, offset, le)?;
        if ctx.is_64() {
            dst.gwrite_with(self.p_flags, offset, le)?;
            dst.gwrite_with(self.p_offset, offset, le)?;
            dst.gwrite_with(self.p_vaddr, offset, le)?;
            dst.gwrite_with(self.p_paddr, offset, le)?;
            dst.gwrite_with(self.p_filesz, offset, le)?;
            dst.gwrite_with(self.p_memsz, offset, le)?;
            dst.gwrite_with(self.p_align, offset, le)?;
        } else {
            dst.gwrite_with(narrow(self.p_offset)?, offset, le)?;
            dst.gwrite_with(narrow(self.p_vaddr)?, offset, le)?;
            dst.gwrite_with(narrow(self.p_paddr)?, offset, le)?;
            dst.gwrite_with(narrow(self.p_filesz)?, offset, le)?;
            dst.gwrite_with(narrow(self.p_memsz)?, offset, le)?;
            dst.gwrite_with(self.p_flags, offset, le)?;
            dst.gwrite_with(narrow(self.p_align)?, offset, le)?;
        }
        Ok(*offset)
    }
}
