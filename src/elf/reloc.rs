//! Relocation entries, with and without addends.
//!
//! `r_info` packs the symbol index and relocation type with a class-dependent
//! shift: 8 bits for 32-bit objects, 32 bits for 64-bit objects.

use scroll::ctx::{self, SizeWith};
use scroll::{Pread, Pwrite};

use crate::container::{narrow, Class, Ctx};
use crate::error;

/// No reloc.
pub const R_X86_64_NONE: u32 = 0;
/// Direct 64 bit.
pub const R_X86_64_64: u32 = 1;
/// Create GOT entry.
pub const R_X86_64_GLOB_DAT: u32 = 6;
/// Create PLT entry.
pub const R_X86_64_JUMP_SLOT: u32 = 7;
/// Adjust by program base.
pub const R_X86_64_RELATIVE: u32 = 8;
/// Adjust indirectly by program base.
pub const R_X86_64_IRELATIVE: u32 = 37;

/// Size of a 32-bit Rel entry.
pub const SIZEOF_REL32: usize = 8;
/// Size of a 64-bit Rel entry.
pub const SIZEOF_REL64: usize = 16;
/// Size of a 32-bit Rela entry.
pub const SIZEOF_RELA32: usize = 12;
/// Size of a 64-bit Rela entry.
pub const SIZEOF_RELA64: usize = 24;

/// The symbol index half of `r_info`.
#[inline]
pub fn r_sym(info: u64, class: Class) -> u32 {
    match class {
        Class::Class32 => (info >> 8) as u32,
        Class::Class64 => (info >> 32) as u32,
    }
}

/// The relocation type half of `r_info`.
#[inline]
pub fn r_type(info: u64, class: Class) -> u32 {
    match class {
        Class::Class32 => (info & 0xff) as u32,
        Class::Class64 => (info & 0xffff_ffff) as u32,
    }
}

/// Pack a symbol index and relocation type into `r_info`.
#[inline]
pub fn r_info(sym: u32, typ: u32, class: Class) -> u64 {
    match class {
        Class::Class32 => ((sym as u64) << 8) | (typ as u64 & 0xff),
        Class::Class64 => ((sym as u64) << 32) | typ as u64,
    }
}

/// A unified relocation with addend.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rela {
    /// Address the relocation patches
    pub r_offset: u64,
    /// Symbol index and relocation type
    pub r_info: u64,
    /// Constant addend
    pub r_addend: i64,
}

/// A unified relocation without addend.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rel {
    /// Address the relocation patches
    pub r_offset: u64,
    /// Symbol index and relocation type
    pub r_info: u64,
}

impl SizeWith<Ctx> for Rela {
    fn size_with(ctx: &Ctx) -> usize {
        if ctx.is_64() {
            SIZEOF_RELA64
        } else {
            SIZEOF_RELA32
        }
    }
}

impl SizeWith<Ctx> for Rel {
    fn size_with(ctx: &Ctx) -> usize {
        if ctx.is_64() {
            SIZEOF_REL64
        } else {
            SIZEOF_REL32
        }
    }
}

impl ctx::TryFromCtx<'_, Ctx> for Rela {
    type Error = error::Error;
    fn try_from_ctx(src: &[u8], ctx: Ctx) -> Result<(Self, usize), Self::Error> {
        let le = ctx.le;
        let offset = &mut 0;
        let rela = if ctx.is_64() {
            Rela {
                r_offset: src.gread_with::<u64>(offset, le)?,
                r_info: src.gread_with::<u64>(offset, le)?,
                r_addend: src.gread_with::<i64>(offset, le)?,
            }
        } else {
            Rela {
                r_offset: src.gread_with::<u32>(offset, le)? as u64,
                r_info: src.gread_with::<u32>(offset, le)? as u64,
                r_addend: src.gread_with::<i32>(offset, le)? as i64,
            }
        };
        Ok((rela, *offset))
    }
}

impl ctx::TryIntoCtx<Ctx> for Rela {
    type Error = error::Error;
    fn try_into_ctx(self, dst: &mut [u8], ctx: Ctx) -> Result<usize, Self::Error> {
        let le = ctx.le;
        let offset = &mut 0;
        if ctx.is_64() {
            dst.gwrite_with(self.r_offset, offset, le)?;
            dst.gwrite_with(self.r_info, offset, le)?;
            dst.gwrite_with(self.r_addend, offset, le)?;
        } else {
            dst.gwrite_with(narrow(self.r_offset)?, offset, le)?;
            dst.gwrite_with(narrow(self.r_info)?, offset, le)?;
            dst.gwrite_with(self.r_addend as i32, offset, le)?;
        }
        Ok(*offset)
    }
}

impl ctx::TryFromCtx<'_, Ctx> for Rel {
    type Error = error::Error;
    fn try_from_ctx(src: &[u8], ctx: Ctx) -> Result<(Self, usize), Self::Error> {
        let le = ctx.le;
        let offset = &mut 0;
        let rel = if ctx.is_64() {
            Rel {
                r_offset: src.gread_with::<u64>(offset, le)?,
                r_info: src.gread_with::<u64>(offset, le)?,
            }
        } else {
            Rel {
                r_offset: src.gread_with::<u32>(offset, le)? as u64,
                r_info: src.gread_with::<u32>(offset, le)? as u64,
            }
        };
        Ok((rel, *offset))
    }
}

impl ctx::TryIntoCtx<Ctx> for Rel {
    type Error = error::Error;
    fn try_into_ctx(self, dst: &mut [u8], ctx: Ctx) -> Result<usize, Self::Error> {
        let le = ctx.le;
        let offset = &mut 0;
        if ctx.is_64() {
            dst.gwrite_with(self.r_offset, offset, le)?;
            dst.gwrite_with(self.r_info, offset, le)?;
        } else {
            dst.gwrite_with(narrow(self.r_offset)?, offset, le)?;
            dst.gwrite_with(narrow(self.r_info)?, offset, le)?;
        }
        Ok(*offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scroll::Endian;

    #[test]
    fn info_packing_per_class() {
        let info64 = r_info(5, R_X86_64_JUMP_SLOT, Class::Class64);
        assert_eq!(info64, 0x5_0000_0007);
        assert_eq!(r_sym(info64, Class::Class64), 5);
        assert_eq!(r_type(info64, Class::Class64), R_X86_64_JUMP_SLOT);

        let info32 = r_info(5, 7, Class::Class32);
        assert_eq!(info32, 0x507);
        assert_eq!(r_sym(info32, Class::Class32), 5);
        assert_eq!(r_type(info32, Class::Class32), 7);
    }

    #[test]
    fn rela_roundtrip_negative_addend() {
        let rela = Rela {
            r_offset: 0x3fe0,
            r_info: r_info(2, R_X86_64_GLOB_DAT, Class::Class64),
            r_addend: -16,
        };
        let ctx = Ctx::new(Class::Class64, Endian::Little);
        let mut buf = [0u8; SIZEOF_RELA64];
        buf.pwrite_with(rela, 0, ctx).unwrap();
        let back: Rela = buf.pread_with(0, ctx).unwrap();
        assert_eq!(back, rela);

        let ctx32 = Ctx::new(Class::Class32, Endian::Little);
        let rela32 = Rela {
            r_offset: 0x3fe0,
            r_info: r_info(2, 6, Class::Class32),
            r_addend: -16,
        };
        let mut buf = [0u8; SIZEOF_RELA32];
        buf.pwrite_with(rela32, 0, ctx32).unwrap();
        let back: Rela = buf.pread_with(0, ctx32).unwrap();
        assert_eq!(back, rela32);
    }
}
