//! Symbol table entries.

use scroll::ctx::{self, SizeWith};
use scroll::{Pread, Pwrite};

use crate::container::{narrow, Ctx};
use crate::error;

/// Local symbol.
pub const STB_LOCAL: u8 = 0;
/// Global symbol.
pub const STB_GLOBAL: u8 = 1;
/// Weak symbol.
pub const STB_WEAK: u8 = 2;

/// Symbol type is unspecified.
pub const STT_NOTYPE: u8 = 0;
/// Symbol is a data object.
pub const STT_OBJECT: u8 = 1;
/// Symbol is a code object.
pub const STT_FUNC: u8 = 2;
/// Symbol associated with a section.
pub const STT_SECTION: u8 = 3;
/// Symbol's name is file name.
pub const STT_FILE: u8 = 4;
/// Symbol is thread-local data object.
pub const STT_TLS: u8 = 6;

/// Default symbol visibility.
pub const STV_DEFAULT: u8 = 0;

/// Size of a 32-bit symbol.
pub const SIZEOF_SYM32: usize = 16;
/// Size of a 64-bit symbol.
pub const SIZEOF_SYM64: usize = 24;

/// The binding half of `st_info`.
#[inline(always)]
pub fn st_bind(info: u8) -> u8 {
    info >> 4
}

/// The type half of `st_info`.
#[inline(always)]
pub fn st_type(info: u8) -> u8 {
    info & 0xf
}

/// Pack binding and type into `st_info`.
#[inline(always)]
pub fn st_info(bind: u8, typ: u8) -> u8 {
    (bind << 4) | (typ & 0xf)
}

/// Convert an STB value to its associated string.
#[inline]
pub fn bind_to_str(bind: u8) -> &'static str {
    match bind {
        STB_LOCAL => "LOCAL",
        STB_GLOBAL => "GLOBAL",
        STB_WEAK => "WEAK",
        _ => "UNKNOWN_STB",
    }
}

/// Convert an STT value to its associated string.
#[inline]
pub fn type_to_str(typ: u8) -> &'static str {
    match typ {
        STT_NOTYPE => "NOTYPE",
        STT_OBJECT => "OBJECT",
        STT_FUNC => "FUNC",
        STT_SECTION => "SECTION",
        STT_FILE => "FILE",
        STT_TLS => "TLS",
        _ => "UNKNOWN_STT",
    }
}

/// A unified symbol table entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sym {
    /// Symbol name (string tbl index)
    pub st_name: u32,
    /// Symbol type and binding
    pub st_info: u8,
    /// Symbol visibility
    pub st_other: u8,
    /// Section index
    pub st_shndx: u16,
    /// Symbol value
    pub st_value: u64,
    /// Symbol size
    pub st_size: u64,
}

impl SizeWith<Ctx> for Sym {
    fn size_with(ctx: &Ctx) -> usize {
        if ctx.is_64() {
            SIZEOF_SYM64
        } else {
            SIZEOF_SYM32
        }
    }
}

impl ctx::TryFromCtx<'_, Ctx> for Sym {
    type Error = error::Error;
    fn try_from_ctx(src: &[u8], ctx: Ctx) -> Result<(Self, usize), Self::Error> {
        let le = ctx.le;
        let offset = &mut 0;
        let mut sym = Sym::default();
        sym.st_name = src.gread_with(offset, le)?;
        if ctx.is_64() {
            sym.st_info = src.gread(offset)?;
            sym.st_other = src.gread(offset)?;
            sym.st_shndx = src.gread_with(offset, le)?;
            sym.st_value = src.gread_with::<u64>(offset, le)?;
            sym.st_size = src.gread_with::<u64>(offset, le)?;
        } else {
            sym.st_value = src.gread_with::<u32>(offset, le)? as u64;
            sym.st_size = src.gread_with::<u32>(offset, le)? as u64;
            sym.st_info = src.gread(offset)?;
            sym.st_other = src.gread(offset)?;
            sym.st_shndx = src.gread_with(offset, le)?;
        }
        Ok((sym, *offset))
    }
}

impl ctx::TryIntoCtx<Ctx> for Sym {
    type Error = error::Error;
    fn try_into_ctx(self, dst: &mut [u8], ctx: Ctx) -> Result<usize, Self::Error> {
        let le = ctx.le;
        let offset = &mut 0;
        dst.gwrite_with(self.st_name, offset, le)?;
        if ctx.is_64() {
            dst.gwrite(self.st_info, offset)?;
            dst.gwrite(self.st_other, offset)?;
            dst.gwrite_with(self.st_shndx, offset, le)?;
            dst.gwrite_with(self.st_value, offset, le)?;
            dst.gwrite_with(self.st_size, offset, le)?;
        } else {
            dst.gwrite_with(narrow(self.st_value)?, offset, le)?;
            dst.gwrite_with(narrow(self.st_size)?, offset, le)?;
            dst.gwrite(self.st_info, offset)?;
            dst.gwrite(self.st_other, offset)?;
            dst.gwrite_with(self.st_shndx, offset, le)?;
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
    fn info_packing() {
        let info = st_info(STB_GLOBAL, STT_FUNC);
        assert_eq!(info, 0x12);
        assert_eq!(st_bind(info), STB_GLOBAL);
        assert_eq!(st_type(info), STT_FUNC);
    }

    #[test]
    fn sym_roundtrip_both_classes() {
        let sym = Sym {
            st_name: 0x2f,
            st_info: st_info(STB_GLOBAL, STT_FUNC),
            st_other: STV_DEFAULT,
            st_shndx: 12,
            st_value: 0x1234,
            st_size: 0x40,
        };
        for ctx in [
            Ctx::new(Class::Class64, Endian::Little),
            Ctx::new(Class::Class32, Endian::Big),
        ] {
            let mut buf = [0u8; SIZEOF_SYM64];
            let size = buf.pwrite_with(sym, 0, ctx).unwrap();
            assert_eq!(size, Sym::size_with(&ctx));
            let back: Sym = buf.pread_with(0, ctx).unwrap();
            assert_eq!(back, sym);
        }
    }
}
