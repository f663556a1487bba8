//! Synthetic ELF images the integration tests operate on. Built with the
//! crate's own serializers so layout constants live in one place.

use hobgoblin::container::{Class, Ctx};
use hobgoblin::elf::dynamic::{
    DT_FLAGS_1, DT_GNU_HASH, DT_NULL, DT_STRSZ, DT_STRTAB, DT_SYMENT, DT_SYMTAB,
};
use hobgoblin::elf::gnu_hash::GnuHashHeader;
use hobgoblin::elf::header::{
    Header, ELFCLASS64, ELFDATA2LSB, ELFMAG, EI_CLASS, EI_DATA, EI_VERSION, EM_X86_64, ET_DYN,
    ET_EXEC, EV_CURRENT, SIZEOF_IDENT,
};
use hobgoblin::elf::program_header::{
    ProgramHeader, PF_R, PF_W, PF_X, PT_DYNAMIC, PT_GNU_STACK, PT_INTERP, PT_LOAD, PT_NOTE,
};
use hobgoblin::elf::reloc::{r_info, Rela, R_X86_64_JUMP_SLOT};
use hobgoblin::elf::section_header::{
    SectionHeader, SHF_ALLOC, SHF_EXECINSTR, SHF_WRITE, SHT_DYNAMIC, SHT_DYNSYM, SHT_GNU_HASH,
    SHT_PROGBITS, SHT_RELA, SHT_STRTAB,
};
use hobgoblin::elf::sym::{st_info, Sym, STB_GLOBAL, STT_FUNC};
use scroll::{Endian, Pwrite};

pub fn ctx64() -> Ctx {
    Ctx::new(Class::Class64, Endian::Little)
}

pub fn ident64() -> [u8; SIZEOF_IDENT] {
    let mut ident = [0u8; SIZEOF_IDENT];
    ident[..4].copy_from_slice(ELFMAG);
    ident[EI_CLASS] = ELFCLASS64;
    ident[EI_DATA] = ELFDATA2LSB;
    ident[EI_VERSION] = 1;
    ident
}

fn put(image: &mut [u8], offset: usize, bytes: &[u8]) {
    image[offset..offset + bytes.len()].copy_from_slice(bytes);
}

fn put_phdrs(image: &mut Vec<u8>, at: usize, phdrs: &[ProgramHeader]) {
    let mut offset = at;
    for phdr in phdrs {
        image.pwrite_with(*phdr, offset, ctx64()).unwrap();
        offset += 56;
    }
}

fn put_shdrs(image: &mut Vec<u8>, at: usize, shdrs: &[SectionHeader]) {
    let mut offset = at;
    for shdr in shdrs {
        image.pwrite_with(*shdr, offset, ctx64()).unwrap();
        offset += 64;
    }
}

fn put_dynamic(image: &mut Vec<u8>, at: usize, entries: &[(u64, u64)]) {
    let mut offset = at;
    for &(d_tag, d_val) in entries {
        image
            .pwrite_with(hobgoblin::elf::dynamic::Dyn { d_tag, d_val }, offset, ctx64())
            .unwrap();
        offset += 16;
    }
}

fn put_syms(image: &mut Vec<u8>, at: usize, syms: &[Sym]) {
    let mut offset = at;
    for sym in syms {
        image.pwrite_with(*sym, offset, ctx64()).unwrap();
        offset += 24;
    }
}

/// Shared `.dynsym` content: null, two imports, one defined function.
fn fixture_dynsyms(text_addr: u64, text_shndx: u16) -> [Sym; 4] {
    [
        Sym::default(),
        Sym {
            st_name: 1, // printf
            st_info: st_info(STB_GLOBAL, STT_FUNC),
            ..Default::default()
        },
        Sym {
            st_name: 8, // strcmp
            st_info: st_info(STB_GLOBAL, STT_FUNC),
            ..Default::default()
        },
        Sym {
            st_name: 15, // hello
            st_info: st_info(STB_GLOBAL, STT_FUNC),
            st_shndx: text_shndx,
            st_value: text_addr,
            st_size: 0x10,
            ..Default::default()
        },
    ]
}

pub const INTERP: &[u8] = b"/lib64/ld-linux-x86-64.so.2\0";
pub const DYNSTR: &[u8] = b"\0printf\0strcmp\0hello\0";

/// A small `ET_EXEC` with a text LOAD (`.interp`/`.text`/`.dynsym`/
/// `.dynstr`/`.gnu.hash`), a data LOAD (`.data`/`.dynamic`), a disposable
/// `PT_NOTE`, and trailing unloaded sections. 0x6c0 bytes.
pub fn main_fixture() -> Vec<u8> {
    let ctx = ctx64();
    let mut image = vec![0u8; 0x6c0];

    image
        .pwrite_with(
            Header {
                e_ident: ident64(),
                e_type: ET_EXEC,
                e_machine: EM_X86_64,
                e_version: EV_CURRENT,
                e_entry: 0x4001b0,
                e_phoff: 0x40,
                e_shoff: 0x440,
                e_flags: 0,
                e_ehsize: 64,
                e_phentsize: 56,
                e_phnum: 6,
                e_shentsize: 64,
                e_shnum: 10,
                e_shstrndx: 9,
            },
            0,
            ctx,
        )
        .unwrap();

    put_phdrs(
        &mut image,
        0x40,
        &[
            ProgramHeader {
                p_type: PT_LOAD,
                p_flags: PF_R | PF_X,
                p_offset: 0,
                p_vaddr: 0x400000,
                p_paddr: 0x400000,
                p_filesz: 0x280,
                p_memsz: 0x280,
                p_align: 0x1000,
            },
            ProgramHeader {
                p_type: PT_INTERP,
                p_flags: PF_R,
                p_offset: 0x190,
                p_vaddr: 0x400190,
                p_paddr: 0x400190,
                p_filesz: INTERP.len() as u64,
                p_memsz: INTERP.len() as u64,
                p_align: 1,
            },
            ProgramHeader {
                p_type: PT_LOAD,
                p_flags: PF_R | PF_W,
                p_offset: 0x300,
                p_vaddr: 0x402300,
                p_paddr: 0x402300,
                p_filesz: 0xa0,
                p_memsz: 0xa0,
                p_align: 0x1000,
            },
            ProgramHeader {
                p_type: PT_DYNAMIC,
                p_flags: PF_R | PF_W,
                p_offset: 0x320,
                p_vaddr: 0x402320,
                p_paddr: 0x402320,
                p_filesz: 0x80,
                p_memsz: 0x80,
                p_align: 8,
            },
            ProgramHeader {
                p_type: PT_NOTE,
                p_flags: PF_R,
                p_offset: 0x3a0,
                p_vaddr: 0,
                p_paddr: 0,
                p_filesz: 0x10,
                p_memsz: 0x10,
                p_align: 4,
            },
            ProgramHeader {
                p_type: PT_GNU_STACK,
                p_flags: PF_R | PF_W,
                p_align: 0x10,
                ..Default::default()
            },
        ],
    );

    put(&mut image, 0x190, INTERP);
    image[0x1b0..0x1d8].fill(0x90); // .text
    put_syms(&mut image, 0x1e0, &fixture_dynsyms(0x4001b0, 2));
    put(&mut image, 0x240, DYNSTR);
    image
        .pwrite_with(
            GnuHashHeader {
                nbuckets: 1,
                symndx: 1,
                maskbits: 1,
                shift: 6,
            },
            0x258,
            Endian::Little,
        )
        .unwrap();
    image[0x300..0x320].fill(0xdb); // .data
    put_dynamic(
        &mut image,
        0x320,
        &[
            (DT_STRTAB, 0x400240),
            (DT_STRSZ, DYNSTR.len() as u64),
            (DT_SYMTAB, 0x4001e0),
            (DT_SYMENT, 24),
            (DT_GNU_HASH, 0x400258),
            (DT_FLAGS_1, 0),
            (DT_NULL, 0),
            (DT_NULL, 0),
        ],
    );
    put(&mut image, 0x3b0, b"fixture\0");
    put(
        &mut image,
        0x3c0,
        b"\0.interp\0.text\0.dynsym\0.dynstr\0.gnu.hash\0.data\0.dynamic\0.comment\0.shstrtab\0",
    );

    put_shdrs(
        &mut image,
        0x440,
        &[
            SectionHeader::default(),
            SectionHeader {
                sh_name: 1,
                sh_type: SHT_PROGBITS,
                sh_flags: SHF_ALLOC,
                sh_addr: 0x400190,
                sh_offset: 0x190,
                sh_size: INTERP.len() as u64,
                sh_addralign: 1,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 9,
                sh_type: SHT_PROGBITS,
                sh_flags: SHF_ALLOC | SHF_EXECINSTR,
                sh_addr: 0x4001b0,
                sh_offset: 0x1b0,
                sh_size: 0x28,
                sh_addralign: 16,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 15,
                sh_type: SHT_DYNSYM,
                sh_flags: SHF_ALLOC,
                sh_addr: 0x4001e0,
                sh_offset: 0x1e0,
                sh_size: 0x60,
                sh_link: 4,
                sh_info: 1,
                sh_addralign: 8,
                sh_entsize: 24,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 23,
                sh_type: SHT_STRTAB,
                sh_flags: SHF_ALLOC,
                sh_addr: 0x400240,
                sh_offset: 0x240,
                sh_size: DYNSTR.len() as u64,
                sh_addralign: 1,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 31,
                sh_type: SHT_GNU_HASH,
                sh_flags: SHF_ALLOC,
                sh_addr: 0x400258,
                sh_offset: 0x258,
                sh_size: 0x28,
                sh_link: 3,
                sh_addralign: 8,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 41,
                sh_type: SHT_PROGBITS,
                sh_flags: SHF_ALLOC | SHF_WRITE,
                sh_addr: 0x402300,
                sh_offset: 0x300,
                sh_size: 0x20,
                sh_addralign: 8,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 47,
                sh_type: SHT_DYNAMIC,
                sh_flags: SHF_ALLOC | SHF_WRITE,
                sh_addr: 0x402320,
                sh_offset: 0x320,
                sh_size: 0x80,
                sh_link: 4,
                sh_addralign: 8,
                sh_entsize: 16,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 56,
                sh_type: SHT_PROGBITS,
                sh_addr: 0,
                sh_offset: 0x3b0,
                sh_size: 0x10,
                sh_addralign: 1,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 65,
                sh_type: SHT_STRTAB,
                sh_addr: 0,
                sh_offset: 0x3c0,
                sh_size: 0x4b,
                sh_addralign: 1,
                ..Default::default()
            },
        ],
    );

    image
}

/// The main fixture reshaped so `.dynstr` owns an isolated one-page LOAD
/// with slack, for the in-place growth policy. 0x5c0 bytes.
pub fn isolated_dynstr_fixture() -> Vec<u8> {
    let ctx = ctx64();
    let mut image = vec![0u8; 0x5c0];

    image
        .pwrite_with(
            Header {
                e_ident: ident64(),
                e_type: ET_EXEC,
                e_machine: EM_X86_64,
                e_version: EV_CURRENT,
                e_entry: 0x400190,
                e_phoff: 0x40,
                e_shoff: 0x400,
                e_flags: 0,
                e_ehsize: 64,
                e_phentsize: 56,
                e_phnum: 6,
                e_shentsize: 64,
                e_shnum: 7,
                e_shstrndx: 6,
            },
            0,
            ctx,
        )
        .unwrap();

    put_phdrs(
        &mut image,
        0x40,
        &[
            ProgramHeader {
                p_type: PT_LOAD,
                p_flags: PF_R | PF_X,
                p_offset: 0,
                p_vaddr: 0x400000,
                p_paddr: 0x400000,
                p_filesz: 0x220,
                p_memsz: 0x220,
                p_align: 0x1000,
            },
            ProgramHeader {
                p_type: PT_LOAD,
                p_flags: PF_R,
                p_offset: 0x220,
                p_vaddr: 0x400220,
                p_paddr: 0x400220,
                p_filesz: 0x20,
                p_memsz: 0x20,
                p_align: 0x1000,
            },
            ProgramHeader {
                p_type: PT_LOAD,
                p_flags: PF_R | PF_W,
                p_offset: 0x300,
                p_vaddr: 0x402300,
                p_paddr: 0x402300,
                p_filesz: 0x90,
                p_memsz: 0x90,
                p_align: 0x1000,
            },
            ProgramHeader {
                p_type: PT_DYNAMIC,
                p_flags: PF_R | PF_W,
                p_offset: 0x320,
                p_vaddr: 0x402320,
                p_paddr: 0x402320,
                p_filesz: 0x70,
                p_memsz: 0x70,
                p_align: 8,
            },
            ProgramHeader {
                p_type: PT_NOTE,
                p_flags: PF_R,
                p_offset: 0x390,
                p_vaddr: 0,
                p_paddr: 0,
                p_filesz: 0x10,
                p_memsz: 0x10,
                p_align: 4,
            },
            ProgramHeader {
                p_type: PT_GNU_STACK,
                p_flags: PF_R | PF_W,
                p_align: 0x10,
                ..Default::default()
            },
        ],
    );

    image[0x190..0x1b8].fill(0x90); // .text
    put_syms(&mut image, 0x1c0, &fixture_dynsyms(0x400190, 1));
    put(&mut image, 0x220, DYNSTR);
    image[0x300..0x320].fill(0xdb); // .data
    put_dynamic(
        &mut image,
        0x320,
        &[
            (DT_STRTAB, 0x400220),
            (DT_STRSZ, DYNSTR.len() as u64),
            (DT_SYMTAB, 0x4001c0),
            (DT_SYMENT, 24),
            (DT_FLAGS_1, 0),
            (DT_NULL, 0),
            (DT_NULL, 0),
        ],
    );
    put(
        &mut image,
        0x3a0,
        b"\0.text\0.dynsym\0.dynstr\0.data\0.dynamic\0.shstrtab\0",
    );

    put_shdrs(
        &mut image,
        0x400,
        &[
            SectionHeader::default(),
            SectionHeader {
                sh_name: 1,
                sh_type: SHT_PROGBITS,
                sh_flags: SHF_ALLOC | SHF_EXECINSTR,
                sh_addr: 0x400190,
                sh_offset: 0x190,
                sh_size: 0x28,
                sh_addralign: 16,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 7,
                sh_type: SHT_DYNSYM,
                sh_flags: SHF_ALLOC,
                sh_addr: 0x4001c0,
                sh_offset: 0x1c0,
                sh_size: 0x60,
                sh_link: 3,
                sh_info: 1,
                sh_addralign: 8,
                sh_entsize: 24,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 15,
                sh_type: SHT_STRTAB,
                sh_flags: SHF_ALLOC,
                sh_addr: 0x400220,
                sh_offset: 0x220,
                sh_size: DYNSTR.len() as u64,
                sh_addralign: 1,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 23,
                sh_type: SHT_PROGBITS,
                sh_flags: SHF_ALLOC | SHF_WRITE,
                sh_addr: 0x402300,
                sh_offset: 0x300,
                sh_size: 0x20,
                sh_addralign: 8,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 29,
                sh_type: SHT_DYNAMIC,
                sh_flags: SHF_ALLOC | SHF_WRITE,
                sh_addr: 0x402320,
                sh_offset: 0x320,
                sh_size: 0x70,
                sh_link: 3,
                sh_addralign: 8,
                sh_entsize: 16,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 38,
                sh_type: SHT_STRTAB,
                sh_addr: 0,
                sh_offset: 0x3a0,
                sh_size: 0x30,
                sh_addralign: 1,
                ..Default::default()
            },
        ],
    );

    image
}

/// A small PIE: read-only LOAD at address zero carrying `.dynsym`,
/// `.dynstr`, `.dynamic`; an R|X text LOAD one page up; a data LOAD.
/// 0x540 bytes.
pub fn pie_fixture() -> Vec<u8> {
    let ctx = ctx64();
    let mut image = vec![0u8; 0x540];

    image
        .pwrite_with(
            Header {
                e_ident: ident64(),
                e_type: ET_DYN,
                e_machine: EM_X86_64,
                e_version: EV_CURRENT,
                e_entry: 0x1200,
                e_phoff: 0x40,
                e_shoff: 0x380,
                e_flags: 0,
                e_ehsize: 64,
                e_phentsize: 56,
                e_phnum: 5,
                e_shentsize: 64,
                e_shnum: 7,
                e_shstrndx: 6,
            },
            0,
            ctx,
        )
        .unwrap();

    put_phdrs(
        &mut image,
        0x40,
        &[
            ProgramHeader {
                p_type: PT_LOAD,
                p_flags: PF_R,
                p_offset: 0,
                p_vaddr: 0,
                p_paddr: 0,
                p_filesz: 0x1e8,
                p_memsz: 0x1e8,
                p_align: 0x1000,
            },
            ProgramHeader {
                p_type: PT_LOAD,
                p_flags: PF_R | PF_X,
                p_offset: 0x200,
                p_vaddr: 0x1200,
                p_paddr: 0x1200,
                p_filesz: 0x100,
                p_memsz: 0x100,
                p_align: 0x1000,
            },
            ProgramHeader {
                p_type: PT_LOAD,
                p_flags: PF_R | PF_W,
                p_offset: 0x300,
                p_vaddr: 0x2300,
                p_paddr: 0x2300,
                p_filesz: 0x40,
                p_memsz: 0x40,
                p_align: 0x1000,
            },
            ProgramHeader {
                p_type: PT_DYNAMIC,
                p_flags: PF_R | PF_W,
                p_offset: 0x198,
                p_vaddr: 0x198,
                p_paddr: 0x198,
                p_filesz: 0x50,
                p_memsz: 0x50,
                p_align: 8,
            },
            ProgramHeader {
                p_type: PT_GNU_STACK,
                p_flags: PF_R | PF_W,
                p_align: 0x10,
                ..Default::default()
            },
        ],
    );

    put_syms(
        &mut image,
        0x158,
        &[
            Sym::default(),
            Sym {
                st_name: 1, // exported
                st_info: st_info(STB_GLOBAL, STT_FUNC),
                st_shndx: 4,
                st_value: 0x1200,
                st_size: 8,
                ..Default::default()
            },
        ],
    );
    put(&mut image, 0x188, b"\0exported\0");
    put_dynamic(
        &mut image,
        0x198,
        &[
            (DT_STRTAB, 0x188),
            (DT_SYMTAB, 0x158),
            (DT_STRSZ, 10),
            (DT_NULL, 0),
            (DT_NULL, 0),
        ],
    );
    image[0x200..0x300].fill(0x90); // .text
    image[0x300..0x340].fill(0xdb); // .data
    put(
        &mut image,
        0x340,
        b"\0.dynsym\0.dynstr\0.dynamic\0.text\0.data\0.shstrtab\0",
    );

    put_shdrs(
        &mut image,
        0x380,
        &[
            SectionHeader::default(),
            SectionHeader {
                sh_name: 1,
                sh_type: SHT_DYNSYM,
                sh_flags: SHF_ALLOC,
                sh_addr: 0x158,
                sh_offset: 0x158,
                sh_size: 0x30,
                sh_link: 2,
                sh_info: 1,
                sh_addralign: 8,
                sh_entsize: 24,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 9,
                sh_type: SHT_STRTAB,
                sh_flags: SHF_ALLOC,
                sh_addr: 0x188,
                sh_offset: 0x188,
                sh_size: 10,
                sh_addralign: 1,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 17,
                sh_type: SHT_DYNAMIC,
                sh_flags: SHF_ALLOC | SHF_WRITE,
                sh_addr: 0x198,
                sh_offset: 0x198,
                sh_size: 0x50,
                sh_link: 2,
                sh_addralign: 8,
                sh_entsize: 16,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 26,
                sh_type: SHT_PROGBITS,
                sh_flags: SHF_ALLOC | SHF_EXECINSTR,
                sh_addr: 0x1200,
                sh_offset: 0x200,
                sh_size: 0x100,
                sh_addralign: 16,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 32,
                sh_type: SHT_PROGBITS,
                sh_flags: SHF_ALLOC | SHF_WRITE,
                sh_addr: 0x2300,
                sh_offset: 0x300,
                sh_size: 0x40,
                sh_addralign: 8,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 38,
                sh_type: SHT_STRTAB,
                sh_addr: 0,
                sh_offset: 0x340,
                sh_size: 0x30,
                sh_addralign: 1,
                ..Default::default()
            },
        ],
    );

    image
}

/// The main fixture extended with a `.got.plt` in the data LOAD and a
/// one-entry `.rela.plt` targeting the printf slot. 0x780 bytes.
pub fn hook_fixture() -> Vec<u8> {
    let ctx = ctx64();
    let mut image = vec![0u8; 0x780];

    image
        .pwrite_with(
            Header {
                e_ident: ident64(),
                e_type: ET_EXEC,
                e_machine: EM_X86_64,
                e_version: EV_CURRENT,
                e_entry: 0x4001b0,
                e_phoff: 0x40,
                e_shoff: 0x480,
                e_flags: 0,
                e_ehsize: 64,
                e_phentsize: 56,
                e_phnum: 6,
                e_shentsize: 64,
                e_shnum: 12,
                e_shstrndx: 11,
            },
            0,
            ctx,
        )
        .unwrap();

    put_phdrs(
        &mut image,
        0x40,
        &[
            ProgramHeader {
                p_type: PT_LOAD,
                p_flags: PF_R | PF_X,
                p_offset: 0,
                p_vaddr: 0x400000,
                p_paddr: 0x400000,
                p_filesz: 0x280,
                p_memsz: 0x280,
                p_align: 0x1000,
            },
            ProgramHeader {
                p_type: PT_INTERP,
                p_flags: PF_R,
                p_offset: 0x190,
                p_vaddr: 0x400190,
                p_paddr: 0x400190,
                p_filesz: INTERP.len() as u64,
                p_memsz: INTERP.len() as u64,
                p_align: 1,
            },
            ProgramHeader {
                p_type: PT_LOAD,
                p_flags: PF_R | PF_W,
                p_offset: 0x300,
                p_vaddr: 0x402300,
                p_paddr: 0x402300,
                p_filesz: 0xc0,
                p_memsz: 0xc0,
                p_align: 0x1000,
            },
            ProgramHeader {
                p_type: PT_DYNAMIC,
                p_flags: PF_R | PF_W,
                p_offset: 0x320,
                p_vaddr: 0x402320,
                p_paddr: 0x402320,
                p_filesz: 0x80,
                p_memsz: 0x80,
                p_align: 8,
            },
            ProgramHeader {
                p_type: PT_NOTE,
                p_flags: PF_R,
                p_offset: 0x3c0,
                p_vaddr: 0,
                p_paddr: 0,
                p_filesz: 0x10,
                p_memsz: 0x10,
                p_align: 4,
            },
            ProgramHeader {
                p_type: PT_GNU_STACK,
                p_flags: PF_R | PF_W,
                p_align: 0x10,
                ..Default::default()
            },
        ],
    );

    put(&mut image, 0x190, INTERP);
    image[0x1b0..0x1d8].fill(0x90);
    put_syms(&mut image, 0x1e0, &fixture_dynsyms(0x4001b0, 2));
    put(&mut image, 0x240, DYNSTR);
    image
        .pwrite_with(
            GnuHashHeader {
                nbuckets: 1,
                symndx: 1,
                maskbits: 1,
                shift: 6,
            },
            0x258,
            Endian::Little,
        )
        .unwrap();
    image[0x300..0x320].fill(0xdb);
    put_dynamic(
        &mut image,
        0x320,
        &[
            (DT_STRTAB, 0x400240),
            (DT_STRSZ, DYNSTR.len() as u64),
            (DT_SYMTAB, 0x4001e0),
            (DT_SYMENT, 24),
            (DT_GNU_HASH, 0x400258),
            (DT_FLAGS_1, 0),
            (DT_NULL, 0),
            (DT_NULL, 0),
        ],
    );
    // .got.plt slots; slot 2 is printf's
    image
        .pwrite_with::<u64>(0x4001b0, 0x3b0, Endian::Little)
        .unwrap();
    // .rela.plt: one JUMP_SLOT against dynsym 1 (printf)
    image
        .pwrite_with(
            Rela {
                r_offset: 0x4023b0,
                r_info: r_info(1, R_X86_64_JUMP_SLOT, Class::Class64),
                r_addend: 0,
            },
            0x3d0,
            ctx,
        )
        .unwrap();
    put(&mut image, 0x3e8, b"fixture\0");
    put(
        &mut image,
        0x400,
        b"\0.interp\0.text\0.dynsym\0.dynstr\0.gnu.hash\0.data\0.dynamic\0.got.plt\0.rela.plt\0.comment\0.shstrtab\0",
    );

    put_shdrs(
        &mut image,
        0x480,
        &[
            SectionHeader::default(),
            SectionHeader {
                sh_name: 1,
                sh_type: SHT_PROGBITS,
                sh_flags: SHF_ALLOC,
                sh_addr: 0x400190,
                sh_offset: 0x190,
                sh_size: INTERP.len() as u64,
                sh_addralign: 1,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 9,
                sh_type: SHT_PROGBITS,
                sh_flags: SHF_ALLOC | SHF_EXECINSTR,
                sh_addr: 0x4001b0,
                sh_offset: 0x1b0,
                sh_size: 0x28,
                sh_addralign: 16,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 15,
                sh_type: SHT_DYNSYM,
                sh_flags: SHF_ALLOC,
                sh_addr: 0x4001e0,
                sh_offset: 0x1e0,
                sh_size: 0x60,
                sh_link: 4,
                sh_info: 1,
                sh_addralign: 8,
                sh_entsize: 24,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 23,
                sh_type: SHT_STRTAB,
                sh_flags: SHF_ALLOC,
                sh_addr: 0x400240,
                sh_offset: 0x240,
                sh_size: DYNSTR.len() as u64,
                sh_addralign: 1,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 31,
                sh_type: SHT_GNU_HASH,
                sh_flags: SHF_ALLOC,
                sh_addr: 0x400258,
                sh_offset: 0x258,
                sh_size: 0x28,
                sh_link: 3,
                sh_addralign: 8,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 41,
                sh_type: SHT_PROGBITS,
                sh_flags: SHF_ALLOC | SHF_WRITE,
                sh_addr: 0x402300,
                sh_offset: 0x300,
                sh_size: 0x20,
                sh_addralign: 8,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 47,
                sh_type: SHT_DYNAMIC,
                sh_flags: SHF_ALLOC | SHF_WRITE,
                sh_addr: 0x402320,
                sh_offset: 0x320,
                sh_size: 0x80,
                sh_link: 4,
                sh_addralign: 8,
                sh_entsize: 16,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 56,
                sh_type: SHT_PROGBITS,
                sh_flags: SHF_ALLOC | SHF_WRITE,
                sh_addr: 0x4023a0,
                sh_offset: 0x3a0,
                sh_size: 0x20,
                sh_addralign: 8,
                sh_entsize: 8,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 65,
                sh_type: SHT_RELA,
                sh_addr: 0,
                sh_offset: 0x3d0,
                sh_size: 0x18,
                sh_link: 3,
                sh_addralign: 8,
                sh_entsize: 24,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 75,
                sh_type: SHT_PROGBITS,
                sh_addr: 0,
                sh_offset: 0x3e8,
                sh_size: 0x10,
                sh_addralign: 1,
                ..Default::default()
            },
            SectionHeader {
                sh_name: 84,
                sh_type: SHT_STRTAB,
                sh_addr: 0,
                sh_offset: 0x400,
                sh_size: 0x5e,
                sh_addralign: 1,
                ..Default::default()
            },
        ],
    );

    image
}
