//! # hobgoblin
//!
//! An impish ELF surgery crate: parse, grow, shrink, patch, hook, and
//! infect ELF binaries in place, for both 32-bit and 64-bit classes and
//! either endianness.
//!
//! The crate's core is a layout-preserving mutator. Every operation that
//! grows an internal structure — a string table, the dynamic symbol table,
//! the dynamic array, the header tables — runs through a space allocator
//! and a move engine that keep virtual addresses, file offsets, dynamic
//! tags, entry points, and the GNU hash mutually consistent, so the loader
//! never notices the surgery.
//!
//! ```no_run
//! use hobgoblin::elf::Elf;
//!
//! let mut elf = Elf::open("/tmp/victim", false)?;
//! elf.rename_dynsym("strcmp", "strncmp")?;
//! let parasite = hobgoblin::convert::unescape_hex("\\x90\\x90\\x90\\xc3")?;
//! let addr = elf.infect_silvio(&parasite)?;
//! println!("parasite at 0x{addr:x}");
//! elf.save()?;
//! # Ok::<(), hobgoblin::error::Error>(())
//! ```

pub mod align;
pub mod container;
pub mod convert;
pub mod dump;
pub mod edit;
pub mod elf;
pub mod error;
pub mod image;
pub mod strtab;

pub use container::{Class, Ctx};
pub use elf::Elf;
pub use error::{Error, Result};
pub use image::Image;
