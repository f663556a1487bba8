//! Hardening forensics: classify the defensive posture a binary was built
//! with, readelf-style but condensed to a verdict per mitigation.

use super::dynamic::{DF_1_NOW, DT_BIND_NOW, DT_FLAGS_1};
use super::header::ET_DYN;
use super::program_header::{PF_X, PT_GNU_RELRO, PT_GNU_STACK};
use super::Elf;
use crate::error::Result;

/// GOT protection level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relro {
    /// No `PT_GNU_RELRO` segment
    None,
    /// Relro segment without eager binding
    Partial,
    /// Relro segment plus `BIND_NOW`
    Full,
}

/// The mitigations a binary carries.
#[derive(Debug, Clone, Copy)]
pub struct SecurityReport {
    /// Position independent executable
    pub pie: bool,
    /// Non-executable stack
    pub nx: bool,
    /// Stack canary references present
    pub canary: bool,
    /// GOT protection
    pub relro: Relro,
    /// No static symbol table
    pub stripped: bool,
}

impl Elf {
    /// Inspect the hardening state of the binary.
    pub fn checksec(&self) -> Result<SecurityReport> {
        let pie = self.header().e_type == ET_DYN;

        let nx = match self.segment_index_by_type(PT_GNU_STACK) {
            Ok(index) => self.phdr(index)?.p_flags & PF_X == 0,
            Err(_) => false,
        };

        let mut canary = false;
        for i in 0..self.dynsym_count() {
            if self.dynsym_name(i)? == "__stack_chk_fail" {
                canary = true;
                break;
            }
        }

        let relro = if self.segment_index_by_type(PT_GNU_RELRO).is_err() {
            Relro::None
        } else {
            let now = self
                .dynamic_value_by_tag(DT_FLAGS_1)
                .map(|flags| flags & DF_1_NOW != 0)
                .unwrap_or(false)
                || self.dynamic_index_by_tag(DT_BIND_NOW).is_ok();
            if now {
                Relro::Full
            } else {
                Relro::Partial
            }
        };

        Ok(SecurityReport {
            pie,
            nx,
            canary,
            relro,
            stripped: self.symtab_index().is_none(),
        })
    }
}
