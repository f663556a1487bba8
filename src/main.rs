//! The hobgoblin command line: one operation per invocation, driving the
//! library engine, exit code 0 on success and nonzero on any error.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use hobgoblin::convert;
use hobgoblin::dump::{self, Scope};
use hobgoblin::edit;
use hobgoblin::elf::forensic::Relro;
use hobgoblin::elf::raw;
use hobgoblin::elf::Elf;
use hobgoblin::error::{Error, Result};

fn number(text: &str) -> std::result::Result<u64, String> {
    convert::parse_number(text).map_err(|e| e.to_string())
}

#[derive(Parser)]
#[command(
    name = "hobgoblin",
    version,
    about = "ELF surgery: parse, edit, patch, strip, hook, and infect",
    arg_required_else_help = true
)]
struct Cli {
    /// `parse`, `edit`, or `checksec` followed by the target, or just the
    /// target for the long-option operations
    #[arg(value_name = "FUNCTION|FILE", num_args = 1..=2)]
    args: Vec<String>,

    /// Section name
    #[arg(short = 'n', long = "section-name", value_name = "NAME")]
    section_name: Option<String>,
    /// Size in bytes, decimal or 0x-prefixed
    #[arg(short = 'z', long = "size", value_name = "N", value_parser = number)]
    size: Option<u64>,
    /// String value or \xNN escaped shellcode
    #[arg(short = 's', long = "string", value_name = "STR")]
    string: Option<String>,
    /// Auxiliary file (hook payload, raw segment content)
    #[arg(short = 'f', long = "file-name", value_name = "PATH")]
    file: Option<PathBuf>,
    /// Architecture for raw-to-ELF (arm, x86, mips)
    #[arg(short = 'a', long = "arch", value_name = "ARCH")]
    arch: Option<String>,
    /// Numeric value; doubles as the ELF class for raw-to-ELF
    #[arg(short = 'm', long = "value", value_name = "VALUE", value_parser = number)]
    value: Option<u64>,
    /// Endianness for raw-to-ELF (little, big)
    #[arg(short = 'e', long = "endian", value_name = "ENDIAN")]
    endian: Option<String>,
    /// Base address for raw-to-ELF
    #[arg(short = 'b', long = "base", value_name = "ADDR", value_parser = number)]
    base: Option<u64>,
    /// File offset
    #[arg(short = 'o', long = "offset", value_name = "OFF", value_parser = number)]
    offset: Option<u64>,
    /// Row of the entry to read or write
    #[arg(short = 'i', long = "row", value_name = "ROW", value_parser = number)]
    row: Option<u64>,
    /// Column of the field to read or write
    #[arg(short = 'j', long = "column", value_name = "COL", value_parser = number)]
    column: Option<u64>,

    /// Scope: ELF header
    #[arg(short = 'H')]
    headers: bool,
    /// Scope: section headers
    #[arg(short = 'S')]
    sections: bool,
    /// Scope: program headers
    #[arg(short = 'P')]
    segments: bool,
    /// Scope: .symtab
    #[arg(short = 'B')]
    symtab: bool,
    /// Scope: .dynsym
    #[arg(short = 'D')]
    dynsym: bool,
    /// Scope: dynamic array
    #[arg(short = 'L')]
    link: bool,
    /// Scope: relocation sections
    #[arg(short = 'R')]
    relocations: bool,
    /// Scope: pointer arrays
    #[arg(short = 'I')]
    pointers: bool,
    /// Scope: GNU hash table
    #[arg(short = 'G')]
    gnu_hash: bool,
    /// Scope: everything
    #[arg(short = 'A')]
    all: bool,

    /// Overwrite bytes at -o with the -s shellcode
    #[arg(long = "edit-hex")]
    edit_hex: bool,
    /// Write the -m pointer value at -o
    #[arg(long = "edit-pointer")]
    edit_pointer: bool,
    /// Extract -z bytes at -o into <file>.out
    #[arg(long = "edit-extract")]
    edit_extract: bool,
    /// Set the program interpreter to -s
    #[arg(long = "set-interp")]
    set_interp: bool,
    /// Set DT_RPATH to -s
    #[arg(long = "set-rpath")]
    set_rpath: bool,
    /// Set DT_RUNPATH to -s
    #[arg(long = "set-runpath")]
    set_runpath: bool,
    /// Add a LOAD segment of -z bytes (or filled from -f)
    #[arg(long = "add-segment")]
    add_segment: bool,
    /// Add a section -n of -z bytes
    #[arg(long = "add-section")]
    add_section: bool,
    /// Delete section -n
    #[arg(long = "rm-section")]
    rm_section: bool,
    /// Delete the whole section header view
    #[arg(long = "rm-shdr")]
    rm_shdr: bool,
    /// Delete every unloaded section
    #[arg(long = "rm-strip")]
    rm_strip: bool,
    /// Rebuild the GNU hash table
    #[arg(long = "refresh-hash")]
    refresh_hash: bool,
    /// Silvio text-padding infection with the -s shellcode
    #[arg(long = "infect-silvio")]
    infect_silvio: bool,
    /// Skeksi PIE infection with the -s shellcode
    #[arg(long = "infect-skeksi")]
    infect_skeksi: bool,
    /// Data segment infection with the -s shellcode
    #[arg(long = "infect-data")]
    infect_data: bool,
    /// Export symbol -s at value -m (size -z) and rebuild the hash
    #[arg(long = "to-exe2so")]
    to_exe2so: bool,
    /// Write the -s shellcode of -z bytes to the target file
    #[arg(long = "to-hex2bin")]
    to_hex2bin: bool,
    /// Wrap the raw target in an ELF container (-a/-m/-e/-b)
    #[arg(long = "to-bin2elf")]
    to_bin2elf: bool,
    /// Emit shell and cmd reconstruction scripts for the target
    #[arg(long = "to-script")]
    to_script: bool,
    /// Hook symbol -s through its GOT slot with code from -f at offset -o
    #[arg(long = "inject-hook")]
    inject_hook: bool,
}

impl Cli {
    fn scopes(&self) -> Vec<Scope> {
        let picks = [
            (self.all, Scope::All),
            (self.headers, Scope::Headers),
            (self.sections, Scope::Sections),
            (self.segments, Scope::Segments),
            (self.symtab, Scope::Symtab),
            (self.dynsym, Scope::Dynsym),
            (self.link, Scope::Link),
            (self.relocations, Scope::Relocations),
            (self.pointers, Scope::Pointers),
            (self.gnu_hash, Scope::GnuHash),
        ];
        picks
            .into_iter()
            .filter_map(|(on, scope)| on.then_some(scope))
            .collect()
    }

    fn string(&self, flag: &str) -> Result<&str> {
        self.string
            .as_deref()
            .ok_or_else(|| Error::Args(format!("{flag} needs -s")))
    }

    fn shellcode(&self) -> Result<Vec<u8>> {
        let mut bytes = convert::unescape_hex(self.string("this operation")?)?;
        if let Some(size) = self.size {
            bytes.resize(size as usize, 0);
        }
        Ok(bytes)
    }

    fn aux_file(&self, flag: &str) -> Result<&PathBuf> {
        self.file
            .as_ref()
            .ok_or_else(|| Error::Args(format!("{flag} needs -f")))
    }

    fn offset(&self, flag: &str) -> Result<u64> {
        self.offset
            .ok_or_else(|| Error::Args(format!("{flag} needs -o")))
    }

    fn size(&self, flag: &str) -> Result<u64> {
        self.size
            .ok_or_else(|| Error::Args(format!("{flag} needs -z")))
    }
}

fn main() {
    env_logger::init();
    if let Err(err) = run(Cli::parse()) {
        eprintln!("[-] {err}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let (function, target) = match cli.args.as_slice() {
        [file] => (None, file.clone()),
        [function, file] => (Some(function.clone()), file.clone()),
        _ => return Err(Error::Args("expected [function] <file>".into())),
    };

    // file-level operations that never parse the target as an ELF
    if cli.edit_extract {
        let fragment =
            convert::extract_fragment(&target, cli.offset("--edit-extract")?, cli.size("--edit-extract")?)?;
        println!("{}", convert::escape_hex(&fragment));
        convert::write_blob(&target, &fragment, true)?;
        return Ok(());
    }
    if cli.to_hex2bin {
        let bytes = cli.shellcode()?;
        convert::write_blob(&target, &bytes, false)?;
        println!("[+] shellcode saved to {target}");
        return Ok(());
    }
    if cli.to_bin2elf {
        let bits = cli.value.unwrap_or(64) as u32;
        let out = raw::wrap_blob(
            &target,
            cli.arch.as_deref().unwrap_or("x86"),
            bits,
            cli.endian.as_deref().unwrap_or("little"),
            cli.base.unwrap_or(0),
        )?;
        println!("[+] wrote {}", out.display());
        return Ok(());
    }
    if cli.to_script {
        convert::bin_to_sh(&target)?;
        convert::bin_to_cmd(&target)?;
        return Ok(());
    }

    if let Some(function) = function {
        return match function.as_str() {
            "parse" => {
                let elf = Elf::open(&target, true)?;
                let scopes = cli.scopes();
                let scopes = if scopes.is_empty() { vec![Scope::All] } else { scopes };
                dump::dump(&elf, &scopes)
            }
            "checksec" => {
                let elf = Elf::open(&target, true)?;
                let report = elf.checksec()?;
                println!("PIE:      {}", if report.pie { "enabled" } else { "disabled" });
                println!("NX:       {}", if report.nx { "enabled" } else { "disabled" });
                println!("Canary:   {}", if report.canary { "found" } else { "not found" });
                println!(
                    "RELRO:    {}",
                    match report.relro {
                        Relro::None => "none",
                        Relro::Partial => "partial",
                        Relro::Full => "full",
                    }
                );
                println!("Stripped: {}", if report.stripped { "yes" } else { "no" });
                Ok(())
            }
            "edit" => {
                let scope = *cli
                    .scopes()
                    .first()
                    .ok_or_else(|| Error::Args("edit needs a scope flag (-H/-S/-P/-B/-D/-L)".into()))?;
                let mut elf = Elf::open(&target, false)?;
                edit::edit(
                    &mut elf,
                    scope,
                    cli.row.unwrap_or(0) as usize,
                    cli.column.unwrap_or(0) as usize,
                    cli.value.unwrap_or(0),
                    cli.string.as_deref(),
                )?;
                elf.save()
            }
            other => Err(Error::Args(format!("unknown function {other:?}"))),
        };
    }

    // everything below mutates the target in place
    let mut elf = Elf::open(&target, false)?;
    if cli.edit_hex {
        let bytes = cli.shellcode()?;
        elf.edit_hex(cli.offset("--edit-hex")?, &bytes)?;
    } else if cli.edit_pointer {
        let value = cli.value.ok_or_else(|| Error::Args("--edit-pointer needs -m".into()))?;
        elf.edit_pointer(cli.offset("--edit-pointer")?, value)?;
    } else if cli.set_interp {
        elf.set_interpreter(cli.string("--set-interp")?)?;
    } else if cli.set_rpath {
        elf.set_rpath(cli.string("--set-rpath")?)?;
    } else if cli.set_runpath {
        elf.set_runpath(cli.string("--set-runpath")?)?;
    } else if cli.add_segment {
        let index = match &cli.file {
            Some(path) => elf.add_segment_with_file(path)?,
            None => elf.add_segment(cli.size("--add-segment")?)?,
        };
        println!("[+] new segment at index {index}");
    } else if cli.add_section {
        let name = cli
            .section_name
            .as_deref()
            .ok_or_else(|| Error::Args("--add-section needs -n".into()))?;
        let index = elf.add_section(cli.size("--add-section")?, name)?;
        println!("[+] new section at index {index}");
    } else if cli.rm_section {
        let name = cli
            .section_name
            .as_deref()
            .ok_or_else(|| Error::Args("--rm-section needs -n".into()))?;
        elf.delete_section(name)?;
    } else if cli.rm_shdr {
        elf.delete_all_shdr()?;
    } else if cli.rm_strip {
        elf.strip()?;
    } else if cli.refresh_hash {
        elf.refresh_gnu_hash()?;
    } else if cli.infect_silvio {
        let addr = elf.infect_silvio(&cli.shellcode()?)?;
        println!("[+] parasite at 0x{addr:x}");
    } else if cli.infect_skeksi {
        let addr = elf.infect_skeksi_pie(&cli.shellcode()?)?;
        println!("[+] parasite at 0x{addr:x}");
    } else if cli.infect_data {
        let addr = elf.infect_data(&cli.shellcode()?)?;
        println!("[+] parasite at 0x{addr:x}");
    } else if cli.to_exe2so {
        let name = cli.string("--to-exe2so")?.to_string();
        let value = cli.value.ok_or_else(|| Error::Args("--to-exe2so needs -m".into()))?;
        elf.add_dynsym(&name, value, cli.size.unwrap_or(0))?;
    } else if cli.inject_hook {
        let symbol = cli.string("--inject-hook")?.to_string();
        let path = cli.aux_file("--inject-hook")?.clone();
        elf.hook_extern(&symbol, path, cli.offset.unwrap_or(0))?;
    } else {
        return Err(Error::Args("no operation selected".into()));
    }
    elf.save()
}
