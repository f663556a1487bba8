//! Shellcode and script converters: `\xNN` unescaping, fragment
//! extraction, and the bin-to-shell/cmd reconstruction script emitters.

use std::fmt::Write as _;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Error, Result};

/// Hex characters emitted per script line before wrapping.
const MAX_LINE_LEN: usize = 128;

/// Decode a `\xNN\xNN...` escaped string into raw bytes. Each byte takes
/// exactly four characters.
pub fn unescape_hex(escaped: &str) -> Result<Vec<u8>> {
    let chars = escaped.as_bytes();
    if chars.is_empty() || chars.len() % 4 != 0 {
        return Err(Error::Args(format!(
            "shellcode of {} characters is not \\xNN groups",
            chars.len()
        )));
    }
    let mut bytes = Vec::with_capacity(chars.len() / 4);
    for group in chars.chunks(4) {
        if &group[..2] != b"\\x" {
            return Err(Error::Args("shellcode byte without \\x prefix".into()));
        }
        let hex = core::str::from_utf8(&group[2..])
            .ok()
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(|| Error::Args("shellcode byte is not two hex digits".into()))?;
        bytes.push(hex);
    }
    Ok(bytes)
}

/// Render bytes as a `\xNN...` escaped string.
pub fn escape_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 4);
    for b in bytes {
        let _ = write!(out, "\\x{b:02x}");
    }
    out
}

/// Parse a decimal or `0x`-prefixed number.
pub fn parse_number(text: &str) -> Result<u64> {
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        text.parse()
    };
    parsed.map_err(|_| Error::Args(format!("bad number {text:?}")))
}

/// Read `size` bytes at `offset` out of `path`.
pub fn extract_fragment<P: AsRef<Path>>(path: P, offset: u64, size: u64) -> Result<Vec<u8>> {
    let mut file = std::fs::File::open(path).map_err(Error::FileOpen)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buffer = vec![0u8; size as usize];
    file.read_exact(&mut buffer)
        .map_err(|_| Error::Args(format!("fragment {offset:#x}+{size:#x} past file end")))?;
    Ok(buffer)
}

/// Write `bytes` to `path`, or to the `<path>.out` sibling when `sibling`.
/// Returns the path written.
pub fn write_blob<P: AsRef<Path>>(path: P, bytes: &[u8], sibling: bool) -> Result<PathBuf> {
    let path = path.as_ref();
    let output = if sibling {
        let mut name = path.as_os_str().to_owned();
        name.push(".out");
        PathBuf::from(name)
    } else {
        path.to_path_buf()
    };
    std::fs::write(&output, bytes)?;
    info!("wrote {} bytes to {}", bytes.len(), output.display());
    Ok(output)
}

fn output_names(path: &Path, extension: &str) -> Result<(PathBuf, String)> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Args(format!("no file name in {}", path.display())))?
        .to_string();
    Ok((path.with_extension(extension), filename))
}

/// Emit a POSIX shell script that reconstructs `path` with `xxd -r -p`.
pub fn bin_to_sh<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(Error::FileOpen)?;
    let (output, filename) = output_names(path, "sh")?;

    let mut script = format!("echo \"\" | xxd -r -p > {filename}\n");
    for chunk in bytes.chunks(MAX_LINE_LEN / 2) {
        let mut hex = String::with_capacity(chunk.len() * 2);
        for b in chunk {
            let _ = write!(hex, "{b:02x}");
        }
        let _ = writeln!(script, "echo \"{hex}\" | xxd -r -p >> {filename}");
    }
    std::fs::write(&output, script)?;
    info!("wrote reconstruction script {}", output.display());
    Ok(output)
}

/// Emit a Windows cmd script that reconstructs `path` via a hex sidecar and
/// a powershell decode step.
pub fn bin_to_cmd<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(Error::FileOpen)?;
    let (output, filename) = output_names(path, "cmd")?;
    let basename = filename.rsplit_once('.').map(|(b, _)| b).unwrap_or(&filename);

    let mut script = format!("echo|set /p=\"\">{basename}.hex\n");
    for chunk in bytes.chunks(MAX_LINE_LEN / 2) {
        let mut hex = String::with_capacity(chunk.len() * 2);
        for b in chunk {
            let _ = write!(hex, "{b:02x}");
        }
        let _ = writeln!(script, "echo|set /p=\"{hex}\">>{basename}.hex");
    }
    let _ = writeln!(
        script,
        "powershell -Command \"$h=Get-Content -readcount 0 -path './{basename}.hex';\
         $l=$h[0].length;$b=New-Object byte[] ($l/2);$x=0;\
         for ($i=0;$i -le $l-1;$i+=2){{$b[$x]=[byte]::Parse($h[0].Substring($i,2),\
         [System.Globalization.NumberStyles]::HexNumber);$x+=1}};\
         set-content -encoding byte '{filename}' -value $b;\
         Remove-Item -force {basename}.hex;\""
    );
    std::fs::write(&output, script)?;
    info!("wrote reconstruction script {}", output.display());
    Ok(output)
}
