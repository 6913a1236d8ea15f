//! Binary inspection.
//!
//! Only what build verification needs: the program interpreter an ELF
//! executable requests. Statically linked binaries have none.

use std::io;
use std::path::Path;
use toolsmith_core::{Error, Result};

const ELF_MAGIC: &[u8; 4] = b"\x7fELF";
const PT_INTERP: u32 = 3;

#[derive(Clone, Copy)]
struct Reader<'a> {
    data: &'a [u8],
    little_endian: bool,
}

impl Reader<'_> {
    fn bytes<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        self.data.get(offset..offset.checked_add(N)?)?.try_into().ok()
    }

    fn u16(&self, offset: usize) -> Option<u64> {
        let b = self.bytes::<2>(offset)?;
        Some(u64::from(if self.little_endian {
            u16::from_le_bytes(b)
        } else {
            u16::from_be_bytes(b)
        }))
    }

    fn u32(&self, offset: usize) -> Option<u64> {
        let b = self.bytes::<4>(offset)?;
        Some(u64::from(if self.little_endian {
            u32::from_le_bytes(b)
        } else {
            u32::from_be_bytes(b)
        }))
    }

    fn u64(&self, offset: usize) -> Option<u64> {
        let b = self.bytes::<8>(offset)?;
        Some(if self.little_endian {
            u64::from_le_bytes(b)
        } else {
            u64::from_be_bytes(b)
        })
    }
}

/// Interpreter requested by ELF image `data`, `None` when statically linked.
///
/// Returns `Err` with a description when `data` is not a well-formed ELF image.
fn parse_interpreter(data: &[u8]) -> std::result::Result<Option<String>, &'static str> {
    if data.get(..4) != Some(ELF_MAGIC.as_slice()) {
        return Err("not an ELF file");
    }
    let is_64 = match data.get(4) {
        Some(1) => false,
        Some(2) => true,
        _ => return Err("unknown ELF class"),
    };
    let little_endian = match data.get(5) {
        Some(1) => true,
        Some(2) => false,
        _ => return Err("unknown ELF byte order"),
    };
    let r = Reader {
        data,
        little_endian,
    };
    let truncated = "truncated ELF header";

    let (phoff, phentsize, phnum) = if is_64 {
        (r.u64(0x20), r.u16(0x36), r.u16(0x38))
    } else {
        (r.u32(0x1c), r.u16(0x2a), r.u16(0x2c))
    };
    let (Some(phoff), Some(phentsize), Some(phnum)) = (phoff, phentsize, phnum) else {
        return Err(truncated);
    };

    for i in 0..phnum {
        let header = i
            .checked_mul(phentsize)
            .and_then(|rel| phoff.checked_add(rel))
            .and_then(|at| usize::try_from(at).ok())
            .ok_or(truncated)?;
        let p_type = r.u32(header).ok_or(truncated)?;
        if p_type != u64::from(PT_INTERP) {
            continue;
        }
        let (offset, size) = if is_64 {
            (r.u64(header + 0x08), r.u64(header + 0x20))
        } else {
            (r.u32(header + 0x04), r.u32(header + 0x10))
        };
        let (Some(offset), Some(size)) = (offset, size) else {
            return Err(truncated);
        };
        let start = usize::try_from(offset).map_err(|_| truncated)?;
        let end = start
            .checked_add(usize::try_from(size).map_err(|_| truncated)?)
            .ok_or(truncated)?;
        let raw = data.get(start..end).ok_or("interpreter out of bounds")?;
        let path = raw.split(|b| *b == 0).next().unwrap_or_default();
        return Ok(Some(String::from_utf8_lossy(path).into_owned()));
    }
    Ok(None)
}

/// Program interpreter (`PT_INTERP`) of the ELF binary at `path`.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read or is not a valid ELF
/// image.
pub fn interpreter(path: &Path) -> Result<Option<String>> {
    let data = std::fs::read(path).map_err(|e| Error::io(e, path, "read"))?;
    parse_interpreter(&data).map_err(|msg| {
        Error::io(io::Error::new(io::ErrorKind::InvalidData, msg), path, "inspect")
    })
}
