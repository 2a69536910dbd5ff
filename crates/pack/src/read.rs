// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ZIP reading: central directory walk and lazy entry extraction.
//!
//! The end-of-central-directory record is located by scanning backwards
//! from EOF (tolerating up to a maximal-length comment), and every stored
//! offset is rebased so archives appended to an executable read the same
//! as standalone ones.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::ControlFlow;
use std::path::Path;

use flate2::read::DeflateDecoder;
use thiserror::Error;

pub(crate) const EOCD_SIG: u32 = 0x0605_4b50;
pub(crate) const CENTRAL_SIG: u32 = 0x0201_4b50;
pub(crate) const LOCAL_SIG: u32 = 0x0403_4b50;

pub(crate) const METHOD_STORE: u16 = 0;
pub(crate) const METHOD_DEFLATE: u16 = 8;

/// EOCD is 22 bytes plus a comment of at most 65535.
const EOCD_SCAN_MAX: u64 = 22 + 65_535;

#[derive(Debug, Error)]
pub enum ZipError {
    #[error("not a zip archive: end of central directory not found")]
    NoCentralDirectory,

    #[error("corrupt archive: {0}")]
    Corrupt(&'static str),

    #[error("entry {name:?}: unsupported compression method {method}")]
    UnsupportedMethod { name: String, method: u16 },

    #[error("entry {name:?}: crc mismatch")]
    Crc { name: String },

    #[error("no such entry {0:?}")]
    NoSuchEntry(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One central-directory record.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub name: String,
    pub size: u64,
    pub(crate) method: u16,
    pub(crate) crc: u32,
    pub(crate) comp_size: u64,
    pub(crate) offset: u64,
}

/// Archive open for reading. Works on plain archives and on executables
/// with an archive appended.
pub struct ZipReader {
    file: File,
    /// File offset the archive's own offsets are relative to; non-zero
    /// when a native image precedes the archive.
    base: u64,
    entries: Vec<EntryInfo>,
}

impl ZipReader {
    pub fn open(path: &Path) -> Result<Self, ZipError> {
        let mut file = File::open(path)?;
        let file_len = file.seek(SeekFrom::End(0))?;

        let (eocd_pos, eocd) = find_eocd(&mut file, file_len)?;
        let total_entries = u16::from_le_bytes([eocd[10], eocd[11]]) as usize;
        let cd_size = u64::from(u32::from_le_bytes([eocd[12], eocd[13], eocd[14], eocd[15]]));
        let cd_offset = u64::from(u32::from_le_bytes([eocd[16], eocd[17], eocd[18], eocd[19]]));

        // With an executable in front, the stored central-directory offset
        // undershoots its real position by the size of that prefix.
        let base = eocd_pos
            .checked_sub(cd_size)
            .and_then(|p| p.checked_sub(cd_offset))
            .ok_or(ZipError::Corrupt("central directory extends past file start"))?;

        let mut cd = vec![0u8; cd_size as usize];
        file.seek(SeekFrom::Start(base + cd_offset))?;
        file.read_exact(&mut cd)?;

        let entries = parse_central_directory(&cd, total_entries)?;
        Ok(Self { file, base, entries })
    }

    pub fn entries(&self) -> &[EntryInfo] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decompressed bytes of the entry at `index`.
    pub fn read_index(&mut self, index: usize) -> Result<Vec<u8>, ZipError> {
        let entry = self
            .entries
            .get(index)
            .cloned()
            .ok_or(ZipError::Corrupt("entry index out of range"))?;
        self.read_entry(&entry)
    }

    /// Decompressed bytes of the named entry.
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>, ZipError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.name == name)
            .cloned()
            .ok_or_else(|| ZipError::NoSuchEntry(name.to_string()))?;
        self.read_entry(&entry)
    }

    /// Walk entries in central-directory order. The callback gets the
    /// entry name and a lazy reader for the full uncompressed bytes;
    /// returning `ControlFlow::Break` halts iteration.
    pub fn for_each<F>(&mut self, mut f: F) -> Result<(), ZipError>
    where
        F: FnMut(&str, &mut dyn FnMut() -> Option<Vec<u8>>) -> ControlFlow<()>,
    {
        for index in 0..self.entries.len() {
            let name = self.entries[index].name.clone();
            let mut lazy = {
                let this = &mut *self;
                let mut cached: Option<Vec<u8>> = None;
                move || {
                    if cached.is_none() {
                        cached = this.read_index(index).ok();
                    }
                    cached.clone()
                }
            };
            if f(&name, &mut lazy).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn read_entry(&mut self, entry: &EntryInfo) -> Result<Vec<u8>, ZipError> {
        self.file.seek(SeekFrom::Start(self.base + entry.offset))?;
        let mut local = [0u8; 30];
        self.file.read_exact(&mut local)?;
        if u32::from_le_bytes([local[0], local[1], local[2], local[3]]) != LOCAL_SIG {
            return Err(ZipError::Corrupt("bad local header signature"));
        }
        // Name and extra lengths in the local header may differ from the
        // central directory; trust the local copy for the skip.
        let name_len = u64::from(u16::from_le_bytes([local[26], local[27]]));
        let extra_len = u64::from(u16::from_le_bytes([local[28], local[29]]));
        self.file.seek(SeekFrom::Current((name_len + extra_len) as i64))?;

        let mut compressed = vec![0u8; entry.comp_size as usize];
        self.file.read_exact(&mut compressed)?;

        let data = match entry.method {
            METHOD_STORE => compressed,
            METHOD_DEFLATE => {
                let mut out = Vec::with_capacity(entry.size as usize);
                DeflateDecoder::new(&compressed[..]).read_to_end(&mut out)?;
                out
            }
            method => {
                return Err(ZipError::UnsupportedMethod { name: entry.name.clone(), method })
            }
        };

        let mut crc = flate2::Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc {
            return Err(ZipError::Crc { name: entry.name.clone() });
        }
        Ok(data)
    }
}

/// Scan backwards from EOF for the EOCD record; returns its position and
/// its fixed 22-byte prefix.
fn find_eocd(file: &mut File, file_len: u64) -> Result<(u64, [u8; 22]), ZipError> {
    let scan_len = EOCD_SCAN_MAX.min(file_len);
    let scan_start = file_len - scan_len;
    let mut tail = vec![0u8; scan_len as usize];
    file.seek(SeekFrom::Start(scan_start))?;
    file.read_exact(&mut tail)?;

    let sig = EOCD_SIG.to_le_bytes();
    for pos in (0..tail.len().saturating_sub(21)).rev() {
        if tail[pos..pos + 4] == sig {
            let mut eocd = [0u8; 22];
            eocd.copy_from_slice(&tail[pos..pos + 22]);
            return Ok((scan_start + pos as u64, eocd));
        }
    }
    Err(ZipError::NoCentralDirectory)
}

fn parse_central_directory(cd: &[u8], total: usize) -> Result<Vec<EntryInfo>, ZipError> {
    let mut entries = Vec::with_capacity(total);
    let mut pos = 0usize;
    for _ in 0..total {
        let rec = cd.get(pos..pos + 46).ok_or(ZipError::Corrupt("truncated central directory"))?;
        if u32::from_le_bytes([rec[0], rec[1], rec[2], rec[3]]) != CENTRAL_SIG {
            return Err(ZipError::Corrupt("bad central directory signature"));
        }
        let method = u16::from_le_bytes([rec[10], rec[11]]);
        let crc = u32::from_le_bytes([rec[16], rec[17], rec[18], rec[19]]);
        let comp_size = u64::from(u32::from_le_bytes([rec[20], rec[21], rec[22], rec[23]]));
        let size = u64::from(u32::from_le_bytes([rec[24], rec[25], rec[26], rec[27]]));
        let name_len = u16::from_le_bytes([rec[28], rec[29]]) as usize;
        let extra_len = u16::from_le_bytes([rec[30], rec[31]]) as usize;
        let comment_len = u16::from_le_bytes([rec[32], rec[33]]) as usize;
        let offset = u64::from(u32::from_le_bytes([rec[42], rec[43], rec[44], rec[45]]));

        let name_bytes = cd
            .get(pos + 46..pos + 46 + name_len)
            .ok_or(ZipError::Corrupt("truncated entry name"))?;
        let name = String::from_utf8_lossy(name_bytes).into_owned();

        entries.push(EntryInfo { name, size, method, crc, comp_size, offset });
        pos += 46 + name_len + extra_len + comment_len;
    }
    Ok(entries)
}

#[cfg(test)]
#[path = "read_tests.rs"]
mod tests;
