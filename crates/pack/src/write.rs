// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ZIP writing: create-new archives, store or deflate.
//!
//! The writer always truncates its target; appending to an existing
//! archive is disallowed so a central directory can never accumulate
//! duplicated records. Entries are written as they are added and the
//! central directory is drained on `finish`.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::read::{ZipError, CENTRAL_SIG, EOCD_SIG, LOCAL_SIG, METHOD_DEFLATE, METHOD_STORE};

/// Fixed DOS timestamp (2000-01-01) so output archives are reproducible.
const DOS_TIME: u16 = 0;
const DOS_DATE: u16 = (20 << 9) | (1 << 5) | 1;

struct CdRecord {
    name: String,
    method: u16,
    crc: u32,
    comp_size: u32,
    size: u32,
    offset: u32,
}

pub struct ZipWriter {
    file: File,
    level: u32,
    offset: u32,
    records: Vec<CdRecord>,
}

impl ZipWriter {
    /// Create (truncating) the output archive. `level` 0 stores entries
    /// uncompressed; 1–9 deflate.
    pub fn create(path: &Path, level: u32) -> Result<Self, ZipError> {
        let file = File::create(path)?;
        Ok(Self { file, level, offset: 0, records: Vec::new() })
    }

    pub fn add(&mut self, name: &str, data: &[u8]) -> Result<(), ZipError> {
        let mut crc = flate2::Crc::new();
        crc.update(data);

        let (method, payload) = if self.level == 0 {
            (METHOD_STORE, data.to_vec())
        } else {
            let mut encoder =
                DeflateEncoder::new(Vec::new(), Compression::new(self.level.min(9)));
            encoder.write_all(data)?;
            let deflated = encoder.finish()?;
            // Incompressible data is stored rather than inflated.
            if deflated.len() < data.len() {
                (METHOD_DEFLATE, deflated)
            } else {
                (METHOD_STORE, data.to_vec())
            }
        };

        let record = CdRecord {
            name: name.to_string(),
            method,
            crc: crc.sum(),
            comp_size: payload.len() as u32,
            size: data.len() as u32,
            offset: self.offset,
        };

        let mut header = Vec::with_capacity(30 + name.len());
        header.extend_from_slice(&LOCAL_SIG.to_le_bytes());
        header.extend_from_slice(&20u16.to_le_bytes()); // version needed
        header.extend_from_slice(&0u16.to_le_bytes()); // flags
        header.extend_from_slice(&method.to_le_bytes());
        header.extend_from_slice(&DOS_TIME.to_le_bytes());
        header.extend_from_slice(&DOS_DATE.to_le_bytes());
        header.extend_from_slice(&record.crc.to_le_bytes());
        header.extend_from_slice(&record.comp_size.to_le_bytes());
        header.extend_from_slice(&record.size.to_le_bytes());
        header.extend_from_slice(&(name.len() as u16).to_le_bytes());
        header.extend_from_slice(&0u16.to_le_bytes()); // extra
        header.extend_from_slice(name.as_bytes());

        self.file.write_all(&header)?;
        self.file.write_all(&payload)?;
        self.offset += (header.len() + payload.len()) as u32;
        self.records.push(record);
        Ok(())
    }

    /// Write the central directory and close the archive.
    pub fn finish(mut self) -> Result<(), ZipError> {
        let cd_offset = self.offset;
        let mut cd = Vec::new();
        for record in &self.records {
            cd.extend_from_slice(&CENTRAL_SIG.to_le_bytes());
            cd.extend_from_slice(&20u16.to_le_bytes()); // version made by
            cd.extend_from_slice(&20u16.to_le_bytes()); // version needed
            cd.extend_from_slice(&0u16.to_le_bytes()); // flags
            cd.extend_from_slice(&record.method.to_le_bytes());
            cd.extend_from_slice(&DOS_TIME.to_le_bytes());
            cd.extend_from_slice(&DOS_DATE.to_le_bytes());
            cd.extend_from_slice(&record.crc.to_le_bytes());
            cd.extend_from_slice(&record.comp_size.to_le_bytes());
            cd.extend_from_slice(&record.size.to_le_bytes());
            cd.extend_from_slice(&(record.name.len() as u16).to_le_bytes());
            cd.extend_from_slice(&0u16.to_le_bytes()); // extra
            cd.extend_from_slice(&0u16.to_le_bytes()); // comment
            cd.extend_from_slice(&0u16.to_le_bytes()); // disk
            cd.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
            cd.extend_from_slice(&0u32.to_le_bytes()); // external attrs
            cd.extend_from_slice(&record.offset.to_le_bytes());
            cd.extend_from_slice(record.name.as_bytes());
        }

        let mut eocd = Vec::with_capacity(22);
        eocd.extend_from_slice(&EOCD_SIG.to_le_bytes());
        eocd.extend_from_slice(&0u16.to_le_bytes()); // this disk
        eocd.extend_from_slice(&0u16.to_le_bytes()); // cd disk
        eocd.extend_from_slice(&(self.records.len() as u16).to_le_bytes());
        eocd.extend_from_slice(&(self.records.len() as u16).to_le_bytes());
        eocd.extend_from_slice(&(cd.len() as u32).to_le_bytes());
        eocd.extend_from_slice(&cd_offset.to_le_bytes());
        eocd.extend_from_slice(&0u16.to_le_bytes()); // comment length

        self.file.write_all(&cd)?;
        self.file.write_all(&eocd)?;
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "write_tests.rs"]
mod tests;
