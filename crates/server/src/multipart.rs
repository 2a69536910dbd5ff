// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! multipart/form-data parsing (RFC 7578, strict CRLF).

use std::collections::HashMap;

use thiserror::Error;

use crate::headers::parse_header_value;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultipartError {
    #[error("malformed")]
    Malformed,

    #[error("part missing a name parameter")]
    MissingName,
}

/// One body part: its headers, disposition fields, and raw value bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Headers with lowercased names.
    pub headers: HashMap<String, String>,
    pub name: String,
    /// Present only for file parts.
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub value: Vec<u8>,
}

impl Part {
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }
}

/// Parsed body: the part list plus a by-name convenience view.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Multipart {
    pub parts: Vec<Part>,
}

impl Multipart {
    /// First part with this field name.
    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.name == name)
    }

    /// Value bytes of a non-file field.
    pub fn value(&self, name: &str) -> Option<&[u8]> {
        let part = self.part(name)?;
        if part.is_file() {
            return None;
        }
        Some(&part.value)
    }

    /// A file part by field name.
    pub fn file(&self, name: &str) -> Option<&Part> {
        self.part(name).filter(|p| p.is_file())
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..].windows(needle.len()).position(|w| w == needle).map(|p| p + from)
}

/// Parse a complete body against its boundary.
///
/// The body must begin with `--<boundary>\r\n`. Each part is headers, a
/// blank line, then value bytes, terminated by `\r\n--<boundary>` (another
/// part follows) or `\r\n--<boundary>--` (final).
pub fn parse(body: &[u8], boundary: &str) -> Result<Multipart, MultipartError> {
    let delim = [b"--", boundary.as_bytes()].concat();
    let open = [&delim[..], b"\r\n"].concat();
    if !body.starts_with(&open) {
        return Err(MultipartError::Malformed);
    }
    let closer = [b"\r\n", &delim[..]].concat();

    let mut parts = Vec::new();
    let mut pos = open.len();
    loop {
        // Headers run to the first blank line.
        let headers_end = find(body, b"\r\n\r\n", pos).ok_or(MultipartError::Malformed)?;
        let header_block =
            std::str::from_utf8(&body[pos..headers_end]).map_err(|_| MultipartError::Malformed)?;
        let mut headers = HashMap::new();
        for line in header_block.split("\r\n") {
            if line.is_empty() {
                continue;
            }
            let (name, value) = line.split_once(':').ok_or(MultipartError::Malformed)?;
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        // Value runs to the next boundary marker.
        let value_start = headers_end + 4;
        let value_end = find(body, &closer, value_start).ok_or(MultipartError::Malformed)?;
        let value = body[value_start..value_end].to_vec();

        let disposition = headers
            .get("content-disposition")
            .map(|raw| parse_header_value(raw))
            .ok_or(MultipartError::MissingName)?;
        let name = disposition
            .param_str("name")
            .ok_or(MultipartError::MissingName)?
            .to_string();
        let filename = disposition.param_str("filename").map(str::to_string);
        let content_type = headers.get("content-type").cloned();

        parts.push(Part { headers, name, filename, content_type, value });

        // After the boundary: "--" closes the body, CRLF opens another part.
        let tail = value_end + closer.len();
        if body[tail..].starts_with(b"--") {
            break;
        }
        if !body[tail..].starts_with(b"\r\n") {
            return Err(MultipartError::Malformed);
        }
        pos = tail + 2;
    }

    Ok(Multipart { parts })
}

#[cfg(test)]
#[path = "multipart_tests.rs"]
mod tests;
