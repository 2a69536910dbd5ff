// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured header-value parsing (Content-Type, Content-Disposition, …).
//!
//! Semicolon-separated: the first segment is the main value, the rest are
//! `name=value` parameters or bare flags. Semicolons inside quoted values
//! do not split. RFC 8187 ext-values (`name*=charset'lang'pct-encoded`)
//! are decoded and stored under the bare name.

use percent_encoding::percent_decode_str;

/// One parameter: a string value or a bare boolean flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Value(String),
    Flag,
}

/// A parsed header value with its parameters, keys lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderValue {
    /// Main value, trimmed and lowercased.
    pub value: String,
    params: Vec<(String, Param)>,
}

impl HeaderValue {
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// The parameter's string value; `None` for absent or bare flags.
    pub fn param_str(&self, name: &str) -> Option<&str> {
        match self.param(name)? {
            Param::Value(v) => Some(v),
            Param::Flag => None,
        }
    }

    pub fn has_flag(&self, name: &str) -> bool {
        matches!(self.param(name), Some(Param::Flag))
    }

    pub fn params(&self) -> &[(String, Param)] {
        &self.params
    }
}

/// Split on `;` outside quotes.
fn split_segments(raw: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in raw.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if quote.is_some() => {
                current.push(c);
                escaped = true;
            }
            '"' | '\'' => {
                match quote {
                    None => quote = Some(c),
                    Some(q) if q == c => quote = None,
                    Some(_) => {}
                }
                current.push(c);
            }
            ';' if quote.is_none() => {
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

/// Strip matching single or double quotes and honour `\x` escapes inside.
fn unquote(s: &str) -> String {
    let s = s.trim();
    let bytes = s.as_bytes();
    let quoted = s.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0];
    if !quoted {
        return s.to_string();
    }
    let inner = &s[1..s.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    out
}

/// Decode an RFC 8187 ext-value: `<charset>'<lang>'<pct-encoded>`.
fn decode_ext_value(s: &str) -> String {
    let mut parts = s.splitn(3, '\'');
    let _charset = parts.next();
    let _lang = parts.next();
    match parts.next() {
        Some(encoded) => percent_decode_str(encoded).decode_utf8_lossy().into_owned(),
        // Not in ext-value form; keep it as-is.
        None => s.to_string(),
    }
}

pub fn parse_header_value(raw: &str) -> HeaderValue {
    let segments = split_segments(raw);
    let mut iter = segments.into_iter();
    let value = iter.next().unwrap_or_default().trim().to_ascii_lowercase();

    let mut params = Vec::new();
    for segment in iter {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        match segment.split_once('=') {
            Some((key, val)) => {
                let key = key.trim().to_ascii_lowercase();
                if let Some(bare) = key.strip_suffix('*') {
                    params.push((bare.to_string(), Param::Value(decode_ext_value(val.trim()))));
                } else {
                    params.push((key, Param::Value(unquote(val))));
                }
            }
            None => params.push((segment.to_ascii_lowercase(), Param::Flag)),
        }
    }
    HeaderValue { value, params }
}

#[cfg(test)]
#[path = "headers_tests.rs"]
mod tests;
