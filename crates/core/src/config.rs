// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Module search chain configuration.
//!
//! A short string of single-letter codes names where `require` looks for
//! modules, in order. The default `"1RZ"` searches preloaded natives, then
//! the embedded ZIP runtime path, then the embedded ZIP root.

use thiserror::Error;

/// Longest accepted code string. The chain is a fixed-capacity
/// configuration value, not an open-ended list.
pub const SEARCH_CHAIN_MAX: usize = 8;

/// Default chain: preloads, embedded runtime path, embedded root.
pub const SEARCH_CHAIN_DEFAULT: &str = "1RZ";

/// Path prefix inside the archive for the `R` root.
pub const EMBEDDED_RUNTIME_PREFIX: &str = "comexe/usr/share/lua/5.5/";

/// One root in the module search order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchRoot {
    /// `1`: preloaded native modules.
    Preloaded,
    /// `R`: embedded ZIP runtime path.
    EmbeddedRuntime,
    /// `Z`: embedded ZIP root.
    EmbeddedRoot,
    /// `F`: host filesystem.
    HostFs,
    /// `4`: interpreter's native package path.
    NativePath,
}

impl SearchRoot {
    fn from_code(c: char) -> Option<Self> {
        match c {
            '1' => Some(SearchRoot::Preloaded),
            'R' => Some(SearchRoot::EmbeddedRuntime),
            'Z' => Some(SearchRoot::EmbeddedRoot),
            'F' => Some(SearchRoot::HostFs),
            '4' => Some(SearchRoot::NativePath),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("module search chain {0:?} exceeds {SEARCH_CHAIN_MAX} codes")]
    ChainTooLong(String),

    #[error("unknown module search code {code:?} in {chain:?}")]
    UnknownCode { chain: String, code: char },

    #[error("module search chain is empty")]
    EmptyChain,
}

/// Parsed, ordered module search chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchChain {
    code: String,
    roots: Vec<SearchRoot>,
}

impl SearchChain {
    pub fn parse(code: &str) -> Result<Self, ConfigError> {
        if code.is_empty() {
            return Err(ConfigError::EmptyChain);
        }
        if code.len() > SEARCH_CHAIN_MAX {
            return Err(ConfigError::ChainTooLong(code.to_string()));
        }
        let mut roots = Vec::with_capacity(code.len());
        for c in code.chars() {
            match SearchRoot::from_code(c) {
                Some(root) => roots.push(root),
                None => {
                    return Err(ConfigError::UnknownCode { chain: code.to_string(), code: c })
                }
            }
        }
        Ok(SearchChain { code: code.to_string(), roots })
    }

    /// The chain from `COMEXE_SEARCH_CHAIN`, or the default.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var("COMEXE_SEARCH_CHAIN") {
            Ok(code) => SearchChain::parse(&code),
            Err(_) => SearchChain::parse(SEARCH_CHAIN_DEFAULT),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Roots in search order.
    pub fn roots(&self) -> &[SearchRoot] {
        &self.roots
    }
}

impl Default for SearchChain {
    fn default() -> Self {
        // The default literal always parses.
        match SearchChain::parse(SEARCH_CHAIN_DEFAULT) {
            Ok(chain) => chain,
            Err(_) => unreachable!("default search chain is valid"),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
