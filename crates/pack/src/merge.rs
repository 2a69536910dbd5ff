// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The merging packager: compose an output archive from inline entries,
//! directories, and other archives under ordered rules.
//!
//! Inline entries are written first. Sources are processed in
//! registration order; for each source entry the first rule bound to that
//! source whose pattern matches decides COPY or SKIP, and an entry no
//! rule matches is a configuration error. The first write of a name wins;
//! later duplicates are warned about, once per collision.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::read::{ZipError, ZipReader};
use crate::write::ZipWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Directory,
    Zip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub kind: SourceKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Copy,
    Skip,
}

/// Binds (source, pattern, action). Patterns are regular expressions
/// matched against entry names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub source: usize,
    pub pattern: String,
    pub action: RuleAction,
}

/// Declarative merge input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeSpec {
    /// Explicit (name, content) entries, always written first.
    #[serde(default)]
    pub inline: Vec<(String, Vec<u8>)>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl MergeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inline(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.inline.push((name.into(), content.into()));
        self
    }

    pub fn source(mut self, kind: SourceKind, path: impl Into<PathBuf>) -> Self {
        self.sources.push(Source { kind, path: path.into() });
        self
    }

    /// Bind a rule to the most recently added source.
    pub fn rule(mut self, pattern: impl Into<String>, action: RuleAction) -> Self {
        let source = self.sources.len().saturating_sub(1);
        self.rules.push(Rule { source, pattern: pattern.into(), action });
        self
    }
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("no rule matches entry {entry:?} of source {source_index}")]
    NoRule { source_index: usize, entry: String },

    #[error("bad rule pattern {pattern:?}: {error}")]
    BadPattern { pattern: String, error: regex::Error },

    #[error("source {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error(transparent)]
    Zip(#[from] ZipError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What the merge wrote and what it had to drop.
#[derive(Debug, Default)]
pub struct MergeReport {
    pub written: usize,
    pub skipped: usize,
    /// Names that collided with an earlier write; first write wins.
    pub duplicates: Vec<String>,
}

struct CompiledRule {
    source: usize,
    pattern: Regex,
    action: RuleAction,
}

/// Run the merge, deflating the output at `level` (0 stores).
pub fn merge(spec: &MergeSpec, output: &Path, level: u32) -> Result<MergeReport, MergeError> {
    let rules = compile_rules(&spec.rules)?;
    let mut writer = ZipWriter::create(output, level)?;
    let mut written: HashSet<String> = HashSet::new();
    let mut report = MergeReport::default();

    let mut emit = |writer: &mut ZipWriter,
                    report: &mut MergeReport,
                    name: &str,
                    data: &[u8]|
     -> Result<(), MergeError> {
        if !written.insert(name.to_string()) {
            warn!(target: "comexe::pack", "duplicate entry {name:?}: first write wins");
            report.duplicates.push(name.to_string());
            return Ok(());
        }
        writer.add(name, data)?;
        report.written += 1;
        Ok(())
    };

    for (name, content) in &spec.inline {
        emit(&mut writer, &mut report, name, content)?;
    }

    for (source_id, source) in spec.sources.iter().enumerate() {
        match source.kind {
            SourceKind::Directory => {
                let mut files = Vec::new();
                collect_files(&source.path, &source.path, &mut files)?;
                // Directory iteration order is platform-defined; sort for
                // reproducible output.
                files.sort();
                for (name, path) in files {
                    match action_for(&rules, source_id, &name)? {
                        RuleAction::Skip => report.skipped += 1,
                        RuleAction::Copy => {
                            let data = std::fs::read(&path)?;
                            emit(&mut writer, &mut report, &name, &data)?;
                        }
                    }
                }
            }
            SourceKind::Zip => {
                let mut reader = ZipReader::open(&source.path)?;
                for index in 0..reader.len() {
                    let name = reader.entries()[index].name.clone();
                    match action_for(&rules, source_id, &name)? {
                        RuleAction::Skip => report.skipped += 1,
                        RuleAction::Copy => {
                            let data = reader.read_index(index)?;
                            emit(&mut writer, &mut report, &name, &data)?;
                        }
                    }
                }
            }
        }
    }

    writer.finish()?;
    Ok(report)
}

fn compile_rules(rules: &[Rule]) -> Result<Vec<CompiledRule>, MergeError> {
    rules
        .iter()
        .map(|r| {
            Regex::new(&r.pattern)
                .map(|pattern| CompiledRule { source: r.source, pattern, action: r.action })
                .map_err(|error| MergeError::BadPattern { pattern: r.pattern.clone(), error })
        })
        .collect()
}

/// First matching rule for this source decides; no match raises.
fn action_for(
    rules: &[CompiledRule],
    source: usize,
    entry: &str,
) -> Result<RuleAction, MergeError> {
    rules
        .iter()
        .find(|r| r.source == source && r.pattern.is_match(entry))
        .map(|r| r.action)
        .ok_or_else(|| MergeError::NoRule { source_index: source, entry: entry.to_string() })
}

/// Recursive directory walk. Entry names are relative to the source root
/// (its top-most component stripped), with `/` separators.
fn collect_files(
    root: &Path,
    dir: &Path,
    out: &mut Vec<(String, PathBuf)>,
) -> Result<(), MergeError> {
    if !root.is_dir() {
        return Err(MergeError::NotADirectory(root.to_path_buf()));
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else {
            let rel = path
                .strip_prefix(root)
                .map_err(|_| MergeError::NotADirectory(root.to_path_buf()))?;
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push((name, path));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
