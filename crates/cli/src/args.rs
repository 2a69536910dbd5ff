// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host option scanning.
//!
//! Host options come before the script name; everything after the script
//! (or after `--`) is forwarded untouched as the script's `arg` table.
//! `-x` abandons host parsing entirely and hands the remaining tokens to
//! the extended packaging CLI.

use crate::exit_error::ExitError;

/// A `-l [name=]mod` preload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preload {
    /// Global name to bind the module under; defaults to the module name.
    pub global: Option<String>,
    pub module: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct HostOptions {
    /// `-e stat` statements, executed in order before the script.
    pub execute: Vec<String>,
    /// `-i`: force the REPL after the script finishes.
    pub interactive: bool,
    /// `-l` preloads.
    pub preloads: Vec<Preload>,
    /// `-v`: print the banner.
    pub banner: bool,
    /// `-E`: ignore environment configuration.
    pub ignore_env: bool,
    /// `-W`: enable warnings from the start.
    pub warnings: bool,
    /// `-`: read the program from stdin.
    pub read_stdin: bool,
    /// Script path, when one was given.
    pub script: Option<String>,
    /// Arguments forwarded to script.
    pub script_args: Vec<String>,
    /// `-x`: remaining tokens for the extended packaging CLI.
    pub extended: Option<Vec<String>>,
}

impl HostOptions {
    pub fn parse(args: &[String]) -> Result<Self, ExitError> {
        let mut opts = HostOptions::default();
        let mut iter = args.iter().enumerate();

        while let Some((index, arg)) = iter.next() {
            match arg.as_str() {
                "-e" => {
                    let (_, stat) = iter
                        .next()
                        .ok_or_else(|| ExitError::usage("-e needs a statement"))?;
                    opts.execute.push(stat.clone());
                }
                "-l" => {
                    let (_, spec) =
                        iter.next().ok_or_else(|| ExitError::usage("-l needs a module"))?;
                    opts.preloads.push(parse_preload(spec));
                }
                "-i" => opts.interactive = true,
                "-v" => opts.banner = true,
                "-E" => opts.ignore_env = true,
                "-W" => opts.warnings = true,
                "-x" => {
                    opts.extended = Some(args[index + 1..].to_vec());
                    return Ok(opts);
                }
                "--" => {
                    opts.script_args = args[index + 1..].to_vec();
                    return Ok(opts);
                }
                "-" => {
                    opts.read_stdin = true;
                    opts.script_args = args[index + 1..].to_vec();
                    return Ok(opts);
                }
                other if other.starts_with('-') => {
                    return Err(ExitError::usage(format!("unrecognized option {other:?}")));
                }
                script => {
                    opts.script = Some(script.to_string());
                    opts.script_args = args[index + 1..].to_vec();
                    return Ok(opts);
                }
            }
        }
        Ok(opts)
    }
}

fn parse_preload(spec: &str) -> Preload {
    match spec.split_once('=') {
        Some((global, module)) => {
            Preload { global: Some(global.to_string()), module: module.to_string() }
        }
        None => Preload { global: None, module: spec.to_string() },
    }
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
