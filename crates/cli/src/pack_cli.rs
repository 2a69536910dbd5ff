// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extended packaging CLI (`comexe -x …`).
//!
//! Everything here works on archives: listing and composing ZIPs,
//! building new self-contained executables from a target template plus a
//! generated init chunk, and small fetch/find helpers for app authors.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use comexe_pack::{merge, MergeSpec, RuleAction, SourceKind, ZipReader};

use crate::exit_error::ExitError;

/// Archive path prefix holding the bundled target templates.
const TARGETS_PREFIX: &str = "comexe/targets/";

#[derive(Debug, Parser)]
#[command(name = "comexe -x", about = "ComEXE packaging tools", disable_version_flag = true)]
pub struct PackCli {
    /// List the target templates bundled in this image
    #[arg(long)]
    list_targets: bool,

    /// Build a self-contained executable from a source file
    #[arg(short = 'm', long, value_name = "source")]
    make: Option<PathBuf>,

    /// Verbose make output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Skip the bundled runtime subtree
    #[arg(long)]
    nostdlib: bool,

    /// Target template name, or "all"
    #[arg(short = 't', long, value_name = "target")]
    target: Option<String>,

    /// Output path
    #[arg(short = 'o', long, value_name = "out")]
    output: Option<PathBuf>,

    /// List the entries of an archive
    #[arg(long = "zip-l", value_name = "file.zip")]
    zip_list: Option<PathBuf>,

    /// Compose an archive from files and directories
    #[arg(long = "zip-c", num_args = 2.., value_name = "out.zip input...")]
    zip_create: Vec<PathBuf>,

    /// List script sources under a directory
    #[arg(long, value_name = "dir")]
    find: Option<PathBuf>,

    /// Compile a script source to a loadable chunk
    #[arg(short = 'c', long, value_name = "file")]
    compile: Option<PathBuf>,

    /// Fetch a URL to the current directory
    #[arg(long, value_name = "url")]
    wget: Option<String>,
}

pub fn run(args: &[String]) -> Result<(), ExitError> {
    let mut argv = vec!["comexe -x".to_string()];
    argv.extend_from_slice(args);
    let cli = PackCli::try_parse_from(&argv).map_err(|e| ExitError::usage(e.to_string()))?;

    if cli.list_targets {
        return cmd_list_targets();
    }
    if let Some(source) = &cli.make {
        return cmd_make(source, &cli);
    }
    if let Some(archive) = &cli.zip_list {
        return cmd_zip_list(archive);
    }
    if !cli.zip_create.is_empty() {
        return cmd_zip_create(&cli.zip_create);
    }
    if let Some(dir) = &cli.find {
        return cmd_find(dir);
    }
    if cli.compile.is_some() {
        return Err(ExitError::usage("no compiler in this build"));
    }
    if let Some(url) = &cli.wget {
        return cmd_wget(url);
    }
    Err(ExitError::usage("no packaging command given; try --help"))
}

/// Target template names found in the running image.
fn bundled_targets() -> Result<Vec<String>, ExitError> {
    let reader = open_self()?;
    Ok(reader
        .entries()
        .iter()
        .filter_map(|e| e.name.strip_prefix(TARGETS_PREFIX))
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect())
}

fn open_self() -> Result<ZipReader, ExitError> {
    comexe_pack::selfpath::open_self()
        .map_err(|e| ExitError::usage(format!("this image carries no archive: {e}")))
}

fn cmd_list_targets() -> Result<(), ExitError> {
    let targets = bundled_targets()?;
    if targets.is_empty() {
        println!("no bundled targets");
        return Ok(());
    }
    for target in targets {
        println!("{target}");
    }
    Ok(())
}

/// Host platform's default target name. Windows templates carry an `.exe`
/// suffix in their archive path.
fn host_target() -> String {
    if cfg!(windows) {
        format!("windows-{}.exe", std::env::consts::ARCH)
    } else {
        format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
    }
}

fn cmd_make(source: &Path, cli: &PackCli) -> Result<(), ExitError> {
    let targets = match cli.target.as_deref() {
        Some("all") => {
            let all = bundled_targets()?;
            if all.is_empty() {
                return Err(ExitError::usage("no bundled targets to build for"));
            }
            all
        }
        Some(name) => vec![name.to_string()],
        None => vec![host_target()],
    };

    for target in targets {
        make_one(source, &target, cli)?;
    }
    Ok(())
}

fn make_one(source: &Path, target: &str, cli: &PackCli) -> Result<(), ExitError> {
    let mut image = open_self()?;

    let available: Vec<String> = image
        .entries()
        .iter()
        .filter_map(|e| e.name.strip_prefix(TARGETS_PREFIX))
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();
    if !available.iter().any(|t| t == target) {
        return Err(ExitError::usage(format!(
            "unknown target {target:?}; available: {}",
            if available.is_empty() { "none".to_string() } else { available.join(", ") }
        )));
    }
    let template = image
        .read(&format!("{TARGETS_PREFIX}{target}"))
        .map_err(|e| ExitError::usage(format!("cannot read target template: {e}")))?;

    let entry_name = source
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ExitError::usage("source has no usable file name"))?
        .to_string();
    let source_bytes = std::fs::read(source)
        .map_err(|e| ExitError::usage(format!("cannot read {}: {e}", source.display())))?;

    let output = match &cli.output {
        Some(path) => path.clone(),
        None if target.ends_with(".exe") => PathBuf::from(format!("{entry_name}.exe")),
        None => PathBuf::from(&entry_name),
    };

    // The generated init chunk names the application entry point on its
    // first line, then hands control to the bundled loader.
    let init = format!(
        "local INIT_AppEntryPoint = \"{entry_name}\"\n\
         return require(INIT_AppEntryPoint)\n"
    );

    let mut spec = MergeSpec::new()
        .inline("comexe/init.lua", init)
        .inline(format!("{entry_name}.lua"), source_bytes);
    if !cli.nostdlib {
        let self_path = comexe_pack::selfpath::current_exe()
            .map_err(|e| ExitError::usage(e.to_string()))?;
        spec = spec
            .source(SourceKind::Zip, self_path)
            // Templates and the old init never travel into the new image.
            .rule(r"^comexe/targets/", RuleAction::Skip)
            .rule(r"^comexe/init\.lua$", RuleAction::Skip);
        // Platform-irrelevant runtime branches stay behind.
        if !target.ends_with(".exe") {
            spec = spec.rule(r"/win32/", RuleAction::Skip);
        }
        spec = spec.rule(r"^comexe/", RuleAction::Copy).rule(r".*", RuleAction::Skip);
    }

    let archive_tmp = output.with_extension("comexe-part");
    let report = merge(&spec, &archive_tmp, 6).map_err(|e| ExitError::usage(e.to_string()))?;

    let archive = std::fs::read(&archive_tmp).map_err(|e| ExitError::usage(e.to_string()))?;
    let _ = std::fs::remove_file(&archive_tmp);

    let mut out = std::fs::File::create(&output)
        .map_err(|e| ExitError::usage(format!("cannot create {}: {e}", output.display())))?;
    out.write_all(&template).map_err(|e| ExitError::usage(e.to_string()))?;
    out.write_all(&archive).map_err(|e| ExitError::usage(e.to_string()))?;

    if cli.verbose {
        println!(
            "built {} for {target}: {} entries, {} duplicates",
            output.display(),
            report.written,
            report.duplicates.len()
        );
    } else {
        println!("built {}", output.display());
    }
    Ok(())
}

fn cmd_zip_list(archive: &Path) -> Result<(), ExitError> {
    let reader = ZipReader::open(archive).map_err(|e| ExitError::usage(e.to_string()))?;
    for entry in reader.entries() {
        println!("{:>10}  {}", entry.size, entry.name);
    }
    Ok(())
}

fn cmd_zip_create(paths: &[PathBuf]) -> Result<(), ExitError> {
    let (output, inputs) = match paths.split_first() {
        Some((out, rest)) if !rest.is_empty() => (out, rest),
        _ => return Err(ExitError::usage("--zip-c needs an output and at least one input")),
    };

    let mut spec = MergeSpec::new();
    for input in inputs {
        if input.is_dir() {
            spec = spec.source(SourceKind::Directory, input).rule(".*", RuleAction::Copy);
        } else {
            let name = input
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| ExitError::usage(format!("unusable input {}", input.display())))?;
            let data = std::fs::read(input)
                .map_err(|e| ExitError::usage(format!("cannot read {}: {e}", input.display())))?;
            spec = spec.inline(name, data);
        }
    }

    let report = merge(&spec, output, 6).map_err(|e| ExitError::usage(e.to_string()))?;
    println!("wrote {} entries to {}", report.written, output.display());
    Ok(())
}

fn cmd_find(dir: &Path) -> Result<(), ExitError> {
    let mut found = Vec::new();
    collect_scripts(dir, &mut found).map_err(|e| ExitError::usage(e.to_string()))?;
    found.sort();
    for path in found {
        println!("{}", path.display());
    }
    Ok(())
}

fn collect_scripts(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_scripts(&path, out)?;
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("lua") | Some("fnl")
        ) {
            out.push(path);
        }
    }
    Ok(())
}

fn cmd_wget(url: &str) -> Result<(), ExitError> {
    let response = reqwest::blocking::get(url)
        .map_err(|e| ExitError::usage(format!("fetch failed: {e}")))?;
    if !response.status().is_success() {
        return Err(ExitError::usage(format!("fetch failed: HTTP {}", response.status())));
    }
    let name = url.rsplit('/').next().filter(|n| !n.is_empty()).unwrap_or("download");
    let bytes = response.bytes().map_err(|e| ExitError::usage(e.to_string()))?;
    std::fs::write(name, &bytes).map_err(|e| ExitError::usage(e.to_string()))?;
    println!("saved {name} ({} bytes)", bytes.len());
    Ok(())
}
