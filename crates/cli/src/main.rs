// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! comexe: host entry point.
//!
//! Normalises argv, initialises logging, then either branches to the
//! extended packaging CLI (`-x`) or creates the application container and
//! runs the embedded init chunk in the root instance.

mod args;
mod engine;
mod exit_error;
mod pack_cli;

use std::process::ExitCode;

use comexe_core::SearchChain;
use comexe_runtime::ApplicationBuilder;

use args::HostOptions;
use exit_error::ExitError;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("COMEXE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = std::env::args().collect();
    match run(&argv) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("comexe: {e}");
            ExitCode::from(e.code.clamp(1, u8::MAX as i32) as u8)
        }
    }
}

fn run(argv: &[String]) -> Result<(), ExitError> {
    let opts = HostOptions::parse(&argv[1..])?;

    if let Some(extended) = &opts.extended {
        return pack_cli::run(extended);
    }

    if opts.banner {
        println!("ComEXE {} -- scripted application container", env!("CARGO_PKG_VERSION"));
    }

    let wants_script = opts.script.is_some()
        || opts.read_stdin
        || opts.interactive
        || !opts.execute.is_empty()
        || !opts.preloads.is_empty();
    // `-v` alone is a complete invocation.
    if !wants_script && opts.banner {
        return Ok(());
    }
    let embedded = comexe_pack::selfpath::open_self().ok();
    if !wants_script && embedded.is_none() {
        return Err(ExitError::usage("nothing to run; this image carries no archive"));
    }

    for preload in &opts.preloads {
        tracing::debug!(module = %preload.module, global = ?preload.global, "preload requested");
    }

    let factory = engine::linked_factory()
        .ok_or_else(|| ExitError::usage("no script engine linked in this build"))?;

    let mut embedded =
        embedded.ok_or_else(|| ExitError::usage("this image carries no archive"))?;
    let init_chunk = embedded
        .read(comexe_runtime::Application::INIT_CHUNK_NAME)
        .map_err(|e| ExitError::usage(format!("embedded init chunk: {e}")))?;

    let chain = if opts.ignore_env {
        SearchChain::default()
    } else {
        SearchChain::from_env().map_err(|e| ExitError::usage(e.to_string()))?
    };

    // The script sees its own name and everything after it; host options
    // never reach the `arg` table.
    let mut script_argv = Vec::new();
    if let Some(script) = &opts.script {
        script_argv.push(script.clone());
    }
    script_argv.extend(opts.script_args.iter().cloned());

    let app = ApplicationBuilder::new(factory)
        .argv(script_argv)
        .search_chain(chain)
        .init_chunk(init_chunk)
        .warnings(opts.warnings)
        .build();

    app.run("main").map_err(ExitError::from)
}
