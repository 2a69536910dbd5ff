// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Packager scenarios: duplicate policy and the executable-is-an-archive
//! round trip.

use std::io::Write;
use std::ops::ControlFlow;

use comexe_pack::{merge, MergeSpec, RuleAction, SourceKind, ZipReader, ZipWriter};

/// Inline entry `x` plus a directory source also providing `x` under a
/// COPY rule: one duplicate reported, output carries the inline bytes.
#[test]
fn merge_duplicate_first_write_wins() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("input");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("x"), b"2").unwrap();

    let out = dir.path().join("out.zip");
    let spec = MergeSpec::new()
        .inline("x", "1")
        .source(SourceKind::Directory, &src)
        .rule("x", RuleAction::Copy);

    let report = merge(&spec, &out, 6).unwrap();
    assert_eq!(report.duplicates, vec!["x".to_string()]);

    let mut reader = ZipReader::open(&out).unwrap();
    assert_eq!(reader.len(), 1);
    assert_eq!(reader.read("x").unwrap(), b"1");
}

/// Build an image (native prefix + archive), then have "the running
/// image" extract a known entry from itself.
#[test]
fn image_extracts_known_entry_from_itself() {
    let dir = tempfile::tempdir().unwrap();

    let archive = dir.path().join("payload.zip");
    let mut writer = ZipWriter::create(&archive, 6).unwrap();
    writer.add("comexe/init.lua", b"return require('app')").unwrap();
    writer.add("app.lua", b"-- the application").unwrap();
    writer.finish().unwrap();

    let image = dir.path().join("app-image");
    let mut out = std::fs::File::create(&image).unwrap();
    out.write_all(b"#!/fake/native/loader\n\x00\x01\x02 image bytes \x03").unwrap();
    out.write_all(&std::fs::read(&archive).unwrap()).unwrap();
    drop(out);

    let mut reader = ZipReader::open(&image).unwrap();
    assert_eq!(reader.read("comexe/init.lua").unwrap(), b"return require('app')");

    // Iteration sees every entry and can stop early.
    let mut names = Vec::new();
    reader
        .for_each(|name, _| {
            names.push(name.to_string());
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(names, vec!["comexe/init.lua".to_string(), "app.lua".to_string()]);
}

/// Single-source merge is identity on the (name, bytes) set.
#[test]
fn single_source_merge_is_identity() {
    let dir = tempfile::tempdir().unwrap();

    let input = dir.path().join("in.zip");
    let mut writer = ZipWriter::create(&input, 6).unwrap();
    for (name, data) in [("a", &b"alpha"[..]), ("b/c", b"nested"), ("d", b"")] {
        writer.add(name, data).unwrap();
    }
    writer.finish().unwrap();

    let out = dir.path().join("out.zip");
    let spec = MergeSpec::new().source(SourceKind::Zip, &input).rule(".*", RuleAction::Copy);
    merge(&spec, &out, 6).unwrap();

    let read_all = |path: &std::path::Path| {
        let mut reader = ZipReader::open(path).unwrap();
        (0..reader.len())
            .map(|i| (reader.entries()[i].name.clone(), reader.read_index(i).unwrap()))
            .collect::<Vec<_>>()
    };
    assert_eq!(read_all(&out), read_all(&input));
}
