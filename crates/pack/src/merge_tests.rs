// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Merger tests: rule binding, duplicate policy, root stripping.

use super::*;
use crate::read::ZipReader;
use crate::write::ZipWriter;

fn read_all(path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut reader = ZipReader::open(path).unwrap();
    (0..reader.len())
        .map(|i| {
            let name = reader.entries()[i].name.clone();
            let data = reader.read_index(i).unwrap();
            (name, data)
        })
        .collect()
}

#[test]
fn inline_entries_are_written_first() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.zip");

    let spec = MergeSpec::new().inline("comexe/init.lua", "return 0").inline("b", "bee");
    let report = merge(&spec, &out, 6).unwrap();
    assert_eq!(report.written, 2);
    assert!(report.duplicates.is_empty());

    let entries = read_all(&out);
    assert_eq!(entries[0].0, "comexe/init.lua");
    assert_eq!(entries[1].1, b"bee");
}

#[test]
fn duplicate_keeps_first_write_and_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("x"), b"from-directory").unwrap();

    let out = dir.path().join("out.zip");
    let spec = MergeSpec::new()
        .inline("x", "from-inline")
        .source(SourceKind::Directory, &src)
        .rule(".*", RuleAction::Copy);

    let report = merge(&spec, &out, 0).unwrap();
    assert_eq!(report.duplicates, vec!["x".to_string()]);

    let entries = read_all(&out);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0], ("x".to_string(), b"from-inline".to_vec()));
}

#[test]
fn directory_source_strips_the_root_component() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("DIR-1");
    std::fs::create_dir_all(root.join("DIR-2")).unwrap();
    std::fs::write(root.join("DIR-2/file.txt"), b"deep").unwrap();
    std::fs::write(root.join("top.txt"), b"top").unwrap();

    let out = dir.path().join("out.zip");
    let spec =
        MergeSpec::new().source(SourceKind::Directory, &root).rule(".*", RuleAction::Copy);
    merge(&spec, &out, 0).unwrap();

    let names: Vec<String> = read_all(&out).into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["DIR-2/file.txt".to_string(), "top.txt".to_string()]);
}

#[test]
fn first_matching_rule_wins() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("keep.lua"), b"k").unwrap();
    std::fs::write(src.join("drop.tmp"), b"d").unwrap();

    let out = dir.path().join("out.zip");
    let spec = MergeSpec::new()
        .source(SourceKind::Directory, &src)
        .rule(r"\.tmp$", RuleAction::Skip)
        .rule(".*", RuleAction::Copy);

    let report = merge(&spec, &out, 0).unwrap();
    assert_eq!(report.written, 1);
    assert_eq!(report.skipped, 1);

    let names: Vec<String> = read_all(&out).into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["keep.lua".to_string()]);
}

#[test]
fn entry_without_a_matching_rule_raises() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("orphan.bin"), b"?").unwrap();

    let out = dir.path().join("out.zip");
    let spec = MergeSpec::new()
        .source(SourceKind::Directory, &src)
        .rule(r"\.lua$", RuleAction::Copy);

    match merge(&spec, &out, 0) {
        Err(MergeError::NoRule { source_index: 0, entry }) => assert_eq!(entry, "orphan.bin"),
        other => panic!("expected NoRule, got {other:?}"),
    }
}

#[test]
fn zip_source_entries_are_copied() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.zip");
    let mut writer = ZipWriter::create(&input, 6).unwrap();
    writer.add("lib/a.lua", b"A").unwrap();
    writer.add("lib/b.lua", b"B").unwrap();
    writer.finish().unwrap();

    let out = dir.path().join("out.zip");
    let spec = MergeSpec::new().source(SourceKind::Zip, &input).rule(".*", RuleAction::Copy);
    let report = merge(&spec, &out, 6).unwrap();
    assert_eq!(report.written, 2);

    // Single-source merge is identity on (name, bytes) sets.
    assert_eq!(read_all(&out), read_all(&input));
}

#[test]
fn rules_are_scoped_to_their_source() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    std::fs::create_dir_all(&a).unwrap();
    std::fs::create_dir_all(&b).unwrap();
    std::fs::write(a.join("same.txt"), b"from-a").unwrap();
    std::fs::write(b.join("other.txt"), b"from-b").unwrap();

    let out = dir.path().join("out.zip");
    let spec = MergeSpec::new()
        .source(SourceKind::Directory, &a)
        .rule(".*", RuleAction::Skip)
        .source(SourceKind::Directory, &b)
        .rule(".*", RuleAction::Copy);

    let report = merge(&spec, &out, 0).unwrap();
    assert_eq!(report.written, 1);
    let names: Vec<String> = read_all(&out).into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["other.txt".to_string()]);
}

#[test]
fn bad_pattern_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.zip");
    let spec = MergeSpec {
        inline: vec![],
        sources: vec![],
        rules: vec![Rule { source: 0, pattern: "(".into(), action: RuleAction::Copy }],
    };
    assert!(matches!(merge(&spec, &out, 0), Err(MergeError::BadPattern { .. })));
}

#[test]
fn spec_roundtrips_through_json() {
    let spec = MergeSpec::new()
        .inline("init", "x")
        .source(SourceKind::Zip, "/tmp/in.zip")
        .rule(".*", RuleAction::Copy);
    let json = serde_json::to_string(&spec).unwrap();
    let back: MergeSpec = serde_json::from_str(&json).unwrap();
    assert_eq!(back.sources.len(), 1);
    assert_eq!(back.rules[0].source, 0);
    assert_eq!(back.inline[0].0, "init");
}
