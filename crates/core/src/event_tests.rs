// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event frame tests: codec round-trips, ordering, mailbox swap behavior.

use super::*;
use proptest::prelude::*;

fn all_variants() -> Vec<EventArg> {
    vec![
        EventArg::Nil,
        EventArg::Boolean(true),
        EventArg::Boolean(false),
        EventArg::Integer(-42),
        EventArg::Integer(i64::MAX),
        EventArg::Double(1.5),
        EventArg::Str(b"hello".to_vec()),
        EventArg::Str(vec![0xFF, 0x00, 0x7F]),
        EventArg::Opaque(0xDEAD_BEEF),
    ]
}

#[test]
fn frame_roundtrip_all_variants() {
    let args = all_variants();
    let mut buf = EventBuffer::new();
    buf.push_frame(&args);

    let decoded: Vec<_> = buf.iter().collect::<Result<_, _>>().unwrap();
    assert_eq!(decoded, vec![args]);
}

#[test]
fn empty_frame_roundtrips() {
    let mut buf = EventBuffer::new();
    buf.push_frame(&[]);
    let decoded: Vec<_> = buf.iter().collect::<Result<_, _>>().unwrap();
    assert_eq!(decoded, vec![vec![]]);
}

#[test]
fn frames_decode_in_push_order() {
    let mut buf = EventBuffer::new();
    for i in 0..10 {
        buf.push_frame(&[EventArg::Integer(i)]);
    }
    let seen: Vec<i64> = buf
        .iter()
        .map(|frame| match frame.unwrap()[0] {
            EventArg::Integer(i) => i,
            ref other => panic!("unexpected arg {other:?}"),
        })
        .collect();
    assert_eq!(seen, (0..10).collect::<Vec<_>>());
}

#[test]
fn reset_keeps_buffer_reusable() {
    let mut buf = EventBuffer::new();
    buf.push_frame(&[EventArg::Nil]);
    buf.reset();
    assert!(buf.is_empty());
    buf.push_frame(&[EventArg::Boolean(true)]);
    assert_eq!(buf.frame_count(), 1);
}

#[test]
fn truncated_frame_is_a_decode_error() {
    // Hand-build a frame cut off mid-string.
    let mut buf = EventBuffer::new();
    buf.push_frame(&[EventArg::Str(b"abcdef".to_vec())]);
    let (off, len) = buf.frames[0];
    let cut = &buf.bytes[off..off + len - 4];
    assert!(matches!(super::decode_frame(cut), Err(FrameError::Truncated(_))));
}

#[test]
fn bad_tag_is_a_decode_error() {
    let raw = [super::TAG_START, 1, 0, 0, 0, 0x77];
    assert_eq!(super::decode_frame(&raw), Err(FrameError::BadTag(0x77)));
}

#[test]
fn count_mismatch_is_a_decode_error() {
    // Declares two args but carries one.
    let mut raw = vec![super::TAG_START, 2, 0, 0, 0];
    raw.push(super::TAG_NIL);
    raw.push(super::TAG_END);
    assert_eq!(
        super::decode_frame(&raw),
        Err(FrameError::CountMismatch { declared: 2, found: 1 })
    );
}

#[test]
fn mailbox_swap_drains_and_leaves_inbox_empty() {
    let mailbox = Mailbox::new();
    mailbox.push(&[EventArg::str("first")]);
    mailbox.push(&[EventArg::str("second")]);
    assert_eq!(mailbox.pending_frames(), 2);

    let drained = mailbox.swap();
    assert_eq!(drained.frame_count(), 2);
    assert_eq!(mailbox.pending_frames(), 0);

    // New pushes land in the fresh buffer while the drain walks the old one.
    mailbox.push(&[EventArg::str("third")]);
    assert_eq!(mailbox.pending_frames(), 1);
    mailbox.recycle(drained);
}

#[test]
fn mailbox_recycle_reuses_the_spare() {
    let mailbox = Mailbox::new();
    mailbox.push(&[EventArg::Nil]);
    let drained = mailbox.swap();
    mailbox.recycle(drained);

    mailbox.push(&[EventArg::Nil]);
    let again = mailbox.swap();
    assert_eq!(again.frame_count(), 1);
    mailbox.recycle(again);
}

proptest! {
    #[test]
    fn arbitrary_frames_roundtrip(
        ints in proptest::collection::vec(any::<i64>(), 0..8),
        strs in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 0..4),
    ) {
        let mut args: Vec<EventArg> = ints.into_iter().map(EventArg::Integer).collect();
        args.extend(strs.into_iter().map(EventArg::Str));

        let mut buf = EventBuffer::new();
        buf.push_frame(&args);
        let decoded: Vec<_> = buf.iter().collect::<Result<_, _>>().unwrap();
        prop_assert_eq!(decoded, vec![args]);
    }
}
