//! Integration tests for the record store and assembler working together.
//!
//! These walk the worked scenarios for a three-record ring and check the
//! store's properties over longer insert sequences.

use ringlog::error::{LookupError, RinglogError};
use ringlog::{Assembler, Record, RecordStore};

/// Feeds `chunks` through `assembler`, inserting every completed record and
/// collecting whatever the store evicts.
fn pump<const N: usize>(
    store: &mut RecordStore<N>,
    assembler: &mut Assembler,
    chunks: &[&[u8]],
) -> Vec<Record> {
    let mut evicted = Vec::new();
    for chunk in chunks {
        let mut completed = assembler.feed(chunk).unwrap();
        while let Some(record) = completed {
            evicted.extend(store.insert(record));
            completed = assembler.pop_record().unwrap();
        }
    }
    evicted
}

fn retained<const N: usize>(store: &RecordStore<N>) -> Vec<&[u8]> {
    store.iter().map(Record::as_bytes).collect()
}

#[test]
fn test_worked_scenarios() {
    let mut store = RecordStore::<3>::new();

    // Three records fill the ring.
    for text in ["aa", "bbb", "c"] {
        assert!(store.insert(Record::from(text)).is_none());
    }
    assert_eq!(store.total_size(), 6);
    let pos = store.find_by_logical_offset(3).unwrap();
    assert_eq!(pos.record().as_bytes(), b"bbb");
    assert_eq!(pos.offset(), 1);

    // A fourth evicts the oldest.
    let evicted = store.insert(Record::from("dddd")).unwrap();
    assert_eq!(evicted.as_bytes(), b"aa");
    assert_eq!(retained(&store), [&b"bbb"[..], b"c", b"dddd"]);
    assert_eq!(store.total_size(), 8);

    // Ordinals count from the new oldest record.
    assert_eq!(store.find_by_ordinal(0, 0).unwrap(), 0);
    let last = store.find_by_ordinal(2, 3).unwrap();
    let pos = store.find_by_logical_offset(usize::try_from(last).unwrap()).unwrap();
    assert_eq!((pos.record().as_bytes(), pos.offset()), (&b"dddd"[..], 3));

    assert!(matches!(
        store.find_by_ordinal(3, 0),
        Err(RinglogError::Lookup(LookupError::RecordOutOfRange { index: 3, retained: 3 }))
    ));

    assert!(store.find_by_logical_offset(1000).is_none());
}

#[test]
fn test_assembler_feeds_store() {
    let mut store = RecordStore::<3>::new();
    let mut assembler = Assembler::default();

    let evicted = pump(&mut store, &mut assembler, &[b"hel", b"lo\nworld"]);
    assert!(evicted.is_empty());
    assert_eq!(retained(&store), [&b"hello\n"[..]]);
    assert_eq!(assembler.partial(), Some(&b"world"[..]));

    // The carried-over "world" is finished first, then three more records.
    let evicted = pump(&mut store, &mut assembler, &[b"\none\ntwo\nthree\n"]);
    assert_eq!(evicted, [Record::from("hello\n"), Record::from("world\n")]);
    assert_eq!(retained(&store), [&b"one\n"[..], b"two\n", b"three\n"]);
    assert!(!assembler.has_partial());
}

#[test]
fn test_records_survive_arbitrary_chunking() {
    let input = b"alpha\nbeta\ngamma\ndelta\nepsilon\n";

    for chunk_size in 1..=input.len() {
        let mut store = RecordStore::<8>::new();
        let mut assembler = Assembler::default();
        let chunks: Vec<&[u8]> = input.chunks(chunk_size).collect();

        let evicted = pump(&mut store, &mut assembler, &chunks);
        assert!(evicted.is_empty(), "chunk size {chunk_size}");
        assert_eq!(store.len(), 5, "chunk size {chunk_size}");
        assert_eq!(store.total_size(), input.len() as u64);

        let joined: Vec<u8> = store.iter().flat_map(|r| r.iter().copied()).collect();
        assert_eq!(joined, input);
    }
}

#[test]
fn test_streaming_read_reconstructs_contents() {
    let mut store = RecordStore::<4>::new();
    for i in 0..9 {
        let _ = store.insert(Record::from(format!("record-{i}\n").as_str()));
    }

    // Read the way a sequential reader does: one record remainder at a time.
    let mut offset = 0;
    let mut streamed = Vec::new();
    while let Some(pos) = store.find_by_logical_offset(offset) {
        let chunk = &pos.remaining()[..pos.remaining().len().min(5)];
        streamed.extend_from_slice(chunk);
        offset += chunk.len();
    }

    assert_eq!(streamed, b"record-5\nrecord-6\nrecord-7\nrecord-8\n");
    assert_eq!(offset as u64, store.total_size());
}

#[test]
fn test_eviction_order_and_ownership() {
    let mut store = RecordStore::<3>::new();
    let mut evicted = Vec::new();

    for i in 0u8..10 {
        let was_full = store.is_full();
        let expected = store.get(0).cloned();
        let out = store.insert(Record::new(vec![i; usize::from(i) + 1]));

        assert_eq!(out.is_some(), was_full);
        if was_full {
            assert_eq!(out, expected);
        }
        evicted.extend(out);
        assert!(store.len() <= 3);
    }

    let first_bytes: Vec<u8> = evicted.iter().map(|r| r[0]).collect();
    assert_eq!(first_bytes, [0, 1, 2, 3, 4, 5, 6]);
    assert_eq!(store.get(0).unwrap()[0], 7);
}

#[test]
fn test_ordinal_and_logical_offsets_agree() {
    let mut store = RecordStore::<5>::new();
    for text in ["q", "rr", "sss", "tttt", "uuuuu", "vvvvvv", "w"] {
        let _ = store.insert(Record::from(text));
    }

    let mut expected_offset = 0u64;
    for (i, record) in store.iter().enumerate() {
        for o in 0..record.len() {
            let index = u32::try_from(i).unwrap();
            let offset = u32::try_from(o).unwrap();
            let logical = store.find_by_ordinal(index, offset).unwrap();
            assert_eq!(logical, expected_offset + o as u64);

            let pos = store.find_by_logical_offset(usize::try_from(logical).unwrap()).unwrap();
            assert_eq!(pos.record(), record);
            assert_eq!(pos.offset(), o);
        }
        expected_offset += record.len() as u64;
    }
    assert_eq!(expected_offset, store.total_size());
}

#[test]
fn test_teardown_then_reuse() {
    let mut store = RecordStore::<2>::new();
    let mut assembler = Assembler::default();
    pump(&mut store, &mut assembler, &[b"a\nb\nc\npartial"]);

    let released: Vec<Record> = store.drain().collect();
    assert_eq!(released, [Record::from("b\n"), Record::from("c\n")]);
    assert_eq!(assembler.reset(), Some(b"partial".to_vec()));
    assert_eq!(store.teardown(), 0);

    store.init();
    pump(&mut store, &mut assembler, &[b"fresh\n"]);
    assert_eq!(retained(&store), [&b"fresh\n"[..]]);
}
