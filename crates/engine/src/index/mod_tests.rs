use super::*;
use crate::postings::PostingCursor;
use crate::test_support::{FixtureConfig, build_fixture, toy_documents, toy_fixture};

#[test]
fn stream_round_trips_through_a_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("index.docs");

    let lists: Vec<Vec<u8>> = vec![vec![1, 2, 3], vec![], vec![9, 9, 9, 9]];
    write_stream_atomic(&path, "simdbp", 0, 77, &lists).unwrap();

    let stream = PostingStream::open(&path).unwrap();
    assert_eq!(stream.list_count(), 3);
    assert_eq!(stream.document_bound(), 77);
    assert_eq!(stream.codec_name(), "simdbp");
    assert!(!stream.is_quantized());

    assert_eq!(stream.list(0).unwrap(), &[1, 2, 3]);
    assert_eq!(stream.list(1).unwrap(), &[] as &[u8]);
    assert_eq!(stream.list(2).unwrap(), &[9, 9, 9, 9]);
    assert!(stream.list(3).is_err());
}

#[test]
fn corrupt_magic_is_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("index.docs");
    write_stream_atomic(&path, "varint", 0, 1, &[vec![0]]).unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    bytes[0] ^= 0xFF;
    std::fs::write(&path, bytes).unwrap();

    let err = PostingStream::open(&path).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
}

#[test]
fn corrupt_header_fails_the_checksum() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("index.docs");
    write_stream_atomic(&path, "varint", 0, 1, &[vec![0]]).unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    // Flip a bit inside the document_bound field.
    bytes[24] ^= 0x01;
    std::fs::write(&path, bytes).unwrap();

    assert!(PostingStream::open(&path).is_err());
}

#[test]
fn truncated_file_is_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("index.docs");
    write_stream_atomic(&path, "varint", 0, 9, &[vec![5; 100]]).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 20]).unwrap();

    assert!(PostingStream::open(&path).is_err());
}

#[test]
fn unknown_encoding_fails_at_open() {
    let dir = tempfile::TempDir::new().unwrap();
    let basename = dir.path().join("cmp");
    write_stream_atomic(&basename.with_extension("docs"), "zeta9", 0, 0, &[]).unwrap();
    write_stream_atomic(&basename.with_extension("freqs"), "zeta9", 0, 0, &[]).unwrap();
    std::fs::write(basename.with_extension("sizes"), 0u32.to_le_bytes()).unwrap();

    let err = Index::open(&basename).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}

#[test]
fn open_toy_index_and_walk_a_list() {
    let fixture = toy_fixture("simdbp");
    let index = &fixture.index;

    assert_eq!(index.num_docs(), 10);
    assert_eq!(index.num_terms(), 7);
    assert!(!index.is_quantized());
    assert_eq!(index.doc_lens().as_ref(), &[6, 1, 2, 0, 3, 1, 1, 0, 1, 0]);
    assert!((index.avg_doc_len() - 1.5).abs() < 1e-6);

    // Term 1 appears in documents 0, 1, 2 and 4, once each.
    let mut cursor = index.cursor(1).unwrap();
    let mut postings = Vec::new();
    while cursor.docid() < index.num_docs() {
        postings.push((cursor.docid(), cursor.freq()));
        cursor.next();
    }
    assert_eq!(postings, vec![(0, 1), (1, 1), (2, 1), (4, 1)]);

    assert!(index.cursor(7).is_err());
}

#[test]
fn every_encoding_yields_identical_postings() {
    let documents = toy_documents();
    let reference = toy_fixture("varint");

    for encoding in crate::codec::ENCODING_NAMES {
        let fixture = build_fixture(
            &documents,
            &FixtureConfig {
                encoding,
                ..FixtureConfig::default()
            },
        );
        for term in 0..reference.index.num_terms() {
            let mut expected = reference.index.cursor(term).unwrap();
            let mut got = fixture.index.cursor(term).unwrap();
            loop {
                assert_eq!(got.docid(), expected.docid(), "{encoding} term {term}");
                if expected.docid() == reference.index.num_docs() {
                    break;
                }
                assert_eq!(got.freq(), expected.freq(), "{encoding} term {term}");
                expected.next();
                got.next();
            }
        }
    }
}

#[test]
fn quantized_fixture_sets_the_flag() {
    let fixture = build_fixture(
        &toy_documents(),
        &FixtureConfig {
            quantize_bits: Some(8),
            ..FixtureConfig::default()
        },
    );
    assert!(fixture.index.is_quantized());
    assert!(fixture.wand.is_quantized());

    // Quantized "frequencies" are linear scores in 1..=255.
    let mut cursor = fixture.index.cursor(1).unwrap();
    while cursor.docid() < fixture.index.num_docs() {
        let value = cursor.freq();
        assert!((1..=255).contains(&value));
        cursor.next();
    }
}
