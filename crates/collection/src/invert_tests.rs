use super::*;
use crate::binary_collection::{BinaryCollection, BinaryCollectionWriter};

/// The ten-document collection used across the workspace tests.
///
/// d0=[0,1,2,3,4,5] d1=[1] d2=[1,2] d3=[] d4=[1,5,6]
/// d5=[5] d6=[6] d7=[] d8=[6] d9=[]
pub const TOY_DOCUMENTS: &[&[u32]] = &[
    &[0, 1, 2, 3, 4, 5],
    &[1],
    &[1, 2],
    &[],
    &[1, 5, 6],
    &[5],
    &[6],
    &[],
    &[6],
    &[],
];

fn write_forward(path: &std::path::Path, documents: &[&[u32]]) {
    let mut writer = BinaryCollectionWriter::create(path).unwrap();
    writer.write_singleton(documents.len() as u32).unwrap();
    for doc in documents {
        writer.write_record(doc).unwrap();
    }
    writer.finish().unwrap();
}

fn read_lists(path: &std::path::Path) -> Vec<Vec<u32>> {
    BinaryCollection::open(path)
        .unwrap()
        .iter()
        .map(|r| r.unwrap().to_vec())
        .collect()
}

#[test]
fn inverts_the_toy_collection() {
    let dir = tempfile::TempDir::new().unwrap();
    let fwd = dir.path().join("fwd.bin");
    let out = dir.path().join("inv");
    write_forward(&fwd, TOY_DOCUMENTS);

    let stats = invert_forward_index(&fwd, &out, &InvertConfig::default()).unwrap();
    assert_eq!(stats.num_docs, 10);
    assert_eq!(stats.num_terms, 7);
    assert_eq!(stats.num_postings, 15);

    let docs = read_lists(&dir.path().join("inv.docs"));
    assert_eq!(docs[0], vec![10]);
    assert_eq!(docs[1], vec![0]); // term 0
    assert_eq!(docs[2], vec![0, 1, 2, 4]); // term 1
    assert_eq!(docs[3], vec![0, 2]); // term 2
    assert_eq!(docs[4], vec![0]); // term 3
    assert_eq!(docs[5], vec![0]); // term 4
    assert_eq!(docs[6], vec![0, 4, 5]); // term 5
    assert_eq!(docs[7], vec![4, 6, 8]); // term 6

    let freqs = read_lists(&dir.path().join("inv.freqs"));
    assert_eq!(freqs.len(), 7);
    assert!(freqs.iter().zip(&docs[1..]).all(|(f, d)| f.len() == d.len()));
    assert!(freqs.iter().flatten().all(|&f| f == 1));

    let sizes = read_lists(&dir.path().join("inv.sizes"));
    assert_eq!(sizes, vec![vec![6, 1, 2, 0, 3, 1, 1, 0, 1, 0]]);
}

#[test]
fn repeated_terms_become_frequencies() {
    let dir = tempfile::TempDir::new().unwrap();
    let fwd = dir.path().join("fwd.bin");
    let out = dir.path().join("inv");
    write_forward(&fwd, &[&[0, 0, 0, 1], &[1, 1]]);

    let stats = invert_forward_index(&fwd, &out, &InvertConfig::default()).unwrap();
    assert_eq!(stats.num_docs, 2);
    assert_eq!(stats.num_terms, 2);

    let docs = read_lists(&dir.path().join("inv.docs"));
    let freqs = read_lists(&dir.path().join("inv.freqs"));
    assert_eq!(docs[1], vec![0]);
    assert_eq!(freqs[0], vec![3]);
    assert_eq!(docs[2], vec![0, 1]);
    assert_eq!(freqs[1], vec![1, 2]);

    let sizes = read_lists(&dir.path().join("inv.sizes"));
    assert_eq!(sizes, vec![vec![4, 2]]);
}

#[test]
fn small_batches_merge_in_document_order() {
    let dir = tempfile::TempDir::new().unwrap();
    let fwd = dir.path().join("fwd.bin");
    let out = dir.path().join("inv");

    // 100 documents, every document contains term 0, even ones term 2.
    let records: Vec<Vec<u32>> = (0..100u32)
        .map(|d| if d % 2 == 0 { vec![0, 2] } else { vec![0] })
        .collect();
    let refs: Vec<&[u32]> = records.iter().map(|r| r.as_slice()).collect();
    write_forward(&fwd, &refs);

    let config = InvertConfig {
        threads: 4,
        batch_size: 7,
    };
    let stats = invert_forward_index(&fwd, &out, &config).unwrap();
    assert_eq!(stats.num_docs, 100);
    assert_eq!(stats.num_terms, 3);

    let docs = read_lists(&dir.path().join("inv.docs"));
    assert_eq!(docs[1], (0..100).collect::<Vec<u32>>());
    assert_eq!(docs[2], Vec::<u32>::new()); // term 1 unused
    assert_eq!(docs[3], (0..100).step_by(2).collect::<Vec<u32>>());
}

#[test]
fn wrong_document_count_is_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let fwd = dir.path().join("fwd.bin");
    write_forward(&fwd, &[&[0], &[1]]);

    // Corrupt the header singleton to claim 5 documents.
    let mut bytes = std::fs::read(&fwd).unwrap();
    bytes[4..8].copy_from_slice(&5u32.to_le_bytes());
    std::fs::write(&fwd, bytes).unwrap();

    let out = dir.path().join("inv");
    assert!(invert_forward_index(&fwd, &out, &InvertConfig::default()).is_err());
}
