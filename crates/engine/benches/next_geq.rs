use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use sift_engine::{Encoding, ListCursor, PostingCursor, write_docs_list, write_freqs_list};

/// A synthetic list with geometric-ish gaps, long enough to span many blocks.
fn synthetic_postings(n: u32) -> (Vec<u32>, Vec<u32>) {
    let mut docids = Vec::with_capacity(n as usize);
    let mut docid = 0u32;
    let mut state = 0x2545F491u32;
    for _ in 0..n {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        docid += 1 + state % 37;
        docids.push(docid);
    }
    let freqs = (0..n).map(|i| i % 15 + 1).collect();
    (docids, freqs)
}

fn bench_next_geq(c: &mut Criterion) {
    let (docids, freqs) = synthetic_postings(100_000);
    let bound = docids.last().unwrap() + 1;

    let mut group = c.benchmark_group("next_geq");
    for name in ["simdbp", "streamvbyte", "optpfor", "ef", "pef"] {
        let encoding = Encoding::from_name(name).unwrap();
        let mut docs_bytes = Vec::new();
        let mut freqs_bytes = Vec::new();
        write_docs_list(encoding, &docids, bound, &mut docs_bytes);
        write_freqs_list(encoding, &freqs, &mut freqs_bytes);

        group.bench_function(name, |b| {
            b.iter(|| {
                let mut cursor = ListCursor::new(encoding, &docs_bytes, &freqs_bytes, bound);
                // Jump in strides of ~64 average gaps.
                let mut target = 0u32;
                let mut sum = 0u64;
                while cursor.docid() < bound {
                    sum += cursor.docid() as u64;
                    target = cursor.docid() + 1200;
                    cursor.next_geq(target);
                }
                black_box((sum, target))
            })
        });
    }
    group.finish();
}

fn bench_sequential_decode(c: &mut Criterion) {
    let (docids, freqs) = synthetic_postings(100_000);
    let bound = docids.last().unwrap() + 1;

    let mut group = c.benchmark_group("decode");
    for name in ["simdbp", "streamvbyte", "varint", "simple16", "optpfor", "interpolative"] {
        let encoding = Encoding::from_name(name).unwrap();
        let mut docs_bytes = Vec::new();
        let mut freqs_bytes = Vec::new();
        write_docs_list(encoding, &docids, bound, &mut docs_bytes);
        write_freqs_list(encoding, &freqs, &mut freqs_bytes);

        group.bench_function(name, |b| {
            b.iter(|| {
                let mut cursor = ListCursor::new(encoding, &docs_bytes, &freqs_bytes, bound);
                let mut sum = 0u64;
                while cursor.docid() < bound {
                    sum += cursor.freq() as u64;
                    cursor.next();
                }
                black_box(sum)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_next_geq, bench_sequential_decode);
criterion_main!(benches);
