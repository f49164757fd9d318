use std::{
    io::{self, Error, ErrorKind},
    path::Path,
    thread,
};

use crossbeam::channel;
use hashbrown::HashMap;
use log::{debug, info};

use crate::binary_collection::{BinaryCollection, BinaryCollectionWriter};

/// Inversion of a forward index (per-document term-id records) into the
/// uncompressed `.docs` / `.freqs` / `.sizes` triple.
///
/// Documents are chunked into batches; a fixed worker pool inverts batches
/// concurrently behind a bounded channel so peak memory stays proportional to
/// the in-flight window, and a single merge loop concatenates batch results
/// in document order.
pub struct InvertConfig {
    pub threads: usize,
    pub batch_size: usize,
}

impl Default for InvertConfig {
    fn default() -> Self {
        InvertConfig {
            threads: thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            batch_size: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvertStats {
    pub num_docs: u32,
    pub num_terms: u32,
    pub num_postings: u64,
}

/// One batch of forward records, owned so it can cross the channel.
struct Batch {
    index: usize,
    first_doc: u32,
    records: Vec<Vec<u32>>,
}

/// A batch's inverted postings: term -> ascending (docid, freq) pairs.
struct InvertedBatch {
    index: usize,
    first_doc: u32,
    sizes: Vec<u32>,
    postings: HashMap<u32, Vec<(u32, u32)>>,
}

fn invert_batch(batch: Batch) -> InvertedBatch {
    let mut postings: HashMap<u32, Vec<(u32, u32)>> = HashMap::new();
    let mut sizes = Vec::with_capacity(batch.records.len());
    let mut doc_freqs: HashMap<u32, u32> = HashMap::new();

    for (i, record) in batch.records.iter().enumerate() {
        let docid = batch.first_doc + i as u32;
        sizes.push(record.len() as u32);

        doc_freqs.clear();
        for &term in record {
            *doc_freqs.entry(term).or_insert(0) += 1;
        }
        for (&term, &freq) in &doc_freqs {
            postings.entry(term).or_default().push((docid, freq));
        }
    }

    // Within a batch docids must come out ascending per term.
    for list in postings.values_mut() {
        list.sort_unstable_by_key(|&(docid, _)| docid);
    }

    InvertedBatch {
        index: batch.index,
        first_doc: batch.first_doc,
        sizes,
        postings,
    }
}

/// Invert `input` (a forward-index binary collection whose first record is
/// the singleton document count) into `{output}.docs`, `{output}.freqs` and
/// `{output}.sizes`.
pub fn invert_forward_index(
    input: &Path,
    output: &Path,
    config: &InvertConfig,
) -> io::Result<InvertStats> {
    let forward = BinaryCollection::open(input)?;
    let mut records = forward.iter();

    let header = records.next().transpose()?.ok_or_else(|| {
        Error::new(ErrorKind::InvalidData, "forward index has no header record")
    })?;
    if header.len() != 1 {
        return Err(Error::new(
            ErrorKind::InvalidData,
            "forward index header is not a singleton",
        ));
    }
    let num_docs = header[0];

    let threads = config.threads.max(2);
    let in_flight = 2 * (threads - 1);
    let (batch_tx, batch_rx) = channel::bounded::<Batch>(in_flight);
    let (result_tx, result_rx) = channel::bounded::<InvertedBatch>(in_flight);

    let mut postings: Vec<Vec<(u32, u32)>> = Vec::new();
    let mut sizes = vec![0u32; num_docs as usize];
    let mut num_postings: u64 = 0;

    thread::scope(|scope| -> io::Result<()> {
        for _ in 0..threads.saturating_sub(1) {
            let rx = batch_rx.clone();
            let tx = result_tx.clone();
            scope.spawn(move || {
                for batch in rx {
                    if tx.send(invert_batch(batch)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(batch_rx);
        drop(result_tx);

        let reader = scope.spawn(move || -> io::Result<u32> {
            let mut doc: u32 = 0;
            let mut index = 0usize;
            let mut current: Vec<Vec<u32>> = Vec::with_capacity(config.batch_size);
            let mut first_doc = 0u32;
            for record in records {
                let record = record?;
                current.push(record.to_vec());
                doc += 1;
                if current.len() == config.batch_size {
                    let batch = Batch {
                        index,
                        first_doc,
                        records: std::mem::take(&mut current),
                    };
                    index += 1;
                    first_doc = doc;
                    if batch_tx.send(batch).is_err() {
                        break;
                    }
                }
            }
            if !current.is_empty() {
                let _ = batch_tx.send(Batch {
                    index,
                    first_doc,
                    records: current,
                });
            }
            Ok(doc)
        });

        // Merge in batch order; out-of-order arrivals wait in a small buffer.
        let mut pending: HashMap<usize, InvertedBatch> = HashMap::new();
        let mut next_index = 0usize;
        for inverted in result_rx {
            pending.insert(inverted.index, inverted);
            while let Some(batch) = pending.remove(&next_index) {
                merge_batch(&mut postings, &mut sizes, &mut num_postings, batch);
                next_index += 1;
            }
        }
        debug_assert!(pending.is_empty());

        let docs_read = reader.join().expect("forward reader thread panicked")?;
        if docs_read != num_docs {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("forward index declares {num_docs} documents but contains {docs_read}"),
            ));
        }
        Ok(())
    })?;

    let num_terms = postings.len() as u32;
    info!(
        "inverted {} documents into {} terms ({} postings)",
        num_docs, num_terms, num_postings
    );

    write_inverted(output, num_docs, &postings, &sizes)?;

    Ok(InvertStats {
        num_docs,
        num_terms,
        num_postings,
    })
}

fn merge_batch(
    postings: &mut Vec<Vec<(u32, u32)>>,
    sizes: &mut [u32],
    num_postings: &mut u64,
    batch: InvertedBatch,
) {
    let first = batch.first_doc as usize;
    sizes[first..first + batch.sizes.len()].copy_from_slice(&batch.sizes);

    for (term, list) in batch.postings {
        let term = term as usize;
        if term >= postings.len() {
            postings.resize_with(term + 1, Vec::new);
        }
        *num_postings += list.len() as u64;
        // Batches merge in document order, so appending keeps lists sorted.
        debug_assert!(
            postings[term].last().map(|&(d, _)| d).unwrap_or(0)
                <= list.first().map(|&(d, _)| d).unwrap_or(u32::MAX)
        );
        postings[term].extend(list);
    }
    debug!("merged batch starting at document {}", batch.first_doc);
}

fn write_inverted(
    output: &Path,
    num_docs: u32,
    postings: &[Vec<(u32, u32)>],
    sizes: &[u32],
) -> io::Result<()> {
    let mut docs = BinaryCollectionWriter::create(&output.with_extension("docs"))?;
    let mut freqs = BinaryCollectionWriter::create(&output.with_extension("freqs"))?;
    let mut size_file = BinaryCollectionWriter::create(&output.with_extension("sizes"))?;

    docs.write_singleton(num_docs)?;
    let mut doc_buf = Vec::new();
    let mut freq_buf = Vec::new();
    for list in postings {
        doc_buf.clear();
        freq_buf.clear();
        for &(docid, freq) in list {
            doc_buf.push(docid);
            freq_buf.push(freq);
        }
        docs.write_record(&doc_buf)?;
        freqs.write_record(&freq_buf)?;
    }
    size_file.write_record(sizes)?;

    docs.finish()?;
    freqs.finish()?;
    size_file.finish()?;
    Ok(())
}

#[cfg(test)]
#[path = "invert_tests.rs"]
mod tests;
