use std::{
    fs,
    io::{self, Error, ErrorKind},
    path::Path,
    sync::Arc,
};

use log::info;
use sift_collection::BinaryCollection;

use crate::codec::Encoding;
use crate::index::persist::write_stream_atomic;
use crate::index::STREAM_FLAG_QUANTIZED;
use crate::postings::{write_docs_list, write_freqs_list};
use crate::scorer::{
    CollectionStats, LinearQuantizer, Scorer, ScorerParams, TermStats, scorer_from_params,
};
use crate::wand::WandData;

/// Score quantization: replace frequencies by `bits`-wide integer scores.
/// Needs the raw-score wand data for the quantizer's global maximum.
pub struct QuantizeParams {
    pub bits: u8,
    pub scorer: ScorerParams,
}

pub struct CompressParams {
    pub encoding: Encoding,
    pub quantize: Option<QuantizeParams>,
}

#[derive(Debug, Clone, Copy)]
pub struct CompressStats {
    pub num_terms: u32,
    pub num_postings: u64,
}

/// Compress the uncompressed inverted index at `input` into
/// `{output}.docs` / `{output}.freqs` (and carry `.sizes` over so the
/// compressed basename is self-contained).
pub fn compress_inverted_index(
    input: &Path,
    output: &Path,
    wand: Option<&WandData>,
    params: &CompressParams,
) -> io::Result<CompressStats> {
    let docs = BinaryCollection::open(&input.with_extension("docs"))?;
    let freqs = BinaryCollection::open(&input.with_extension("freqs"))?;
    let sizes = BinaryCollection::open(&input.with_extension("sizes"))?;

    let doc_lens: Arc<[u32]> = Arc::from(sizes.first()?.to_vec().into_boxed_slice());
    let num_docs = doc_lens.len() as u32;

    let mut doc_records = docs.iter();
    let bound = doc_records.next().transpose()?.ok_or_else(|| {
        Error::new(ErrorKind::InvalidData, "docs collection has no header record")
    })?;
    if bound.len() != 1 || bound[0] != num_docs {
        return Err(Error::new(
            ErrorKind::InvalidData,
            "document count disagrees between .docs and .sizes",
        ));
    }

    let quantization = match &params.quantize {
        None => None,
        Some(quantize) => {
            let wand = wand.ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidInput,
                    "score quantization requires wand data for the global maximum",
                )
            })?;
            let mut global_max = 0.0f32;
            for term in 0..wand.num_terms() {
                global_max = global_max.max(wand.max_term_weight(term)?);
            }
            let quantizer = LinearQuantizer::new(global_max, quantize.bits)?;
            let scorer = scorer_from_params(
                &quantize.scorer,
                CollectionStats {
                    num_docs,
                    avg_doc_len: wand.avg_doc_len(),
                },
                Arc::clone(&doc_lens),
            )?;
            Some((quantizer, scorer))
        }
    };

    let mut doc_lists: Vec<Vec<u8>> = Vec::new();
    let mut freq_lists: Vec<Vec<u8>> = Vec::new();
    let mut num_postings: u64 = 0;

    for (doc_record, freq_record) in doc_records.zip(freqs.iter()) {
        let docids = doc_record?;
        let freq_values = freq_record?;
        if docids.len() != freq_values.len() {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "docs and freqs lists are misaligned",
            ));
        }
        num_postings += docids.len() as u64;

        let mut doc_list = Vec::new();
        write_docs_list(params.encoding, docids, num_docs, &mut doc_list);
        doc_lists.push(doc_list);

        let mut freq_list = Vec::new();
        match &quantization {
            None => write_freqs_list(params.encoding, freq_values, &mut freq_list),
            Some((quantizer, scorer)) => {
                let stats = TermStats {
                    df: docids.len() as u32,
                    cf: freq_values.iter().map(|&f| f as u64).sum(),
                };
                let term_scorer = scorer.term_scorer(stats, 1.0);
                let quantized: Vec<u32> = docids
                    .iter()
                    .zip(freq_values)
                    .map(|(&d, &f)| quantizer.quantize(term_scorer.score(d, f)))
                    .collect();
                write_freqs_list(params.encoding, &quantized, &mut freq_list);
            }
        }
        freq_lists.push(freq_list);
    }

    let freq_flags = if quantization.is_some() {
        STREAM_FLAG_QUANTIZED
    } else {
        0
    };
    write_stream_atomic(
        &output.with_extension("docs"),
        params.encoding.name(),
        0,
        num_docs,
        &doc_lists,
    )?;
    write_stream_atomic(
        &output.with_extension("freqs"),
        params.encoding.name(),
        freq_flags,
        num_docs,
        &freq_lists,
    )?;
    if input.with_extension("sizes") != output.with_extension("sizes") {
        fs::copy(input.with_extension("sizes"), output.with_extension("sizes"))?;
    }

    info!(
        "compressed {} lists ({} postings) with {}",
        doc_lists.len(),
        num_postings,
        params.encoding.name()
    );
    Ok(CompressStats {
        num_terms: doc_lists.len() as u32,
        num_postings,
    })
}
