use std::path::{Path, PathBuf};

use sift_collection::{BinaryCollectionWriter, InvertConfig, invert_forward_index};
use tempfile::TempDir;

use crate::codec::Encoding;
use crate::index::{CompressParams, Index, QuantizeParams, compress_inverted_index};
use crate::scorer::ScorerParams;
use crate::wand::{
    BlockPartition, WandBuildParams, WandData, build_wand_data, write_wand_data_atomic,
};

/// The ten-document collection used across the engine tests.
///
/// d0=[0,1,2,3,4,5] d1=[1] d2=[1,2] d3=[] d4=[1,5,6]
/// d5=[5] d6=[6] d7=[] d8=[6] d9=[]
pub fn toy_documents() -> Vec<Vec<u32>> {
    vec![
        vec![0, 1, 2, 3, 4, 5],
        vec![1],
        vec![1, 2],
        vec![],
        vec![1, 5, 6],
        vec![5],
        vec![6],
        vec![],
        vec![6],
        vec![],
    ]
}

pub struct Fixture {
    pub dir: TempDir,
    pub index: Index,
    pub wand: WandData,
}

pub struct FixtureConfig {
    pub encoding: &'static str,
    pub partition: BlockPartition,
    pub scorer: ScorerParams,
    pub quantize_bits: Option<u8>,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        FixtureConfig {
            encoding: "simdbp",
            partition: BlockPartition::Fixed(64),
            scorer: ScorerParams::new("bm25"),
            quantize_bits: None,
        }
    }
}

pub fn write_forward(path: &Path, documents: &[Vec<u32>]) {
    let mut writer = BinaryCollectionWriter::create(path).unwrap();
    writer.write_singleton(documents.len() as u32).unwrap();
    for doc in documents {
        writer.write_record(doc).unwrap();
    }
    writer.finish().unwrap();
}

/// Build a full index pipeline (forward -> inverted -> wand -> compressed)
/// in a temp dir and open the results.
pub fn build_fixture(documents: &[Vec<u32>], config: &FixtureConfig) -> Fixture {
    let dir = TempDir::new().unwrap();
    let forward = dir.path().join("fwd.bin");
    let inverted = dir.path().join("inv");
    let compressed = dir.path().join("cmp");
    let wand_path = dir.path().join("inv.wand");

    write_forward(&forward, documents);
    invert_forward_index(&forward, &inverted, &InvertConfig::default()).unwrap();

    let staged = build_wand_data(
        &inverted,
        &WandBuildParams {
            scorer: config.scorer.clone(),
            partition: config.partition,
            quantize_bits: config.quantize_bits,
        },
    )
    .unwrap();
    write_wand_data_atomic(&wand_path, &staged).unwrap();
    let wand = WandData::open(&wand_path).unwrap();

    let quantize = config.quantize_bits.map(|bits| QuantizeParams {
        bits,
        scorer: config.scorer.clone(),
    });
    // Quantization needs a raw-score table for its global maximum.
    let raw_wand = if config.quantize_bits.is_some() {
        let raw_path = dir.path().join("inv.raw.wand");
        let staged = build_wand_data(
            &inverted,
            &WandBuildParams {
                scorer: config.scorer.clone(),
                partition: config.partition,
                quantize_bits: None,
            },
        )
        .unwrap();
        write_wand_data_atomic(&raw_path, &staged).unwrap();
        Some(WandData::open(&raw_path).unwrap())
    } else {
        None
    };

    compress_inverted_index(
        &inverted,
        &compressed,
        raw_wand.as_ref(),
        &CompressParams {
            encoding: Encoding::from_name(config.encoding).unwrap(),
            quantize,
        },
    )
    .unwrap();

    let index = Index::open(&compressed).unwrap();
    Fixture { dir, index, wand }
}

pub fn toy_fixture(encoding: &'static str) -> Fixture {
    build_fixture(
        &toy_documents(),
        &FixtureConfig {
            encoding,
            ..FixtureConfig::default()
        },
    )
}

/// Uncompressed inverted basename for tests that read it directly.
pub fn inverted_basename(fixture: &Fixture) -> PathBuf {
    fixture.dir.path().join("inv")
}
