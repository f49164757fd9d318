mod accumulator;
mod codec;
mod cursor;
mod index;
mod postings;
mod query;
mod scorer;
mod topk;
mod wand;

pub use accumulator::*;
pub use codec::{BLOCK_LEN, BlockCodec, ENCODING_NAMES, Encoding, block_codec};
pub use cursor::*;
pub use index::*;
pub use postings::*;
pub use query::*;
pub use scorer::*;
pub use topk::{Entry, TopKQueue};
pub use wand::*;

#[cfg(test)]
mod test_support;
