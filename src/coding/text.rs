//! Text coding algorithms.
//!
//! All coders here take a `&str`:
//! - Huffman and Shannon-Fano produce prefix codes as `'0'`/`'1'` strings
//! - Arithmetic coding produces one arbitrary-precision decimal value
//! - LZW produces a list of dictionary codes
//! - Run-length coding produces `<count><char>` pairs

pub mod arithmetic;
pub mod decimal;
pub mod huffman;
pub mod lzw;
pub mod prefix;
pub mod run_length;
pub mod shannon_fano;

pub use arithmetic::{required_precision, ArithmeticCoder, ArithmeticMetadata};
pub use decimal::FixedDecimal;
pub use huffman::{build_huffman_tree, HuffmanCoder, HuffmanMetadata};
pub use lzw::{LzwCoder, LzwMetadata};
pub use prefix::{build_frequency_table, is_prefix_free, CodeTable, CodeTree, FrequencyTable};
pub use run_length::{RunLengthCoder, RunLengthMetadata};
pub use shannon_fano::{build_shannon_fano_tree, ShannonFanoCoder, ShannonFanoMetadata};
