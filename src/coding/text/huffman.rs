use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::prefix::{
    build_frequency_table, encode_with_table, CodeTable, CodeTree, FrequencyTable,
};
use crate::coding::{Coder, Media, Result};

/// Heap entry pointing into the tree arena.
/// We want the node with the smallest frequency to have highest priority;
/// equal frequencies go to the node created first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeapEntry {
    freq: usize,
    index: usize,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse: lower frequency, then lower arena index, comes first.
        other
            .freq
            .cmp(&self.freq)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Build the Huffman tree given a frequency table.
/// Returns `None` if the frequency table is empty.
///
/// Leaves are created in symbol order and internal nodes are appended as
/// they are formed, so arena indices double as a stable tie-break: the same
/// table always yields the same tree.
pub fn build_huffman_tree(freq_table: &FrequencyTable) -> Option<CodeTree> {
    let mut tree = CodeTree::new();
    let mut heap = BinaryHeap::new();
    for (&symbol, &freq) in freq_table {
        let index = tree.push_leaf(symbol, freq);
        heap.push(HeapEntry { freq, index });
    }

    // Combine nodes until only one tree remains.
    while heap.len() > 1 {
        let (Some(left), Some(right)) = (heap.pop(), heap.pop()) else {
            break;
        };
        let index = tree.push_internal(left.index, right.index);
        heap.push(HeapEntry {
            freq: left.freq + right.freq,
            index,
        });
    }

    let root = heap.pop()?;
    tree.set_root(root.index);
    debug!("Built Huffman tree with {} nodes", tree.len());
    Some(tree)
}

/// Side-channel data for a Huffman-coded message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HuffmanMetadata {
    pub codes: CodeTable,
    pub frequencies: FrequencyTable,
    pub original_length: usize,
    pub encoded_length: usize,
}

/// Huffman coding over the characters of a text.
#[derive(Debug, Clone, Copy, Default)]
pub struct HuffmanCoder;

impl HuffmanCoder {
    pub fn new() -> Self {
        Self
    }
}

impl Coder for HuffmanCoder {
    const MEDIA: Media = Media::Text;
    type Input = str;
    type Encoded = String;
    type Metadata = HuffmanMetadata;
    type Output = String;

    fn algorithm_name(&self) -> &'static str {
        "Huffman"
    }

    fn encode(&self, input: &str) -> Result<(String, HuffmanMetadata)> {
        info!("Encoding data with {}", self.algorithm_name());
        let frequencies = build_frequency_table(input);
        let Some(tree) = build_huffman_tree(&frequencies) else {
            return Ok((String::new(), HuffmanMetadata::default()));
        };
        debug!("Calculated frequencies: {:?}", frequencies);

        let codes = tree.code_table();
        debug!("Generated Huffman codes: {:?}", codes);
        let encoded = encode_with_table(input, &codes);

        let metadata = HuffmanMetadata {
            codes,
            frequencies,
            original_length: input.chars().count(),
            encoded_length: encoded.len(),
        };
        info!(
            "Encoded {} chars to {} bits.",
            metadata.original_length, metadata.encoded_length
        );
        Ok((encoded, metadata))
    }

    fn decode(&self, encoded: &String, metadata: &HuffmanMetadata) -> Result<String> {
        info!("Decoding data with {}", self.algorithm_name());
        if encoded.is_empty() {
            return Ok(String::new());
        }
        // The tree is never serialized; it is rebuilt from the frequencies.
        let Some(tree) = build_huffman_tree(&metadata.frequencies) else {
            return Ok(String::new());
        };
        let decoded = tree.decode(encoded);
        info!(
            "Decoded {} bits to {} chars.",
            encoded.len(),
            decoded.chars().count()
        );
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coding::text::prefix::is_prefix_free;

    #[test]
    fn test_huffman_tree_and_code_table() {
        let input = "this is an example for huffman encoding";
        let freq = build_frequency_table(input);
        let tree = build_huffman_tree(&freq).expect("Tree should be built");
        let code_table = tree.code_table();
        // Each character in input must have a code.
        for ch in input.chars() {
            assert!(code_table.contains_key(&ch), "Missing code for '{}'", ch);
        }
        assert!(is_prefix_free(&code_table));
    }

    #[test]
    fn test_aaabbc() {
        let coder = HuffmanCoder::new();
        let (encoded, metadata) = coder.encode("aaabbc").unwrap();
        assert_eq!(metadata.frequencies[&'a'], 3);
        assert_eq!(metadata.frequencies[&'b'], 2);
        assert_eq!(metadata.frequencies[&'c'], 1);
        assert_eq!(metadata.codes[&'a'], "0");
        assert_eq!(metadata.codes[&'c'], "10");
        assert_eq!(metadata.codes[&'b'], "11");
        assert_eq!(encoded, "000111110");
        assert_eq!(metadata.original_length, 6);
        assert_eq!(metadata.encoded_length, 9);
        assert_eq!(coder.decode(&encoded, &metadata).unwrap(), "aaabbc");
    }

    #[test]
    fn test_encode_decode() {
        let coder = HuffmanCoder::new();
        let input = "huffman coding in rust is fun!";
        let (encoded, metadata) = coder.encode(input).unwrap();
        assert_eq!(coder.decode(&encoded, &metadata).unwrap(), input);
    }

    #[test]
    fn test_single_character() {
        let coder = HuffmanCoder::new();
        let input = "aaaaaaa";
        let (encoded, metadata) = coder.encode(input).unwrap();
        // With a single symbol, the assigned code is "0" for each occurrence.
        assert_eq!(encoded, "0".repeat(input.len()));
        assert_eq!(coder.decode(&encoded, &metadata).unwrap(), input);
    }

    #[test]
    fn test_empty_input() {
        let coder = HuffmanCoder::new();
        let (encoded, metadata) = coder.encode("").unwrap();
        assert!(encoded.is_empty());
        assert!(metadata.codes.is_empty());
        assert!(metadata.frequencies.is_empty());
        assert_eq!(coder.decode(&encoded, &metadata).unwrap(), "");
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        // Many equal frequencies exercise the tie-break.
        let freq = build_frequency_table("abcdefghabcdefgh");
        let first = build_huffman_tree(&freq).unwrap();
        let second = build_huffman_tree(&freq).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.code_table(), second.code_table());
    }

    #[test]
    fn test_malformed_bits_truncate() {
        let coder = HuffmanCoder::new();
        let (encoded, metadata) = coder.encode("aaabbc").unwrap();
        let truncated = &encoded[..encoded.len() - 1];
        let decoded = coder.decode(&truncated.to_string(), &metadata).unwrap();
        assert_eq!(decoded, "aaabb");
    }

    #[test]
    fn test_non_ascii() {
        let coder = HuffmanCoder::new();
        let input = "这是一段测试, ünïcødé";
        let (encoded, metadata) = coder.encode(input).unwrap();
        assert_eq!(metadata.original_length, input.chars().count());
        assert_eq!(coder.decode(&encoded, &metadata).unwrap(), input);
    }
}
