use std::collections::HashMap;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::prefix::{
    build_frequency_table, encode_with_table, CodeTable, CodeTree, FrequencyTable,
};
use crate::coding::{Coder, Media, Result};

/// Sort symbols by descending frequency, ties broken by ascending symbol.
fn sort_by_frequency(frequencies: &FrequencyTable) -> Vec<(char, usize)> {
    let mut symbols: Vec<(char, usize)> = frequencies.iter().map(|(&s, &f)| (s, f)).collect();
    symbols.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    symbols
}

/// Recursively bisect `symbols` and return the arena index of the subtree.
///
/// The split falls right after the first symbol at which the running
/// frequency reaches half of the partition total. Because the list is sorted
/// in descending order that index is always inside the partition.
fn split(tree: &mut CodeTree, symbols: &[(char, usize)], depth: usize) -> usize {
    if let [(symbol, freq)] = symbols {
        return tree.push_leaf(*symbol, *freq);
    }

    let total: usize = symbols.iter().map(|&(_, f)| f).sum();
    let mut cumulative = 0;
    let mut split_index = symbols.len() - 1;
    for (i, &(_, freq)) in symbols.iter().enumerate() {
        cumulative += freq;
        if 2 * cumulative >= total {
            split_index = i + 1;
            break;
        }
    }
    let split_index = split_index.clamp(1, symbols.len() - 1);

    debug!(
        "Splitting {} symbols at index {} (depth {})",
        symbols.len(),
        split_index,
        depth
    );
    let left = split(tree, &symbols[..split_index], depth + 1);
    let right = split(tree, &symbols[split_index..], depth + 1);
    tree.push_internal(left, right)
}

/// Build the Shannon-Fano tree for a frequency table.
/// Returns `None` if the frequency table is empty.
pub fn build_shannon_fano_tree(frequencies: &FrequencyTable) -> Option<CodeTree> {
    let symbols = sort_by_frequency(frequencies);
    if symbols.is_empty() {
        return None;
    }
    let mut tree = CodeTree::new();
    let root = split(&mut tree, &symbols, 0);
    tree.set_root(root);
    Some(tree)
}

/// Side-channel data for a Shannon-Fano-coded message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShannonFanoMetadata {
    pub codes: CodeTable,
    pub frequencies: FrequencyTable,
    pub original_length: usize,
    pub encoded_length: usize,
}

/// Shannon-Fano coding over the characters of a text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShannonFanoCoder;

impl ShannonFanoCoder {
    pub fn new() -> Self {
        Self
    }
}

impl Coder for ShannonFanoCoder {
    const MEDIA: Media = Media::Text;
    type Input = str;
    type Encoded = String;
    type Metadata = ShannonFanoMetadata;
    type Output = String;

    fn algorithm_name(&self) -> &'static str {
        "Shannon-Fano"
    }

    fn encode(&self, input: &str) -> Result<(String, ShannonFanoMetadata)> {
        info!("Encoding data with {}", self.algorithm_name());
        let frequencies = build_frequency_table(input);
        debug!("Calculated frequencies: {:?}", frequencies);

        let codes = build_shannon_fano_tree(&frequencies)
            .map(|tree| tree.code_table())
            .unwrap_or_default();
        debug!("Generated Shannon-Fano codes: {:?}", codes);

        let encoded = encode_with_table(input, &codes);
        let metadata = ShannonFanoMetadata {
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

    /// Greedily accumulate bits until they match a code. This is only sound
    /// because the codes are prefix-free.
    fn decode(&self, encoded: &String, metadata: &ShannonFanoMetadata) -> Result<String> {
        info!("Decoding data with {}", self.algorithm_name());
        let reverse: HashMap<&str, char> = metadata
            .codes
            .iter()
            .map(|(&symbol, code)| (code.as_str(), symbol))
            .collect();

        let mut decoded = String::new();
        let mut current = String::new();
        for bit in encoded.chars() {
            current.push(bit);
            if let Some(&symbol) = reverse.get(current.as_str()) {
                decoded.push(symbol);
                current.clear();
            }
        }

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
    fn test_aaabbc_codes() {
        let coder = ShannonFanoCoder::new();
        let (encoded, metadata) = coder.encode("aaabbc").unwrap();
        assert_eq!(metadata.codes[&'a'], "0");
        assert_eq!(metadata.codes[&'b'], "10");
        assert_eq!(metadata.codes[&'c'], "11");
        assert_eq!(encoded, "000101011");
        assert_eq!(coder.decode(&encoded, &metadata).unwrap(), "aaabbc");
    }

    #[test]
    fn test_equal_frequencies_ordered_by_symbol() {
        let freq = build_frequency_table("baba");
        let codes = build_shannon_fano_tree(&freq).unwrap().code_table();
        assert_eq!(codes[&'a'], "0");
        assert_eq!(codes[&'b'], "1");
    }

    #[test]
    fn test_encode_decode() {
        let coder = ShannonFanoCoder::new();
        let input = "the quick brown fox jumps over the lazy dog";
        let (encoded, metadata) = coder.encode(input).unwrap();
        assert!(is_prefix_free(&metadata.codes));
        assert_eq!(metadata.encoded_length, encoded.len());
        assert_eq!(coder.decode(&encoded, &metadata).unwrap(), input);
    }

    #[test]
    fn test_single_symbol() {
        let coder = ShannonFanoCoder::new();
        let (encoded, metadata) = coder.encode("zzzz").unwrap();
        assert_eq!(metadata.codes[&'z'], "0");
        assert_eq!(encoded, "0000");
        assert_eq!(coder.decode(&encoded, &metadata).unwrap(), "zzzz");
    }

    #[test]
    fn test_empty_input() {
        let coder = ShannonFanoCoder::new();
        let (encoded, metadata) = coder.encode("").unwrap();
        assert!(encoded.is_empty());
        assert!(metadata.codes.is_empty());
        assert_eq!(coder.decode(&encoded, &metadata).unwrap(), "");
    }

    #[test]
    fn test_skewed_distribution_is_prefix_free() {
        let input: String = (0..12u8)
            .flat_map(|i| std::iter::repeat((b'a' + i) as char).take(1 << (i % 6)))
            .collect();
        let freq = build_frequency_table(&input);
        let codes = build_shannon_fano_tree(&freq).unwrap().code_table();
        assert_eq!(codes.len(), 12);
        assert!(is_prefix_free(&codes));
    }
}
