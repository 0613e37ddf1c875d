use std::collections::HashMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::coding::{Coder, Media, Result};
use crate::error::Error;

/// Number of single-byte entries the dictionary starts with.
pub const SEED_SIZE: usize = 256;

/// Compresses the input bytes using the LZW algorithm.
///
/// # Returns
///
/// The emitted codes and the final size of the encoder's dictionary.
///
/// # Details
///
/// The dictionary is initialized with all 256 possible single-byte sequences.
/// Then, the algorithm finds the longest sequence `w` present in the dictionary that
/// is a prefix of the remaining input. It outputs the code for `w`, adds `w` concatenated
/// with the next byte to the dictionary, and continues.
pub fn compress(input: &[u8]) -> (Vec<u32>, usize) {
    // Initialize the dictionary with all 256 single-byte sequences.
    let mut dict: HashMap<Vec<u8>, u32> = (0..SEED_SIZE as u32)
        .map(|i| (vec![i as u8], i))
        .collect();

    let mut result = Vec::new();
    let mut w: Vec<u8> = Vec::new();
    for &byte in input {
        w.push(byte);
        if dict.contains_key(&w) {
            continue;
        }
        // w without its last byte is the longest match.
        let last = w.pop().unwrap_or(byte);
        if let Some(&code) = dict.get(&w) {
            result.push(code);
        }
        w.push(last);
        let next_code = dict.len() as u32;
        debug!("Adding {:?} to dictionary at index {}", String::from_utf8_lossy(&w), next_code);
        dict.insert(std::mem::take(&mut w), next_code);
        w.push(last);
    }
    // Output remaining code.
    if let Some(&code) = dict.get(&w) {
        result.push(code);
    }
    (result, dict.len())
}

/// Decompresses a sequence of LZW codes back into bytes.
///
/// # Returns
///
/// The decoded bytes and the final size of the decoder's dictionary, which
/// matches the encoder's when the codes are intact.
///
/// # Details
///
/// The dictionary is initialized with all 256 single-byte sequences and grows
/// by one entry per code after the first, in the same order as the encoder's.
/// A code the decoder has not created yet is rebuilt as the previous entry
/// plus its own first byte.
pub fn decompress(codes: &[u32]) -> Result<(Vec<u8>, usize)> {
    let mut dict: Vec<Vec<u8>> = (0..SEED_SIZE).map(|i| vec![i as u8]).collect();
    let mut result = Vec::new();

    // Handle first code.
    let Some(&first_code) = codes.first() else {
        return Ok((result, dict.len()));
    };
    let mut w = dict
        .get(first_code as usize)
        .cloned()
        .ok_or_else(|| {
            Error::invalid_input(format!(
                "first LZW code {} is outside the {}-entry seed dictionary",
                first_code, SEED_SIZE
            ))
        })?;
    result.extend_from_slice(&w);

    for &code in &codes[1..] {
        let entry = match dict.get(code as usize) {
            Some(entry) => entry.clone(),
            None => {
                if code as usize > dict.len() {
                    warn!(
                        "LZW code {} is beyond the next dictionary slot {}; input is corrupt",
                        code,
                        dict.len()
                    );
                }
                let mut entry = w.clone();
                entry.push(w[0]);
                entry
            }
        };
        result.extend_from_slice(&entry);

        // Add new dictionary entry: w + first byte of entry.
        let mut new_entry = w;
        new_entry.push(entry[0]);
        debug!(
            "Adding {:?} to dictionary at index {}",
            String::from_utf8_lossy(&new_entry),
            dict.len()
        );
        dict.push(new_entry);
        w = entry;
    }
    Ok((result, dict.len()))
}

/// Side-channel data for an LZW-coded message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LzwMetadata {
    /// Length of the input in bytes
    pub original_length: usize,
    /// Number of emitted codes
    pub encoded_length: usize,
    /// Final size of the encoder's dictionary
    pub dictionary_size: usize,
}

/// Dictionary coder over the UTF-8 bytes of a text.
#[derive(Debug, Clone, Copy, Default)]
pub struct LzwCoder;

impl LzwCoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode and also report the size of the decoder's dictionary.
    pub fn decode_with_dictionary_size(&self, codes: &[u32]) -> Result<(String, usize)> {
        let (bytes, dictionary_size) = decompress(codes)?;
        let decoded = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => {
                warn!("LZW output is not valid UTF-8; decoding lossily");
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        };
        Ok((decoded, dictionary_size))
    }
}

impl Coder for LzwCoder {
    const MEDIA: Media = Media::Text;
    type Input = str;
    type Encoded = Vec<u32>;
    type Metadata = LzwMetadata;
    type Output = String;

    fn algorithm_name(&self) -> &'static str {
        "LZW (Dictionary-based)"
    }

    fn encode(&self, input: &str) -> Result<(Vec<u32>, LzwMetadata)> {
        info!("Encoding data with {}", self.algorithm_name());
        let (codes, dictionary_size) = compress(input.as_bytes());
        debug!("Final dictionary size: {}", dictionary_size);

        let metadata = LzwMetadata {
            original_length: input.len(),
            encoded_length: codes.len(),
            dictionary_size,
        };
        info!(
            "Encoded {} bytes to {} codes.",
            metadata.original_length, metadata.encoded_length
        );
        Ok((codes, metadata))
    }

    fn decode(&self, encoded: &Vec<u32>, _metadata: &LzwMetadata) -> Result<String> {
        info!("Decoding data with {}", self.algorithm_name());
        let (decoded, _) = self.decode_with_dictionary_size(encoded)?;
        info!("Decoded {} codes to {} bytes.", encoded.len(), decoded.len());
        Ok(decoded)
    }
}
