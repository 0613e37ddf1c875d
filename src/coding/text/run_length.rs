use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::coding::{Coder, Media, Result};
use crate::error::Error;

/// Side-channel data for a run-length-coded message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunLengthMetadata {
    pub original_length: usize,
    pub encoded_length: usize,
    pub compression_ratio: f64,
}

/// Run-length encoding as `<count><char>` pairs, e.g. `"aaab"` -> `"3a1b"`.
///
/// Counts are written in decimal, so texts containing ASCII digits cannot be
/// represented and are rejected by `encode`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunLengthCoder;

impl RunLengthCoder {
    pub fn new() -> Self {
        Self
    }
}

impl Coder for RunLengthCoder {
    const MEDIA: Media = Media::Text;
    type Input = str;
    type Encoded = String;
    type Metadata = RunLengthMetadata;
    type Output = String;

    fn algorithm_name(&self) -> &'static str {
        "Run Length Encoding"
    }

    fn encode(&self, input: &str) -> Result<(String, RunLengthMetadata)> {
        info!("Encoding data with {}", self.algorithm_name());
        if input.chars().any(|ch| ch.is_ascii_digit()) {
            return Err(Error::invalid_input(
                "run-length input must not contain ASCII digits",
            ));
        }

        let mut encoded = String::new();
        let mut chars = input.chars();
        if let Some(first) = chars.next() {
            let mut current = first;
            let mut count = 1usize;
            for ch in chars {
                if ch == current {
                    count += 1;
                } else {
                    encoded.push_str(&format!("{}{}", count, current));
                    current = ch;
                    count = 1;
                }
            }
            encoded.push_str(&format!("{}{}", count, current));
        }
        debug!("Encoded string: {}", encoded);

        let original_length = input.chars().count();
        let encoded_length = encoded.chars().count();
        let metadata = RunLengthMetadata {
            original_length,
            encoded_length,
            compression_ratio: if encoded_length > 0 {
                original_length as f64 / encoded_length as f64
            } else {
                1.0
            },
        };
        info!(
            "Encoded {} chars to {} chars.",
            metadata.original_length, metadata.encoded_length
        );
        Ok((encoded, metadata))
    }

    /// A count with no character after it is ignored, as is a character
    /// with no count before it.
    fn decode(&self, encoded: &String, _metadata: &RunLengthMetadata) -> Result<String> {
        info!("Decoding data with {}", self.algorithm_name());
        let mut decoded = String::new();
        let mut count = String::new();
        for ch in encoded.chars() {
            if ch.is_ascii_digit() {
                count.push(ch);
                continue;
            }
            if !count.is_empty() {
                let run: usize = count.parse().map_err(|_| {
                    Error::invalid_input(format!("run count {} is too large", count))
                })?;
                debug!("Decoded run: count={}, char={:?}", run, ch);
                decoded.extend(std::iter::repeat(ch).take(run));
                count.clear();
            }
        }
        info!(
            "Decoded {} chars to {} chars.",
            encoded.chars().count(),
            decoded.chars().count()
        );
        Ok(decoded)
    }
}
