//! Information coding algorithms.
//!
//! This module provides implementations of classical coding techniques,
//! grouped by the kind of data they work on:
//! - Text: Huffman, Shannon-Fano, Arithmetic, LZW and Run-length coding
//! - Audio: Linear Predictive Coding (Levinson-Durbin)
//! - Video: H.261-style block motion estimation and compensation
//!
//! Every coder implements [`Coder`]: `encode` produces an encoded payload
//! together with the metadata `decode` needs to reconstruct the input.
//! Payloads are kept in inspectable forms (strings of `'0'`
//! and `'1'`, integer code lists, decimal values) rather than packed
//! bitstreams.
//!
//! # Examples
//!
//! ```rust
//! use coding_techniques::coding::{Coder, text::HuffmanCoder};
//!
//! let coder = HuffmanCoder::new();
//! let (bits, metadata) = coder.encode("aaabbc").unwrap();
//! assert_eq!(coder.decode(&bits, &metadata).unwrap(), "aaabbc");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

pub use crate::error::Result;

/// The kind of data a coder consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Media {
    Text,
    Image,
    Audio,
    Video,
}

impl Media {
    pub const ALL: [Media; 4] = [Media::Text, Media::Image, Media::Audio, Media::Video];
}

impl fmt::Display for Media {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Media::Text => "text",
            Media::Image => "image",
            Media::Audio => "audio",
            Media::Video => "video",
        };
        f.write_str(name)
    }
}

/// Trait for coding algorithms
///
/// A coder holds configuration only. Each call is self-contained: `decode`
/// must be able to rebuild everything it needs from the payload and the
/// metadata returned by `encode`.
pub trait Coder {
    /// Kind of data this coder works on
    const MEDIA: Media;

    /// Raw input accepted by `encode`
    type Input: ?Sized + ToOwned;

    /// Encoded payload
    type Encoded;

    /// Side-channel values required for reconstruction
    type Metadata;

    /// Reconstructed data returned by `decode`
    type Output;

    /// Human-readable algorithm name, also used as the registry key
    fn algorithm_name(&self) -> &'static str;

    /// Encode the input, returning the payload and its metadata
    fn encode(&self, input: &Self::Input) -> Result<(Self::Encoded, Self::Metadata)>;

    /// Reconstruct the input from a payload and its metadata
    fn decode(&self, encoded: &Self::Encoded, metadata: &Self::Metadata) -> Result<Self::Output>;
}

pub mod audio;
pub mod bundle;
pub mod registry;
pub mod stats;
pub mod text;
pub mod video;

pub use audio::LpcCoder;
pub use bundle::ResultBundle;
pub use registry::{DynCoder, Registry};
pub use text::{ArithmeticCoder, HuffmanCoder, LzwCoder, RunLengthCoder, ShannonFanoCoder};
pub use video::H261Coder;
