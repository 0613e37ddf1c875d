//! Name-based coder lookup.
//!
//! The registry maps algorithm names to constructors of type-erased coders.
//! A type-erased coder takes its input as JSON and produces a
//! [`ResultBundle`], so callers can pick an algorithm at runtime without
//! knowing its payload or metadata types.

use std::borrow::Borrow;
use std::collections::BTreeMap;

use log::{debug, error, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::audio::LpcCoder;
use super::bundle::ResultBundle;
use super::text::{ArithmeticCoder, HuffmanCoder, LzwCoder, RunLengthCoder, ShannonFanoCoder};
use super::video::H261Coder;
use super::{Coder, Media};
use crate::config::CodingConfig;
use crate::error::{Error, Result};

/// Object-safe view of a [`Coder`] working on JSON values.
pub trait DynCoder: Send + Sync {
    fn name(&self) -> &'static str;

    fn media(&self) -> Media;

    /// Encode a JSON-encoded input into a result bundle.
    fn encode_value(&self, input: Value) -> Result<ResultBundle>;

    /// Decode a bundle produced by the same algorithm.
    fn decode_bundle(&self, bundle: &ResultBundle) -> Result<Value>;
}

impl<C> DynCoder for C
where
    C: Coder + Send + Sync,
    <C::Input as ToOwned>::Owned: DeserializeOwned,
    C::Encoded: Serialize + DeserializeOwned,
    C::Metadata: Serialize + DeserializeOwned,
    C::Output: Serialize,
{
    fn name(&self) -> &'static str {
        self.algorithm_name()
    }

    fn media(&self) -> Media {
        C::MEDIA
    }

    fn encode_value(&self, input: Value) -> Result<ResultBundle> {
        let owned: <C::Input as ToOwned>::Owned = serde_json::from_value(input.clone())?;
        let (encoded, metadata) = self.encode(Borrow::<C::Input>::borrow(&owned))?;
        Ok(ResultBundle {
            algorithm: self.algorithm_name().to_string(),
            original_input: input,
            encoded_data: serde_json::to_value(&encoded)?,
            metadata: serde_json::to_value(&metadata)?,
        })
    }

    fn decode_bundle(&self, bundle: &ResultBundle) -> Result<Value> {
        if bundle.algorithm != self.algorithm_name() {
            return Err(Error::AlgorithmMismatch {
                expected: self.algorithm_name().to_string(),
                found: bundle.algorithm.clone(),
            });
        }
        let encoded: C::Encoded = serde_json::from_value(bundle.encoded_data.clone())?;
        let metadata: C::Metadata = serde_json::from_value(bundle.metadata.clone())?;
        let output = self.decode(&encoded, &metadata)?;
        Ok(serde_json::to_value(&output)?)
    }
}

type Constructor = Box<dyn Fn() -> Box<dyn DynCoder> + Send + Sync>;

struct Entry {
    media: Media,
    constructor: Constructor,
}

/// Lookup table from algorithm name to coder constructor.
///
/// # Examples
///
/// ```rust
/// use coding_techniques::coding::Registry;
/// use serde_json::json;
///
/// let registry = Registry::default();
/// let coder = registry.create("Huffman").unwrap();
/// let bundle = coder.encode_value(json!("aaabbc")).unwrap();
/// assert_eq!(coder.decode_bundle(&bundle).unwrap(), json!("aaabbc"));
/// ```
pub struct Registry {
    entries: BTreeMap<&'static str, Entry>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(&CodingConfig::default())
    }
}

impl Registry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// A registry holding every coder in the crate, configured from `config`.
    pub fn new(config: &CodingConfig) -> Self {
        let mut registry = Self::empty();

        registry.register_coder(HuffmanCoder::new);
        registry.register_coder(ShannonFanoCoder::new);
        let arithmetic = config.arithmetic.clone();
        registry.register_coder(move || ArithmeticCoder::from_config(&arithmetic));
        registry.register_coder(LzwCoder::new);
        registry.register_coder(RunLengthCoder::new);
        let lpc = config.lpc.clone();
        registry.register_coder(move || LpcCoder::from_config(&lpc));
        let video = config.video.clone();
        registry.register_coder(move || H261Coder::from_config(&video));

        registry
    }

    /// Registers a constructor under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: &'static str, media: Media, constructor: F)
    where
        F: Fn() -> Box<dyn DynCoder> + Send + Sync + 'static,
    {
        debug!("Registering {} coder: {}", media, name);
        self.entries.insert(
            name,
            Entry {
                media,
                constructor: Box::new(constructor),
            },
        );
    }

    /// Registers a typed coder under its own algorithm name.
    fn register_coder<C, F>(&mut self, constructor: F)
    where
        C: DynCoder + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        let probe = constructor();
        let (name, media) = (probe.name(), probe.media());
        self.register(name, media, move || Box::new(constructor()) as Box<dyn DynCoder>);
    }

    /// Creates a fresh coder for `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn DynCoder>> {
        info!("Creating coder: {}", name);
        match self.entries.get(name) {
            Some(entry) => Ok((entry.constructor)()),
            None => {
                error!("Unknown coder: {}", name);
                Err(Error::UnknownCoder(name.to_string()))
            }
        }
    }

    /// Registered names grouped by media kind. Every kind is present, even
    /// when no coder is registered for it.
    pub fn available(&self) -> BTreeMap<Media, Vec<&'static str>> {
        let mut available: BTreeMap<Media, Vec<&'static str>> =
            Media::ALL.iter().map(|&media| (media, Vec::new())).collect();
        for (&name, entry) in &self.entries {
            available.entry(entry.media).or_default().push(name);
        }
        available
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_coders_registered() {
        let registry = Registry::default();
        assert_eq!(registry.len(), 7);
        let available = registry.available();
        assert_eq!(available.len(), 4);
        assert_eq!(available[&Media::Text].len(), 5);
        assert!(available[&Media::Image].is_empty());
        assert_eq!(available[&Media::Audio], vec!["LPC (Linear Predictive Coding)"]);
        assert_eq!(
            available[&Media::Video],
            vec!["H.261 (Motion Estimation & Compensation)"]
        );
    }

    #[test]
    fn test_unknown_coder() {
        let registry = Registry::default();
        assert!(matches!(
            registry.create("JPEG"),
            Err(Error::UnknownCoder(name)) if name == "JPEG"
        ));
    }

    #[test]
    fn test_text_round_trip_through_values() {
        let registry = Registry::default();
        for name in registry.available()[&Media::Text].clone() {
            let coder = registry.create(name).unwrap();
            assert_eq!(coder.media(), Media::Text);
            let bundle = coder.encode_value(json!("abracadabra")).unwrap();
            assert_eq!(bundle.algorithm, name);
            assert_eq!(bundle.original_input, json!("abracadabra"));
            assert_eq!(coder.decode_bundle(&bundle).unwrap(), json!("abracadabra"), "{}", name);
        }
    }

    #[test]
    fn test_algorithm_mismatch() {
        let registry = Registry::default();
        let bundle = registry
            .create("Huffman")
            .unwrap()
            .encode_value(json!("hello"))
            .unwrap();
        let lzw = registry.create("LZW (Dictionary-based)").unwrap();
        assert!(matches!(
            lzw.decode_bundle(&bundle),
            Err(Error::AlgorithmMismatch { .. })
        ));
    }

    #[test]
    fn test_wrong_input_type() {
        let registry = Registry::default();
        let coder = registry.create("LPC (Linear Predictive Coding)").unwrap();
        assert!(matches!(coder.encode_value(json!("not samples")), Err(Error::Json(_))));
    }

    #[test]
    fn test_config_reaches_coders() {
        let mut config = CodingConfig::default();
        config.lpc.order = 3;
        let registry = Registry::new(&config);
        let coder = registry.create("LPC (Linear Predictive Coding)").unwrap();
        let samples: Vec<f64> = (0..64).map(|n| (n as f64 * 0.3).sin()).collect();
        let bundle = coder.encode_value(json!(samples)).unwrap();
        assert_eq!(bundle.metadata["order"], json!(3));
        assert_eq!(bundle.encoded_data.as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = Registry::empty();
        assert!(registry.is_empty());
        registry.register("RLE", Media::Text, || {
            Box::new(RunLengthCoder::new()) as Box<dyn DynCoder>
        });
        assert!(registry.contains("RLE"));
        let coder = registry.create("RLE").unwrap();
        assert_eq!(coder.name(), "Run Length Encoding");
    }
}
